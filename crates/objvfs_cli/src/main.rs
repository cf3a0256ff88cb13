//! objvfs CLI
//!
//! Command-line tools for databases stored through the objvfs VFS.
//!
//! # Commands
//!
//! - `resolve` - Show where a logical path is staged and stored
//! - `push` - Upload a local database file to its object
//! - `pull` - Download an object to a local file
//! - `stat` - Show sizes of a database and its side files
//! - `rm` - Delete a database object and optionally its side files

mod commands;

use clap::{Parser, Subcommand};
use commands::StoreArgs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tools for databases kept in object storage.
#[derive(Parser)]
#[command(name = "objvfs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding objects as `<bucket>/<key>` files
    #[arg(global = true, long)]
    store_root: Option<PathBuf>,

    /// Use the S3 backend with ambient AWS credentials
    #[cfg(feature = "s3")]
    #[arg(global = true, long)]
    s3: bool,

    /// S3 region override
    #[cfg(feature = "s3")]
    #[arg(global = true, long)]
    region: Option<String>,

    /// S3-compatible endpoint URL
    #[cfg(feature = "s3")]
    #[arg(global = true, long)]
    endpoint: Option<String>,

    /// Directory for staging files
    #[arg(global = true, long)]
    scratch_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show where a logical path is staged and stored
    Resolve {
        /// Logical path `<bucket>/<key...>`
        path: String,
    },

    /// Upload a local file as the database object
    Push {
        /// Logical path `<bucket>/<key...>`
        path: String,

        /// Local file to upload
        source: PathBuf,
    },

    /// Download the database object to a local file
    Pull {
        /// Logical path `<bucket>/<key...>`
        path: String,

        /// Local file to write
        dest: PathBuf,
    },

    /// Show sizes of a database and its side files
    Stat {
        /// Logical path `<bucket>/<key...>`
        path: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete a database object
    Rm {
        /// Logical path `<bucket>/<key...>`
        path: String,

        /// Also delete the journal and WAL objects
        #[arg(short, long)]
        side_files: bool,
    },

    /// Show version information
    Version,
}

impl Cli {
    fn store_args(&self) -> StoreArgs {
        StoreArgs {
            store_root: self.store_root.clone(),
            #[cfg(feature = "s3")]
            s3: self.s3,
            #[cfg(feature = "s3")]
            region: self.region.clone(),
            #[cfg(feature = "s3")]
            endpoint: self.endpoint.clone(),
            scratch_dir: self.scratch_dir.clone(),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = cli.store_args();
    match cli.command {
        Commands::Resolve { path } => {
            commands::resolve::run(&args.build_lazy(), &path)?;
        }
        Commands::Push { path, source } => {
            let session = args.build()?;
            let bytes = commands::transfer::push(&session.vfs, &path, &source)?;
            println!("uploaded {bytes} bytes to {path}");
        }
        Commands::Pull { path, dest } => {
            let session = args.build()?;
            let bytes = commands::transfer::pull(&session.vfs, &path, &dest)?;
            println!("downloaded {bytes} bytes to {}", dest.display());
        }
        Commands::Stat { path, format } => {
            let session = args.build()?;
            let report = commands::stat::collect(&session, &path)?;
            commands::stat::print(&report, &format)?;
        }
        Commands::Rm { path, side_files } => {
            let session = args.build()?;
            commands::rm::run(&session.vfs, &path, side_files)?;
        }
        Commands::Version => {
            println!("objvfs CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("objvfs core v{}", objvfs_core::VERSION);
        }
    }

    Ok(())
}
