//! Push and pull command implementations.
//!
//! Both go through the VFS exactly as the engine would: resolve the logical
//! path, open the staging handle, then read or write by offset.

use objvfs_core::{ObjectVfs, OpenFlags, SyncFlags, Vfs};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

const CHUNK_SIZE: usize = 64 * 1024;

/// Uploads `source` as the object behind `logical`, replacing it.
///
/// Returns the number of bytes uploaded.
pub fn push(
    vfs: &ObjectVfs,
    logical: &str,
    source: &Path,
) -> Result<u64, Box<dyn std::error::Error>> {
    info!("Pushing {:?} to {}", source, logical);
    let mut input = File::open(source)?;
    let staging = vfs.full_pathname(logical)?;
    let mut file = vfs.open(
        &staging,
        OpenFlags::READ_WRITE | OpenFlags::CREATE | OpenFlags::MAIN_DB,
    )?;

    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut offset = 0u64;
    loop {
        let n = input.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        file.write_at(&buffer[..n], offset)?;
        offset += n as u64;
    }
    file.truncate(offset)?;
    file.sync(SyncFlags::FULL)?;
    file.close()?;
    info!(bytes = offset, "Pushed {}", logical);
    Ok(offset)
}

/// Downloads the object behind `logical` into `dest`.
///
/// Returns the number of bytes downloaded.
pub fn pull(
    vfs: &ObjectVfs,
    logical: &str,
    dest: &Path,
) -> Result<u64, Box<dyn std::error::Error>> {
    info!("Pulling {} to {:?}", logical, dest);
    let staging = vfs.full_pathname(logical)?;
    debug!(staging = %staging.display(), "resolved staging path");
    let mut file = vfs.open(&staging, OpenFlags::READ_ONLY | OpenFlags::MAIN_DB)?;
    let mut output = File::create(dest)?;

    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut offset = 0u64;
    loop {
        let n = file.read_at(&mut buffer, offset)?;
        output.write_all(&buffer[..n])?;
        offset += n as u64;
        if n < buffer.len() {
            break;
        }
    }
    output.sync_all()?;
    file.close()?;
    info!(bytes = offset, "Pulled {}", logical);
    Ok(offset)
}
