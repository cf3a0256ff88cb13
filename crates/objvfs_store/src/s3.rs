//! S3-compatible object store built on `aws-sdk-s3`.
//!
//! The SDK is async; this backend owns a small tokio runtime and exposes a
//! blocking facade so it fits the synchronous [`ObjectStore`] contract.
//! It must not be called from inside another tokio runtime.

use crate::context::CallContext;
use crate::error::{StoreError, StoreResult};
use crate::store::{ObjectAttrs, ObjectStore, ObjectWriter};
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

/// How often an in-flight call polls its context for cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(25);

/// S3 backend configuration.
///
/// Credentials always come from the ambient AWS provider chain
/// (environment, profile, instance metadata).
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Region override; `None` uses the ambient region.
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services.
    pub endpoint_url: Option<String>,
    /// Use path-style addressing (`endpoint/bucket/key`).
    pub force_path_style: bool,
    /// Upper bound for a single request.
    pub timeout: Duration,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: None,
            endpoint_url: None,
            force_path_style: false,
            timeout: Duration::from_secs(30),
        }
    }
}

impl S3Config {
    /// Sets the region.
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets a custom endpoint and enables path-style addressing.
    #[must_use]
    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self.force_path_style = true;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

struct Inner {
    client: Client,
    runtime: Runtime,
    timeout: Duration,
}

impl Inner {
    fn block_on<T, F>(&self, ctx: &CallContext, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        ctx.check()?;
        let limit = ctx
            .remaining()
            .map_or(self.timeout, |left| left.min(self.timeout));
        let deadline_from_ctx = ctx.remaining().is_some_and(|left| left <= self.timeout);

        self.runtime.block_on(async {
            let watch = async {
                while !ctx.is_cancelled() {
                    tokio::time::sleep(CANCEL_POLL).await;
                }
            };
            tokio::select! {
                res = tokio::time::timeout(limit, fut) => match res {
                    Ok(inner) => inner,
                    Err(_) if deadline_from_ctx => Err(StoreError::DeadlineExceeded),
                    Err(_) => Err(StoreError::backend(format!("request timed out after {limit:?}"))),
                },
                () = watch => Err(StoreError::Cancelled),
            }
        })
    }
}

/// An S3-compatible object store.
#[derive(Clone)]
pub struct S3ObjectStore {
    inner: Arc<Inner>,
}

impl S3ObjectStore {
    /// Creates a client bound to ambient credentials.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ClientInit`] if the runtime cannot be started.
    pub fn new(config: S3Config) -> StoreResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("objvfs-s3")
            .enable_all()
            .build()
            .map_err(|e| StoreError::ClientInit(e.to_string()))?;

        let sdk_config = runtime.block_on(async {
            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
            if let Some(region) = &config.region {
                loader = loader.region(aws_config::Region::new(region.clone()));
            }
            if let Some(endpoint) = &config.endpoint_url {
                loader = loader.endpoint_url(endpoint.clone());
            }
            loader.load().await
        });

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        debug!(
            region = ?config.region,
            endpoint = ?config.endpoint_url,
            "s3 client created"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                client: Client::from_conf(s3_config),
                runtime,
                timeout: config.timeout,
            }),
        })
    }
}

fn backend_error<E: std::fmt::Display>(op: &str, bucket: &str, key: &str, err: E) -> StoreError {
    StoreError::backend(format!("{op} {bucket}/{key}: {err}"))
}

impl ObjectStore for S3ObjectStore {
    fn attrs(&self, ctx: &CallContext, bucket: &str, key: &str) -> StoreResult<ObjectAttrs> {
        let client = &self.inner.client;
        self.inner.block_on(ctx, async {
            match client.head_object().bucket(bucket).key(key).send().await {
                Ok(out) => Ok(ObjectAttrs {
                    size: out.content_length().unwrap_or(0).max(0) as u64,
                    generation: out
                        .last_modified()
                        .map_or(0, |t| t.secs().max(0) as u64),
                }),
                Err(err) => {
                    if matches!(err.as_service_error(), Some(HeadObjectError::NotFound(_))) {
                        Err(StoreError::not_found(bucket, key))
                    } else {
                        Err(backend_error("head", bucket, key, err))
                    }
                }
            }
        })
    }

    fn new_writer(
        &self,
        ctx: &CallContext,
        bucket: &str,
        key: &str,
    ) -> StoreResult<Box<dyn ObjectWriter>> {
        ctx.check()?;
        Ok(Box::new(S3Writer {
            inner: Arc::clone(&self.inner),
            ctx: ctx.clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            buffer: Vec::new(),
        }))
    }

    fn read_range(
        &self,
        ctx: &CallContext,
        bucket: &str,
        key: &str,
        offset: u64,
        len: usize,
    ) -> StoreResult<Vec<u8>> {
        if len == 0 {
            self.attrs(ctx, bucket, key)?;
            return Ok(Vec::new());
        }
        let last = offset.saturating_add(len as u64 - 1);
        let range = format!("bytes={offset}-{last}");
        let client = &self.inner.client;

        self.inner.block_on(ctx, async {
            let out = match client
                .get_object()
                .bucket(bucket)
                .key(key)
                .range(range)
                .send()
                .await
            {
                Ok(out) => out,
                Err(err) => {
                    let service = err.as_service_error();
                    if matches!(service, Some(GetObjectError::NoSuchKey(_))) {
                        return Err(StoreError::not_found(bucket, key));
                    }
                    if service.and_then(|e| e.code()) == Some("InvalidRange") {
                        return Err(StoreError::RangeNotSatisfiable { offset });
                    }
                    return Err(backend_error("get", bucket, key, err));
                }
            };
            let body = out
                .body
                .collect()
                .await
                .map_err(|e| backend_error("get body", bucket, key, e))?;
            let mut data = body.into_bytes().to_vec();
            data.truncate(len);
            Ok(data)
        })
    }

    fn delete(&self, ctx: &CallContext, bucket: &str, key: &str) -> StoreResult<()> {
        let client = &self.inner.client;
        self.inner.block_on(ctx, async {
            client
                .delete_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| backend_error("delete", bucket, key, e))
        })
    }
}

struct S3Writer {
    inner: Arc<Inner>,
    ctx: CallContext,
    bucket: String,
    key: String,
    buffer: Vec<u8>,
}

impl io::Write for S3Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ctx.check()?;
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ObjectWriter for S3Writer {
    fn finish(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        let size = this.buffer.len();
        let client = &this.inner.client;
        let (bucket, key) = (this.bucket.as_str(), this.key.as_str());
        let body = ByteStream::from(this.buffer);

        this.inner.block_on(&this.ctx, async {
            client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(body)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| backend_error("put", bucket, key, e))
        })?;
        debug!(bucket, key, size, "object uploaded");
        Ok(())
    }
}
