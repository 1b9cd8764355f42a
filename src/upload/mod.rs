pub(crate) mod api;
mod events;
mod parts;
mod retry;
mod token;

pub use events::{ProgressEvent, RetryEvent, UploadSubscriber};
pub use parts::{PartObj, PartsMap};
pub use retry::RetryPolicy;
pub use token::UploadToken;

use std::collections::HashMap;
use std::fmt;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use log::{debug, info, warn};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::config::Session;
use crate::file::FileMetadata;
use crate::mimetype;
use crate::store::StoreOptions;
use crate::{FiledockError, Result};

use api::{
    CommitRequest, CompleteRequest, CompletedPart, PartRequest, PartResponse,
    StartRequest, StartResponse,
};
use events::ProgressTracker;
use parts::checksum;
use retry::is_retryable_status;

pub const DEFAULT_PART_SIZE: u64 = 6 * 1024 * 1024;
pub const DEFAULT_CONCURRENCY: usize = 3;
pub const DEFAULT_RETRIES: u32 = 10;
pub const DEFAULT_RETRY_FACTOR: u64 = 2;
pub const DEFAULT_RETRY_MAX_TIME_MS: u64 = 15_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_INTELLIGENT_CHUNK_SIZE: u64 = 8 * 1024 * 1024;
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 500;

const BASE_RETRY_DELAY_MS: u64 = 250;
const MIN_CHUNK_SIZE: u64 = 32 * 1024;

/// Multi-part upload tuning.
///
/// Every field has a default; construct with `UploadOptions::default()` and
/// override what you need.
#[derive(Clone)]
pub struct UploadOptions {
    /// Size of each upload part in bytes.
    pub part_size: u64,
    /// Maximum parts in flight at once.
    pub concurrency: usize,
    /// Retries per failed request. Zero disables retrying.
    pub retry: u32,
    /// Backoff multiplier between attempts.
    pub retry_factor: u64,
    /// Backoff ceiling in milliseconds.
    pub retry_max_time: u64,
    /// Per-request timeout in milliseconds.
    pub timeout: u64,
    /// Stream parts in adaptive chunks for unreliable networks.
    pub intelligent: bool,
    /// Initial chunk size in intelligent mode; halves on failure down to
    /// 32 KiB.
    pub intelligent_chunk_size: u64,
    /// Minimum milliseconds between progress events.
    pub progress_interval: u64,
    /// Key/value tags stored alongside the file.
    pub tags: HashMap<String, String>,
    pub subscribers: Vec<Arc<dyn UploadSubscriber>>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            retry: DEFAULT_RETRIES,
            retry_factor: DEFAULT_RETRY_FACTOR,
            retry_max_time: DEFAULT_RETRY_MAX_TIME_MS,
            timeout: DEFAULT_TIMEOUT_MS,
            intelligent: false,
            intelligent_chunk_size: DEFAULT_INTELLIGENT_CHUNK_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL_MS,
            tags: HashMap::new(),
            subscribers: Vec::new(),
        }
    }
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("part_size", &self.part_size)
            .field("concurrency", &self.concurrency)
            .field("retry", &self.retry)
            .field("retry_factor", &self.retry_factor)
            .field("retry_max_time", &self.retry_max_time)
            .field("timeout", &self.timeout)
            .field("intelligent", &self.intelligent)
            .field("intelligent_chunk_size", &self.intelligent_chunk_size)
            .field("progress_interval", &self.progress_interval)
            .field("tags", &self.tags)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl UploadOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        let positives: [(&str, u64); 5] = [
            ("part_size", self.part_size),
            ("retry_factor", self.retry_factor),
            ("retry_max_time", self.retry_max_time),
            ("timeout", self.timeout),
            ("intelligent_chunk_size", self.intelligent_chunk_size),
        ];
        for (name, value) in positives {
            if value == 0 {
                return Err(FiledockError::InvalidOption(format!(
                    "{} must be positive",
                    name
                )));
            }
        }
        if self.concurrency == 0 {
            return Err(FiledockError::InvalidOption(
                "concurrency must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry,
            BASE_RETRY_DELAY_MS,
            self.retry_factor,
            self.retry_max_time,
        )
    }
}

/// Where upload bytes come from.
#[derive(Debug, Clone)]
pub(crate) enum UploadSource {
    Path(PathBuf),
    Bytes { data: Arc<Vec<u8>>, filename: String },
}

impl UploadSource {
    pub(crate) async fn size(&self) -> Result<u64> {
        match self {
            UploadSource::Path(path) => {
                Ok(tokio::fs::metadata(path).await?.len())
            }
            UploadSource::Bytes { data, .. } => Ok(data.len() as u64),
        }
    }

    pub(crate) fn filename(&self) -> String {
        match self {
            UploadSource::Path(path) => path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("untitled")
                .to_owned(),
            UploadSource::Bytes { filename, .. } => filename.clone(),
        }
    }

    pub(crate) fn mimetype(&self) -> &'static str {
        match self {
            UploadSource::Path(path) => mimetype::from_path(path),
            UploadSource::Bytes { filename, .. } => {
                mimetype::from_path(filename)
            }
        }
    }

    pub(crate) async fn read_range(
        &self,
        offset: u64,
        len: u64,
    ) -> Result<Vec<u8>> {
        match self {
            UploadSource::Path(path) => {
                let mut file = tokio::fs::File::open(path).await?;
                file.seek(SeekFrom::Start(offset)).await?;
                let mut buffer = vec![0u8; len as usize];
                file.read_exact(&mut buffer).await?;
                Ok(buffer)
            }
            UploadSource::Bytes { data, .. } => {
                let start = offset as usize;
                let end = start + len as usize;
                let slice = data.get(start..end).ok_or_else(|| {
                    FiledockError::Other(anyhow!(
                        "read past end of source ({}..{} of {})",
                        start,
                        end,
                        data.len()
                    ))
                })?;
                Ok(slice.to_vec())
            }
        }
    }
}

/// Shared state handed to every part worker.
#[derive(Clone)]
struct PartContext {
    http: reqwest::Client,
    session: Session,
    start: StartResponse,
    policy: RetryPolicy,
    intelligent: bool,
    chunk_size: u64,
    token: UploadToken,
    tracker: Arc<ProgressTracker>,
    source: Arc<UploadSource>,
    semaphore: Arc<Semaphore>,
}

/// One multi-part upload against the service.
pub(crate) struct MultipartUpload {
    http: reqwest::Client,
    session: Session,
    options: UploadOptions,
    store: StoreOptions,
    token: UploadToken,
}

impl MultipartUpload {
    pub(crate) fn new(
        session: Session,
        options: UploadOptions,
        store: StoreOptions,
        token: UploadToken,
    ) -> Result<Self> {
        options.validate()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(options.timeout))
            .build()?;
        Ok(Self {
            http,
            session,
            options,
            store,
            token,
        })
    }

    pub(crate) async fn run(&self, source: UploadSource) -> Result<FileMetadata> {
        let local_id = Uuid::new_v4();
        let size = source.size().await?;
        let filename = source.filename();
        let content_type = source.mimetype();
        debug!(
            "Upload {}: {} ({} bytes, {}), intelligent={}",
            local_id, filename, size, content_type, self.options.intelligent
        );

        let start = api::start(
            &self.http,
            &self.session,
            &StartRequest {
                apikey: &self.session.apikey,
                filename: &filename,
                mimetype: content_type,
                size,
                store: &self.store,
                intelligent: self.options.intelligent,
                tags: &self.options.tags,
                policy: self
                    .session
                    .security
                    .as_ref()
                    .map(|s| s.policy.as_str()),
                signature: self
                    .session
                    .security
                    .as_ref()
                    .map(|s| s.signature.as_str()),
            },
        )
        .await?;

        let parts = PartsMap::split(size, self.options.part_size)?;
        info!(
            "Upload {}: session {} with {} part(s)",
            local_id,
            start.upload_id,
            parts.parts.len()
        );

        let tracker = Arc::new(ProgressTracker::new(
            size,
            Duration::from_millis(self.options.progress_interval),
            self.options.subscribers.clone(),
        ));
        let context = PartContext {
            http: self.http.clone(),
            session: self.session.clone(),
            start: start.clone(),
            policy: self.options.retry_policy(),
            intelligent: self.options.intelligent,
            chunk_size: self.options.intelligent_chunk_size,
            token: self.token.clone(),
            tracker: tracker.clone(),
            source: Arc::new(source),
            semaphore: Arc::new(Semaphore::new(self.options.concurrency)),
        };

        let mut workers = JoinSet::new();
        for part in parts.parts.iter().cloned() {
            let context = context.clone();
            workers.spawn(async move { upload_part(context, part).await });
        }

        let mut completed = Vec::with_capacity(parts.parts.len());
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(part)) => completed.push(part),
                Ok(Err(err)) => {
                    workers.abort_all();
                    return Err(err);
                }
                Err(err) => {
                    workers.abort_all();
                    return Err(FiledockError::Other(anyhow!(
                        "upload worker failed: {}",
                        err
                    )));
                }
            }
        }
        completed.sort_by_key(|part| part.part_number);

        let metadata = api::complete(
            &self.http,
            &self.session,
            &CompleteRequest {
                apikey: &self.session.apikey,
                upload_id: &start.upload_id,
                region: &start.region,
                uri: &start.uri,
                filename: &filename,
                mimetype: content_type,
                size,
                parts: &completed,
                store: &self.store,
            },
        )
        .await?;

        info!(
            "Upload {}: finished, handle {} ({} bytes sent)",
            local_id,
            metadata.handle,
            tracker.loaded()
        );
        Ok(metadata)
    }
}

async fn upload_part(
    context: PartContext,
    part: PartObj,
) -> Result<CompletedPart> {
    let _permit = context
        .semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| FiledockError::Cancelled)?;
    context.token.checkpoint().await?;

    let data = context.source.read_range(part.offset, part.size).await?;
    if context.intelligent {
        upload_part_chunked(&context, &part, data).await
    } else {
        upload_part_whole(&context, &part, data).await
    }
}

async fn upload_part_whole(
    context: &PartContext,
    part: &PartObj,
    data: Vec<u8>,
) -> Result<CompletedPart> {
    let etag = with_retry(context, part.number, || {
        let context = context.clone();
        let body = data.clone();
        let number = part.number;
        async move { send_chunk(&context, number, None, body).await }
    })
    .await?;
    context.tracker.add(part.size);
    Ok(CompletedPart {
        part_number: part.number,
        etag,
    })
}

/// Intelligent-ingestion path: the part streams in sub-chunks, and a
/// retryable failure halves the chunk size (floor 32 KiB) before the next
/// attempt on the same offset.
async fn upload_part_chunked(
    context: &PartContext,
    part: &PartObj,
    data: Vec<u8>,
) -> Result<CompletedPart> {
    let mut chunk_size = context.chunk_size.max(MIN_CHUNK_SIZE);
    let mut sent: u64 = 0;

    loop {
        let mut attempt: u32 = 0;
        // The chunk is re-sliced on every attempt: a halved chunk_size
        // applies to the retry of the same offset.
        let len = loop {
            context.token.checkpoint().await?;
            let len = chunk_size.min(part.size - sent);
            let chunk =
                data[sent as usize..(sent + len) as usize].to_vec();
            match send_chunk(context, part.number, Some(sent), chunk).await {
                Ok(_) => break len,
                Err(err)
                    if attempt < context.policy.retries
                        && is_retryable(&err) =>
                {
                    let delay = context.policy.delay_for_attempt(attempt);
                    attempt += 1;
                    if chunk_size > MIN_CHUNK_SIZE {
                        chunk_size = (chunk_size / 2).max(MIN_CHUNK_SIZE);
                        debug!(
                            "Part {}: shrinking chunk size to {} after failure",
                            part.number, chunk_size
                        );
                    }
                    warn!(
                        "Part {} chunk at offset {} failed (attempt {}): {}; retrying in {:?}",
                        part.number, sent, attempt, err, delay
                    );
                    context.tracker.retry(RetryEvent {
                        part: part.number,
                        attempt,
                        delay,
                        reason: err.to_string(),
                    });
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        };

        context.tracker.add(len);
        sent += len;
        if sent >= part.size {
            break;
        }
    }

    let commit = with_retry(context, part.number, || {
        let context = context.clone();
        let number = part.number;
        let size = part.size;
        async move {
            api::commit_part(
                &context.http,
                &context.session,
                &CommitRequest {
                    apikey: &context.session.apikey,
                    upload_id: &context.start.upload_id,
                    region: &context.start.region,
                    uri: &context.start.uri,
                    part: number,
                    size,
                },
            )
            .await
        }
    })
    .await?;

    Ok(CompletedPart {
        part_number: part.number,
        etag: commit.etag,
    })
}

/// Request a presigned target for one part or chunk, then PUT the bytes.
/// Returns the storage backend's ETag.
async fn send_chunk(
    context: &PartContext,
    part_number: u32,
    offset: Option<u64>,
    body: Vec<u8>,
) -> Result<String> {
    let ticket = api::request_part(
        &context.http,
        &context.session,
        &PartRequest {
            apikey: &context.session.apikey,
            upload_id: &context.start.upload_id,
            region: &context.start.region,
            uri: &context.start.uri,
            part: part_number,
            size: body.len() as u64,
            checksum: format!("{:08x}", checksum(&body)),
            offset,
        },
    )
    .await?;
    put_bytes(&context.http, &ticket, body).await
}

async fn put_bytes(
    http: &reqwest::Client,
    ticket: &PartResponse,
    body: Vec<u8>,
) -> Result<String> {
    let mut request = http.put(ticket.url.clone()).body(body);
    for (name, value) in &ticket.headers {
        request = request.header(name, value);
    }
    let response = api::check_response(request.send().await?).await?;
    let etag = response
        .headers()
        .get("ETag")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_matches('"').to_owned())
        .unwrap_or_default();
    Ok(etag)
}

async fn with_retry<T, F, Fut>(
    context: &PartContext,
    part: u32,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        context.token.checkpoint().await?;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err)
                if attempt < context.policy.retries && is_retryable(&err) =>
            {
                let delay = context.policy.delay_for_attempt(attempt);
                attempt += 1;
                warn!(
                    "Part {} attempt {} failed: {}; retrying in {:?}",
                    part, attempt, err, delay
                );
                context.tracker.retry(RetryEvent {
                    part,
                    attempt,
                    delay,
                    reason: err.to_string(),
                });
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

fn is_retryable(err: &FiledockError) -> bool {
    match err {
        FiledockError::Api { status, .. } => is_retryable_status(*status),
        FiledockError::Http(err) => match err.status() {
            Some(status) => is_retryable_status(status.as_u16()),
            // Transport-level failures (refused, reset, timed out).
            None => true,
        },
        _ => false,
    }
}
