//! Rust client for the Filedock file handling service: multi-part uploads
//! with pause/resume/cancel, a headless pick flow, the processing API and
//! the file REST operations (metadata, retrieve, remove, store by URL).

pub mod client;
pub mod config;
pub mod errors;
pub mod file;
pub mod mimetype;
pub mod picker;
pub mod security;
pub mod store;
pub mod transform;
pub mod upload;

pub use client::Client;
pub use config::{
    ClientOptions, Session, SessionCache, API_HOST, CDN_HOST, UPLOAD_HOST,
};
pub use errors::{FiledockError, Result};
pub use file::{
    FileMetadata, FileStatus, MetadataOptions, RemoteMetadata,
    RetrieveOptions,
};
pub use picker::{
    CandidateFile, FailedFile, PickSource, PickSubscriber, PickerOptions,
    PickerResponse,
};
pub use security::{Policy, PolicyCall, Security};
pub use store::{StorageLocation, StoreAccess, StoreOptions};
pub use transform::{Transform, TransformSource};
pub use upload::{
    PartObj, PartsMap, ProgressEvent, RetryEvent, RetryPolicy, UploadOptions,
    UploadSubscriber, UploadToken,
};

use log::{debug, warn};

/// Create a [`Client`] with default options.
pub fn init(apikey: &str) -> Result<Client> {
    init_with(apikey, ClientOptions::default())
}

/// Create a [`Client`].
///
/// With `session_cache` enabled, security credentials are restored from the
/// on-disk cache when the options carry none, and persisted when they do.
pub fn init_with(apikey: &str, options: ClientOptions) -> Result<Client> {
    let mut options = options;

    if options.session_cache && options.security.is_none() {
        match SessionCache::load() {
            Ok(cache) => {
                if let Some(security) = cache.get(apikey) {
                    debug!("Restored cached session");
                    options.security = Some(security.clone());
                }
            }
            Err(err) => warn!("Could not open session cache: {}", err),
        }
    }

    let session = Session::new(apikey, &options)?;

    if options.session_cache {
        if let Some(security) = &session.security {
            let mut cache = SessionCache::load().unwrap_or_default();
            cache.insert(apikey, security.clone());
            if let Err(err) = cache.save() {
                warn!("Could not persist session cache: {}", err);
            }
        }
    }

    Client::new(session, options.session_cache)
}
