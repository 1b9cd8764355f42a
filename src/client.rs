use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use url::Url;

use crate::config::{Session, SessionCache};
use crate::file::{
    FileMetadata, MetadataOptions, RemoteMetadata, RetrieveOptions,
};
use crate::picker::{self, PickerOptions, PickerResponse};
use crate::security::Security;
use crate::store::{StorageLocation, StoreOptions};
use crate::transform::{Transform, TransformSource};
use crate::upload::api::check_response;
use crate::upload::{
    MultipartUpload, UploadOptions, UploadSource, UploadToken,
    DEFAULT_TIMEOUT_MS,
};
use crate::{FiledockError, Result};

/// Handle to the Filedock service, created with [`crate::init`].
///
/// All remote operations are async and resolve to a typed response or a
/// [`FiledockError`]. The client is cheap to clone.
#[derive(Debug, Clone)]
pub struct Client {
    session: Session,
    http: reqwest::Client,
    session_cache: bool,
}

impl Client {
    pub(crate) fn new(session: Session, session_cache: bool) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .build()?;
        Ok(Self {
            session,
            http,
            session_cache,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn security(&self) -> Option<&Security> {
        self.session.security.as_ref()
    }

    fn require_security(&self) -> Result<()> {
        if self.session.security.is_none() {
            return Err(FiledockError::Security(
                "this operation requires a policy/signature pair".to_owned(),
            ));
        }
        Ok(())
    }

    fn api_url(
        &self,
        path: &str,
        query: Vec<(&'static str, String)>,
    ) -> Result<Url> {
        let mut url = self.session.api_host.join(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in self.session.auth_pairs() {
                pairs.append_pair(key, &value);
            }
            for (key, value) in query {
                pairs.append_pair(key, &value);
            }
        }
        Ok(url)
    }

    /// Fetch the requested metadata attributes of a stored file.
    pub async fn metadata(
        &self,
        handle: &str,
        options: MetadataOptions,
    ) -> Result<RemoteMetadata> {
        let url = self.api_url(
            &format!("file/{}/metadata", handle),
            options.query_pairs(),
        )?;
        let response = self.http.get(url).send().await?;
        Ok(check_response(response).await?.json().await?)
    }

    /// Download the content of a stored file.
    pub async fn retrieve(
        &self,
        handle: &str,
        options: RetrieveOptions,
    ) -> Result<Vec<u8>> {
        let url = self
            .api_url(&format!("file/{}", handle), options.query_pairs())?;
        let response = self.http.get(url).send().await?;
        Ok(check_response(response)
            .await?
            .bytes()
            .await?
            .to_vec())
    }

    /// Delete a stored file. Requires security.
    pub async fn remove(&self, handle: &str) -> Result<()> {
        self.require_security()?;
        let url = self.api_url(&format!("file/{}", handle), Vec::new())?;
        let response = self.http.delete(url).send().await?;
        check_response(response).await?;
        debug!("Removed file {}", handle);
        Ok(())
    }

    /// Delete the stored metadata of a file, keeping its content.
    /// Requires security.
    pub async fn remove_metadata(&self, handle: &str) -> Result<()> {
        self.require_security()?;
        let url =
            self.api_url(&format!("file/{}/metadata", handle), Vec::new())?;
        let response = self.http.delete(url).send().await?;
        check_response(response).await?;
        Ok(())
    }

    /// Ingest an external URL into storage.
    pub async fn store_url(
        &self,
        source: &Url,
        options: StoreOptions,
    ) -> Result<FileMetadata> {
        let location = options.location.unwrap_or(StorageLocation::S3);
        let mut query = options.query_pairs();
        query.push(("url", source.to_string()));
        let url =
            self.api_url(&format!("store/{}", location.as_str()), query)?;
        let response = self.http.post(url).send().await?;
        Ok(check_response(response).await?.json().await?)
    }

    /// Build the processing URL for a transformation chain. Pure URL
    /// construction, no request is made.
    pub fn transform(
        &self,
        source: &TransformSource,
        transform: &Transform,
    ) -> Result<Url> {
        transform.build_url(&self.session, source)
    }

    /// Build the processing URL and download the processed content.
    pub async fn transform_and_fetch(
        &self,
        source: &TransformSource,
        transform: &Transform,
    ) -> Result<Vec<u8>> {
        let url = self.transform(source, transform)?;
        let response = self.http.get(url).send().await?;
        Ok(check_response(response)
            .await?
            .bytes()
            .await?
            .to_vec())
    }

    /// Document preview URL for a stored file.
    pub fn preview_url(&self, handle: &str) -> Result<Url> {
        Ok(self
            .session
            .cdn_host
            .join(&format!("preview/{}", handle))?)
    }

    /// Upload a file from disk through the multi-part engine.
    pub async fn upload<P: AsRef<Path>>(
        &self,
        path: P,
        options: UploadOptions,
        store: StoreOptions,
        token: Option<UploadToken>,
    ) -> Result<FileMetadata> {
        let upload = MultipartUpload::new(
            self.session.clone(),
            options,
            store,
            token.unwrap_or_default(),
        )?;
        upload
            .run(UploadSource::Path(path.as_ref().to_path_buf()))
            .await
    }

    /// Upload an in-memory buffer through the multi-part engine.
    pub async fn upload_bytes(
        &self,
        data: Vec<u8>,
        filename: &str,
        options: UploadOptions,
        store: StoreOptions,
        token: Option<UploadToken>,
    ) -> Result<FileMetadata> {
        let upload = MultipartUpload::new(
            self.session.clone(),
            options,
            store,
            token.unwrap_or_default(),
        )?;
        upload
            .run(UploadSource::Bytes {
                data: Arc::new(data),
                filename: filename.to_owned(),
            })
            .await
    }

    /// Blocking version of [`Client::upload`] for non-async callers.
    pub fn upload_blocking<P: AsRef<Path>>(
        &self,
        path: P,
        options: UploadOptions,
        store: StoreOptions,
        token: Option<UploadToken>,
    ) -> Result<FileMetadata> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.upload(path, options, store, token))
    }

    /// Run a headless pick session: enumerate, filter, upload, report.
    pub async fn pick(&self, options: PickerOptions) -> Result<PickerResponse> {
        picker::run_pick(self, options).await
    }

    /// End the session server-side and drop any cached credentials for
    /// this apikey.
    pub async fn logout(&self) -> Result<()> {
        let url = self.api_url("auth/logout", Vec::new())?;
        let result = match self.http.post(url).send().await {
            Ok(response) => check_response(response).await.map(|_| ()),
            Err(err) => Err(err.into()),
        };

        if self.session_cache {
            match SessionCache::load() {
                Ok(mut cache) => {
                    let _ = cache.remove(&self.session.apikey);
                }
                Err(err) => {
                    warn!("Could not open session cache: {}", err)
                }
            }
        }
        result
    }
}
