use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Session;
use crate::file::FileMetadata;
use crate::store::StoreOptions;
use crate::{FiledockError, Result};

/// Turn a non-2xx response into an [`FiledockError::Api`] carrying the
/// service's message body.
pub(crate) async fn check_response(
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(FiledockError::Api {
        status: status.as_u16(),
        message,
    })
}

#[derive(Debug, Serialize)]
pub(crate) struct StartRequest<'a> {
    pub apikey: &'a str,
    pub filename: &'a str,
    pub mimetype: &'a str,
    pub size: u64,
    pub store: &'a StoreOptions,
    pub intelligent: bool,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub tags: &'a HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<&'a str>,
}

/// Upload session descriptor returned by `multipart/start`. `uri` and
/// `region` are opaque routing values echoed back on every later call.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StartResponse {
    pub uri: String,
    pub region: String,
    pub upload_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PartRequest<'a> {
    pub apikey: &'a str,
    pub upload_id: &'a str,
    pub region: &'a str,
    pub uri: &'a str,
    pub part: u32,
    pub size: u64,
    /// CRC32 of the bytes about to be sent, lowercase hex.
    pub checksum: String,
    /// Byte offset within the part; only present for chunked uploads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

/// Presigned target for one part or chunk.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PartResponse {
    pub url: Url,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CommitRequest<'a> {
    pub apikey: &'a str,
    pub upload_id: &'a str,
    pub region: &'a str,
    pub uri: &'a str,
    pub part: u32,
    pub size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CommitResponse {
    pub etag: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CompletedPart {
    pub part_number: u32,
    pub etag: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CompleteRequest<'a> {
    pub apikey: &'a str,
    pub upload_id: &'a str,
    pub region: &'a str,
    pub uri: &'a str,
    pub filename: &'a str,
    pub mimetype: &'a str,
    pub size: u64,
    pub parts: &'a [CompletedPart],
    pub store: &'a StoreOptions,
}

pub(crate) async fn start(
    http: &reqwest::Client,
    session: &Session,
    request: &StartRequest<'_>,
) -> Result<StartResponse> {
    let url = session.upload_host.join("multipart/start")?;
    let response = http.post(url).json(request).send().await?;
    Ok(check_response(response).await?.json().await?)
}

pub(crate) async fn request_part(
    http: &reqwest::Client,
    session: &Session,
    request: &PartRequest<'_>,
) -> Result<PartResponse> {
    let url = session.upload_host.join("multipart/upload")?;
    let response = http.post(url).json(request).send().await?;
    Ok(check_response(response).await?.json().await?)
}

pub(crate) async fn commit_part(
    http: &reqwest::Client,
    session: &Session,
    request: &CommitRequest<'_>,
) -> Result<CommitResponse> {
    let url = session.upload_host.join("multipart/commit")?;
    let response = http.post(url).json(request).send().await?;
    Ok(check_response(response).await?.json().await?)
}

pub(crate) async fn complete(
    http: &reqwest::Client,
    session: &Session,
    request: &CompleteRequest<'_>,
) -> Result<FileMetadata> {
    let url = session.upload_host.join("multipart/complete")?;
    let response = http.post(url).json(request).send().await?;
    Ok(check_response(response).await?.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_request_omits_absent_credentials() {
        let store = StoreOptions::default();
        let tags = HashMap::new();
        let request = StartRequest {
            apikey: "A5kYm2PqR",
            filename: "photo.jpg",
            mimetype: "image/jpeg",
            size: 1024,
            store: &store,
            intelligent: false,
            tags: &tags,
            policy: None,
            signature: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("policy"));
        assert!(!json.contains("signature"));
        assert!(!json.contains("tags"));
    }

    #[test]
    fn part_request_offset_only_when_chunked() {
        let request = PartRequest {
            apikey: "A5kYm2PqR",
            upload_id: "u-1",
            region: "eu-west-1",
            uri: "/u-1",
            part: 3,
            size: 512,
            checksum: "cbf43926".to_owned(),
            offset: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("offset"));

        let chunked = PartRequest {
            offset: Some(65536),
            ..request
        };
        let json = serde_json::to_string(&chunked).unwrap();
        assert!(json.contains("\"offset\":65536"));
    }

    #[test]
    fn part_response_headers_default_to_empty() {
        let response: PartResponse = serde_json::from_str(
            r#"{"url": "https://bucket.s3.amazonaws.com/u-1/3"}"#,
        )
        .unwrap();
        assert!(response.headers.is_empty());
    }
}
