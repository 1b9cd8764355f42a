use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// Lifecycle state of a stored file as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Stored,
    InTransit,
    Failed,
}

/// Descriptor of one uploaded file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileMetadata {
    /// Opaque identifier assigned by the remote storage API.
    pub handle: String,
    pub filename: String,
    pub mimetype: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    pub status: FileStatus,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

/// Attribute selectors for the metadata operation. Each flag requests one
/// response field; the service omits everything not asked for.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataOptions {
    pub size: bool,
    pub mimetype: bool,
    pub filename: bool,
    pub width: bool,
    pub height: bool,
    pub uploaded: bool,
    pub writeable: bool,
    pub location: bool,
    pub path: bool,
    pub container: bool,
    pub checksum: bool,
}

impl MetadataOptions {
    pub fn all() -> Self {
        Self {
            size: true,
            mimetype: true,
            filename: true,
            width: true,
            height: true,
            uploaded: true,
            writeable: true,
            location: true,
            path: true,
            container: true,
            checksum: true,
        }
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let flags = [
            ("size", self.size),
            ("mimetype", self.mimetype),
            ("filename", self.filename),
            ("width", self.width),
            ("height", self.height),
            ("uploaded", self.uploaded),
            ("writeable", self.writeable),
            ("location", self.location),
            ("path", self.path),
            ("container", self.container),
            ("checksum", self.checksum),
        ];
        flags
            .into_iter()
            .filter(|(_, enabled)| *enabled)
            .map(|(name, _)| (name, "true".to_owned()))
            .collect()
    }
}

/// Metadata record returned by the service. Only the requested attributes
/// are present.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RemoteMetadata {
    pub size: Option<u64>,
    pub mimetype: Option<String>,
    pub filename: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Upload time, unix milliseconds.
    pub uploaded: Option<u64>,
    pub writeable: Option<bool>,
    pub location: Option<String>,
    pub path: Option<String>,
    pub container: Option<String>,
    pub checksum: Option<String>,
}

/// Options for retrieving file content.
#[derive(Debug, Clone, Default)]
pub struct RetrieveOptions {
    /// Ask the service for a `Content-Disposition: attachment` response.
    pub dl: bool,
    /// Allow CDN-cached content.
    pub cache: bool,
    /// Override the filename extension used for content negotiation.
    pub extension: Option<String>,
}

impl RetrieveOptions {
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if self.dl {
            pairs.push(("dl", "true".to_owned()));
        }
        if self.cache {
            pairs.push(("cache", "true".to_owned()));
        }
        if let Some(extension) = &self.extension {
            pairs.push(("extension", extension.clone()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&FileStatus::InTransit).unwrap(),
            "\"in_transit\""
        );
        assert_eq!(
            serde_json::from_str::<FileStatus>("\"stored\"").unwrap(),
            FileStatus::Stored
        );
    }

    #[test]
    fn metadata_defaults_request_nothing() {
        assert!(MetadataOptions::default().query_pairs().is_empty());
    }

    #[test]
    fn metadata_all_requests_every_attribute() {
        assert_eq!(MetadataOptions::all().query_pairs().len(), 11);
    }

    #[test]
    fn remote_metadata_tolerates_sparse_responses() {
        let meta: RemoteMetadata =
            serde_json::from_str(r#"{"size": 1024, "mimetype": "image/png"}"#)
                .unwrap();
        assert_eq!(meta.size, Some(1024));
        assert_eq!(meta.mimetype.as_deref(), Some("image/png"));
        assert!(meta.filename.is_none());
    }

    #[test]
    fn file_metadata_round_trips() {
        let json = r#"{
            "handle": "h9aT3nXwQ",
            "filename": "photo.jpg",
            "mimetype": "image/jpeg",
            "size": 2048,
            "url": "https://cdn.filedock.io/h9aT3nXwQ",
            "status": "stored"
        }"#;
        let meta: FileMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.handle, "h9aT3nXwQ");
        assert_eq!(meta.status, FileStatus::Stored);
        assert!(meta.tags.is_empty());
    }
}
