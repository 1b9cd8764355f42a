use serde::{Deserialize, Serialize};

/// Storage backends the service can write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLocation {
    S3,
    Gcs,
    Azure,
    Rackspace,
    Dropbox,
}

impl StorageLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageLocation::S3 => "s3",
            StorageLocation::Gcs => "gcs",
            StorageLocation::Azure => "azure",
            StorageLocation::Rackspace => "rackspace",
            StorageLocation::Dropbox => "dropbox",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreAccess {
    Public,
    Private,
}

impl StoreAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreAccess::Public => "public",
            StoreAccess::Private => "private",
        }
    }
}

/// Destination parameters for stored files.
///
/// All fields are optional; the service falls back to the application's
/// default storage when a field is absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<StorageLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<StoreAccess>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl StoreOptions {
    /// Flatten into query parameters for the REST store endpoints.
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(container) = &self.container {
            pairs.push(("container", container.clone()));
        }
        if let Some(path) = &self.path {
            pairs.push(("path", path.clone()));
        }
        if let Some(region) = &self.region {
            pairs.push(("region", region.clone()));
        }
        if let Some(access) = &self.access {
            pairs.push(("access", access.as_str().to_owned()));
        }
        if let Some(filename) = &self.filename {
            pairs.push(("filename", filename.clone()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_serialize_to_empty_object() {
        let json = serde_json::to_string(&StoreOptions::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn query_pairs_skip_absent_fields() {
        let options = StoreOptions {
            container: Some("backups".to_owned()),
            access: Some(StoreAccess::Private),
            ..Default::default()
        };
        assert_eq!(
            options.query_pairs(),
            vec![
                ("container", "backups".to_owned()),
                ("access", "private".to_owned()),
            ]
        );
    }

    #[test]
    fn location_serializes_lowercase() {
        let json = serde_json::to_string(&StorageLocation::Gcs).unwrap();
        assert_eq!(json, "\"gcs\"");
    }
}
