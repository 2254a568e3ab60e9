use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

const BASE_URL: &str = "https://www.bungie.net";
pub const MANIFEST_INFO_URL: &str = "https://www.bungie.net/Platform/Destiny2/Manifest/";

/// Locale selected from the remote content path map. Only one locale is
/// ever synced.
const LOCALE: &str = "en";

#[derive(Debug, Deserialize)]
struct RemoteManifestResponse {
    #[serde(rename = "Response")]
    response: RemoteManifestBody,
}

#[derive(Debug, Deserialize)]
struct RemoteManifestBody {
    version: String,
    #[serde(rename = "mobileWorldContentPaths")]
    mobile_world_content_paths: HashMap<String, String>,
}

/// Flat persisted record shape: `{"version": ..., "url": ...}`.
#[derive(Debug, Serialize, Deserialize)]
struct LocalRecord {
    version: String,
    url: String,
}

/// Version + download URL identifying one snapshot of the remote manifest.
///
/// Built fresh from the remote API on every run, or loaded from the
/// persisted record; both fields are always non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestInfo {
    pub version: String,
    pub url: String,
}

impl ManifestInfo {
    /// Parse the manifest-info endpoint response and resolve the absolute
    /// archive URL for the fixed locale.
    pub fn from_remote_response(body: &str) -> Result<Self, SyncError> {
        let parsed: RemoteManifestResponse = serde_json::from_str(body)
            .map_err(|e| SyncError::MalformedRemoteResponse(e.to_string()))?;

        let path = parsed
            .response
            .mobile_world_content_paths
            .get(LOCALE)
            .ok_or_else(|| {
                SyncError::MalformedRemoteResponse(format!(
                    "no content path for locale '{LOCALE}'"
                ))
            })?;

        Self::new(parsed.response.version, format!("{BASE_URL}{path}"))
            .map_err(SyncError::MalformedRemoteResponse)
    }

    /// Parse the flat persisted record.
    pub fn from_local_record(body: &str) -> Result<Self, SyncError> {
        let record: LocalRecord = serde_json::from_str(body)
            .map_err(|e| SyncError::MalformedLocalRecord(e.to_string()))?;
        Self::new(record.version, record.url).map_err(SyncError::MalformedLocalRecord)
    }

    /// Serialize to the flat persisted record shape.
    pub fn to_local_record(&self) -> Result<String, SyncError> {
        let record = LocalRecord {
            version: self.version.clone(),
            url: self.url.clone(),
        };
        serde_json::to_string(&record).map_err(|e| SyncError::StoreWrite(e.to_string()))
    }

    fn new(version: String, url: String) -> Result<Self, String> {
        if version.is_empty() {
            return Err("version is empty".into());
        }
        if url.is_empty() {
            return Err("url is empty".into());
        }
        Ok(Self { version, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_body(version: &str, path: &str) -> String {
        format!(
            r#"{{"Response":{{"version":"{version}","mobileWorldContentPaths":{{"en":"{path}","fr":"/fr/path"}}}}}}"#
        )
    }

    #[test]
    fn parses_remote_response_with_base_url_prefix() {
        let body = remote_body("123.25.01", "/common/world_content.zip");
        let info = ManifestInfo::from_remote_response(&body).unwrap();
        assert_eq!(info.version, "123.25.01");
        assert_eq!(info.url, "https://www.bungie.net/common/world_content.zip");
    }

    #[test]
    fn rejects_remote_response_missing_locale() {
        let body = r#"{"Response":{"version":"1","mobileWorldContentPaths":{"de":"/p"}}}"#;
        let err = ManifestInfo::from_remote_response(body).unwrap_err();
        assert!(matches!(err, SyncError::MalformedRemoteResponse(_)));
    }

    #[test]
    fn rejects_remote_response_missing_keys() {
        let err = ManifestInfo::from_remote_response(r#"{"Response":{}}"#).unwrap_err();
        assert!(matches!(err, SyncError::MalformedRemoteResponse(_)));
    }

    #[test]
    fn rejects_remote_response_with_empty_version() {
        let body = remote_body("", "/p");
        let err = ManifestInfo::from_remote_response(&body).unwrap_err();
        assert!(matches!(err, SyncError::MalformedRemoteResponse(_)));
    }

    #[test]
    fn parses_local_record() {
        let info =
            ManifestInfo::from_local_record(r#"{"version":"9.8.7","url":"https://x/y.zip"}"#)
                .unwrap();
        assert_eq!(info.version, "9.8.7");
        assert_eq!(info.url, "https://x/y.zip");
    }

    #[test]
    fn rejects_local_record_missing_or_empty_fields() {
        for body in [r#"{"version":"1"}"#, r#"{"url":"u"}"#, r#"{"version":"","url":"u"}"#] {
            let err = ManifestInfo::from_local_record(body).unwrap_err();
            assert!(matches!(err, SyncError::MalformedLocalRecord(_)), "{body}");
        }
    }

    #[test]
    fn local_record_round_trips() {
        let info = ManifestInfo {
            version: "123.25.01".into(),
            url: "https://www.bungie.net/common/world_content.zip".into(),
        };
        let record = info.to_local_record().unwrap();
        assert_eq!(ManifestInfo::from_local_record(&record).unwrap(), info);
    }
}
