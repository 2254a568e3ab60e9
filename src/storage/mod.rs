use std::path::{Path, PathBuf};

use log::{debug, info};
use tokio::fs;

use crate::error::SyncError;
use crate::manifest::ManifestInfo;

pub const MANIFEST_NAME: &str = "manifest.sqlite";
pub const INFO_NAME: &str = "manifest-info.json";

const MANIFEST_TMP: &str = "manifest.sqlite.tmp";
const INFO_TMP: &str = "manifest-info.json.tmp";

/// On-disk pair of (data file, descriptor file) representing the currently
/// installed manifest snapshot. Single-writer; concurrent installs against
/// the same directory are out of contract.
#[derive(Debug)]
pub struct ManifestStore {
    dir: PathBuf,
}

impl ManifestStore {
    /// Open a store over an existing directory. The directory is a caller
    /// precondition and is never created here.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SyncError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(SyncError::Precondition(dir.to_path_buf()));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_NAME)
    }

    pub fn info_path(&self) -> PathBuf {
        self.dir.join(INFO_NAME)
    }

    /// Read the currently installed descriptor.
    ///
    /// `Ok(None)` when either the descriptor file or the data file is
    /// missing: a fresh install and a prior partial failure look the same
    /// and both force an update. A descriptor file that exists but cannot
    /// be parsed is `CorruptLocalState`, distinct from absent.
    pub async fn read_current(&self) -> Result<Option<ManifestInfo>, SyncError> {
        let info_path = self.info_path();
        let manifest_path = self.manifest_path();
        if !info_path.exists() || !manifest_path.exists() {
            debug!("store: no usable local state in {}", self.dir.display());
            return Ok(None);
        }

        let body = fs::read_to_string(&info_path)
            .await
            .map_err(SyncError::StoreRead)?;
        let info = ManifestInfo::from_local_record(&body)
            .map_err(|e| SyncError::CorruptLocalState(e.to_string()))?;
        Ok(Some(info))
    }

    /// Install a new payload and its descriptor as a unit.
    ///
    /// Both artifacts are staged under temp names in the store directory,
    /// then renamed into place, payload first. A reader sampling the data
    /// path at any instant sees either the old or the new content in full,
    /// and a failed install leaves the previous descriptor untouched with
    /// no temp files behind.
    pub async fn install(&self, payload: &[u8], info: &ManifestInfo) -> Result<(), SyncError> {
        let payload_tmp = self.dir.join(MANIFEST_TMP);
        let info_tmp = self.dir.join(INFO_TMP);

        let record = info.to_local_record()?;

        if let Err(e) = fs::write(&payload_tmp, payload).await {
            return Err(SyncError::StoreWrite(format!(
                "staging payload failed: {e}"
            )));
        }
        if let Err(e) = fs::write(&info_tmp, record.as_bytes()).await {
            let _ = fs::remove_file(&payload_tmp).await;
            return Err(SyncError::StoreWrite(format!(
                "staging descriptor failed: {e}"
            )));
        }

        if let Err(e) = fs::rename(&payload_tmp, self.manifest_path()).await {
            let _ = fs::remove_file(&payload_tmp).await;
            let _ = fs::remove_file(&info_tmp).await;
            return Err(SyncError::StoreWrite(format!(
                "installing payload failed: {e}"
            )));
        }
        if let Err(e) = fs::rename(&info_tmp, self.info_path()).await {
            let _ = fs::remove_file(&info_tmp).await;
            return Err(SyncError::StoreWrite(format!(
                "installing descriptor failed: {e}"
            )));
        }

        info!(
            "store: installed manifest version {} ({} bytes)",
            info.version,
            payload.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn sample_info() -> ManifestInfo {
        ManifestInfo {
            version: "123.25.01".into(),
            url: "https://www.bungie.net/common/world_content.zip".into(),
        }
    }

    #[test]
    fn open_requires_existing_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = ManifestStore::open(&missing).unwrap_err();
        assert!(matches!(err, SyncError::Precondition(_)));
    }

    #[tokio::test]
    async fn empty_directory_reads_as_absent() {
        let dir = tempdir().unwrap();
        let store = ManifestStore::open(dir.path()).unwrap();
        assert!(store.read_current().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn descriptor_without_data_file_reads_as_absent() {
        let dir = tempdir().unwrap();
        let store = ManifestStore::open(dir.path()).unwrap();
        std::fs::write(store.info_path(), sample_info().to_local_record().unwrap()).unwrap();
        assert!(store.read_current().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn data_file_without_descriptor_reads_as_absent() {
        let dir = tempdir().unwrap();
        let store = ManifestStore::open(dir.path()).unwrap();
        std::fs::write(store.manifest_path(), b"payload").unwrap();
        assert!(store.read_current().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_descriptor_is_corrupt_not_absent() {
        let dir = tempdir().unwrap();
        let store = ManifestStore::open(dir.path()).unwrap();
        std::fs::write(store.manifest_path(), b"payload").unwrap();
        std::fs::write(store.info_path(), b"{not json").unwrap();
        let err = store.read_current().await.unwrap_err();
        assert!(matches!(err, SyncError::CorruptLocalState(_)));
    }

    #[tokio::test]
    async fn install_writes_both_artifacts_and_reads_back() {
        let dir = tempdir().unwrap();
        let store = ManifestStore::open(dir.path()).unwrap();
        let info = sample_info();

        store.install(b"sqlite bytes", &info).await.unwrap();

        assert_eq!(
            std::fs::read(store.manifest_path()).unwrap(),
            b"sqlite bytes"
        );
        assert_eq!(store.read_current().await.unwrap(), Some(info));
    }

    #[tokio::test]
    async fn install_replaces_previous_snapshot() {
        let dir = tempdir().unwrap();
        let store = ManifestStore::open(dir.path()).unwrap();
        store.install(b"old", &sample_info()).await.unwrap();

        let newer = ManifestInfo {
            version: "124.0.0".into(),
            url: "https://www.bungie.net/common/newer.zip".into(),
        };
        store.install(b"new", &newer).await.unwrap();

        assert_eq!(std::fs::read(store.manifest_path()).unwrap(), b"new");
        assert_eq!(store.read_current().await.unwrap(), Some(newer));
    }

    #[tokio::test]
    async fn install_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let store = ManifestStore::open(dir.path()).unwrap();
        store.install(b"payload", &sample_info()).await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }
}
