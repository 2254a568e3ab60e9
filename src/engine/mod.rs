use log::{debug, info, warn};

use crate::archive;
use crate::error::SyncError;
use crate::manifest::{MANIFEST_INFO_URL, ManifestInfo};
use crate::networking::RemoteFetcher;
use crate::storage::ManifestStore;

/// Which single descriptor field an info query reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfoField {
    LocalVersion,
    LocalUrl,
    RemoteVersion,
    RemoteUrl,
}

impl InfoField {
    fn is_local(self) -> bool {
        matches!(self, InfoField::LocalVersion | InfoField::LocalUrl)
    }

    fn pick(self, info: &ManifestInfo) -> String {
        match self {
            InfoField::LocalVersion | InfoField::RemoteVersion => info.version.clone(),
            InfoField::LocalUrl | InfoField::RemoteUrl => info.url.clone(),
        }
    }
}

/// What a single engine run is asked to do.
#[derive(Clone, Copy, Debug)]
pub enum Mode {
    /// Report one field of the local or remote descriptor.
    Info(InfoField),
    /// Report whether an update is available; never installs.
    Check,
    /// Install the remote snapshot when an update is available, or
    /// unconditionally when forced.
    Sync { force: bool },
}

/// Result of a successful run; failures are the error side of [`run`].
///
/// [`run`]: SyncEngine::run
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Local snapshot already matches the remote; nothing was written.
    NoChange,
    /// A new snapshot was downloaded and installed.
    Updated { info: ManifestInfo },
    /// Info query answered. `None` means local data was requested but is
    /// absent, which is a quiet success.
    InfoReported(Option<String>),
    /// Check-only report.
    Checked {
        update_available: bool,
        remote: ManifestInfo,
    },
}

/// An update is available whenever no usable local descriptor exists or the
/// content URLs differ. The URL is the authoritative change signal; version
/// strings are never compared.
pub fn update_available(local: Option<&ManifestInfo>, remote: &ManifestInfo) -> bool {
    match local {
        Some(local) => local.url != remote.url,
        None => true,
    }
}

/// Stateless per-run sync decision logic. Holds no state across runs; a
/// periodic caller re-invoking it with an unchanged remote performs no
/// writes after the first install.
pub struct SyncEngine<F: RemoteFetcher> {
    store: ManifestStore,
    fetcher: F,
    api_key: String,
}

impl<F: RemoteFetcher> SyncEngine<F> {
    pub fn new(store: ManifestStore, fetcher: F, api_key: impl Into<String>) -> Self {
        Self {
            store,
            fetcher,
            api_key: api_key.into(),
        }
    }

    pub async fn run(&self, mode: Mode) -> Result<Outcome, SyncError> {
        // Local-field info queries never touch the network.
        if let Mode::Info(field) = mode
            && field.is_local()
        {
            let local = self.load_local().await?;
            return Ok(Outcome::InfoReported(local.map(|info| field.pick(&info))));
        }

        let remote = self.fetch_remote().await?;

        match mode {
            Mode::Info(field) => Ok(Outcome::InfoReported(Some(field.pick(&remote)))),
            Mode::Check => {
                let local = self.load_local().await?;
                let available = update_available(local.as_ref(), &remote);
                debug!(
                    "engine: check: local url {:?}, remote url {}",
                    local.as_ref().map(|l| l.url.as_str()),
                    remote.url
                );
                Ok(Outcome::Checked {
                    update_available: available,
                    remote,
                })
            }
            Mode::Sync { force } => {
                let local = self.load_local().await?;
                if !update_available(local.as_ref(), &remote) && !force {
                    info!(
                        "engine: local manifest up-to-date (version {})",
                        remote.version
                    );
                    return Ok(Outcome::NoChange);
                }
                self.download_and_install(remote).await
            }
        }
    }

    async fn load_local(&self) -> Result<Option<ManifestInfo>, SyncError> {
        match self.store.read_current().await {
            Ok(local) => Ok(local),
            // Absent and corrupt look the same to the decision: no usable
            // local descriptor. Only unexpected I/O failures are fatal.
            Err(err) if err.is_unusable_local() => {
                warn!("engine: ignoring unreadable local manifest state: {err}");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn fetch_remote(&self) -> Result<ManifestInfo, SyncError> {
        let body = self
            .fetcher
            .fetch_text(MANIFEST_INFO_URL, Some(&self.api_key))
            .await?;
        ManifestInfo::from_remote_response(&body)
    }

    async fn download_and_install(&self, remote: ManifestInfo) -> Result<Outcome, SyncError> {
        info!(
            "engine: downloading manifest version {} from {}",
            remote.version, remote.url
        );
        let blob = self
            .fetcher
            .fetch_bytes(&remote.url, Some(&self.api_key))
            .await?;
        let (entry_name, payload) = archive::extract_single(&blob)?;
        debug!("engine: extracted archive entry '{entry_name}'");
        self.store.install(&payload, &remote).await?;
        Ok(Outcome::Updated { info: remote })
    }
}
