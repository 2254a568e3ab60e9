use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::{error, info};

mod archive;
mod engine;
mod error;
mod manifest;
mod networking;
mod storage;

use engine::{InfoField, Mode, Outcome, SyncEngine};
use error::SyncError;
use networking::ApiClient;
use storage::ManifestStore;

#[derive(Parser, Debug)]
#[command(
    name = "manifest-sync",
    author,
    version,
    about = "Manage the local and remote Destiny 2 API manifest database"
)]
struct Cli {
    /// Destiny 2 API key, sent as the X-API-Key header.
    #[arg(long, short = 'k')]
    key: String,

    /// Existing directory the manifest and its info record are stored in.
    #[arg(long, short = 'o')]
    manifest_dir: PathBuf,

    /// Print a single field of the local or remote manifest and exit.
    #[arg(long, value_enum)]
    info: Option<InfoArg>,

    /// Check whether an updated remote manifest exists, without installing.
    #[arg(long)]
    check: bool,

    /// Download and install the manifest even when it is up to date.
    #[arg(long)]
    force: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InfoArg {
    #[value(name = "local.version")]
    LocalVersion,
    #[value(name = "local.url")]
    LocalUrl,
    #[value(name = "remote.version")]
    RemoteVersion,
    #[value(name = "remote.url")]
    RemoteUrl,
}

impl From<InfoArg> for InfoField {
    fn from(arg: InfoArg) -> Self {
        match arg {
            InfoArg::LocalVersion => InfoField::LocalVersion,
            InfoArg::LocalUrl => InfoField::LocalUrl,
            InfoArg::RemoteVersion => InfoField::RemoteVersion,
            InfoArg::RemoteUrl => InfoField::RemoteUrl,
        }
    }
}

impl Cli {
    fn mode(&self) -> Mode {
        if let Some(info) = self.info {
            Mode::Info(info.into())
        } else if self.check {
            Mode::Check
        } else {
            Mode::Sync { force: self.force }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), SyncError> {
    let store = ManifestStore::open(&cli.manifest_dir)?;
    let engine = SyncEngine::new(store, ApiClient::new(), cli.key.clone());

    match engine.run(cli.mode()).await? {
        Outcome::InfoReported(Some(value)) => println!("{value}"),
        // Local data requested but absent: defined quiet success.
        Outcome::InfoReported(None) => {}
        Outcome::Checked {
            update_available: true,
            remote,
        } => {
            println!("Updated manifest found");
            println!("version  : {}", remote.version);
            println!("url      : {}", remote.url);
        }
        Outcome::Checked {
            update_available: false,
            ..
        } => {
            println!("No new manifest version found");
        }
        Outcome::Updated { info } => {
            info!("manifest updated to version {}", info.version);
        }
        Outcome::NoChange => {}
    }
    Ok(())
}
