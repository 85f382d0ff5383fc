//! Command handlers.

mod archive;
mod config;
mod send;

use std::sync::Arc;

use anyhow::{Context, Result};
use vegh_settings::PreferenceStore;
use vegh_snapshot::{ArchiveEngine, TarZstdEngine};
use vegh_transfer::TransferConfig;

use crate::cli::Command;

/// Everything a command needs from its environment.
pub(crate) struct App {
    pub(crate) store: PreferenceStore,
    pub(crate) engine: Arc<dyn ArchiveEngine>,
    pub(crate) transfer: TransferConfig,
}

impl App {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            store: PreferenceStore::open_default()?,
            engine: Arc::new(TarZstdEngine::new()),
            transfer: TransferConfig::default(),
        })
    }

    pub(crate) async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Snap(args) => archive::snap(self, args).await,
            Command::DryRun(args) => archive::dry_run(self, args).await,
            Command::Restore { file, out_dir } => archive::restore(self, file, out_dir).await,
            Command::List { file } => archive::list(self, file).await,
            Command::Check { file } => archive::check(self, file).await,
            Command::Loc { file } => archive::loc(self, file).await,
            Command::Send(args) => send::send(self, args).await,
            Command::Config(cmd) => config::config(self, cmd),
        }
    }

    /// Runs a blocking engine call off the async runtime.
    pub(crate) async fn with_engine<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ArchiveEngine) -> vegh_snapshot::Result<T> + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        let out = tokio::task::spawn_blocking(move || f(engine.as_ref()))
            .await
            .context("archive task failed")??;
        Ok(out)
    }
}
