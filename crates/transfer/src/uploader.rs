//! Entry point for sending a snapshot: plan, then route.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info_span};

use crate::chunked::upload_chunked;
use crate::direct::send_direct;
use crate::headers::job_headers;
use crate::plan::plan;
use crate::progress::ProgressHandle;
use crate::types::{TransferConfig, TransferJob, TransferMode, TransferResult};
use crate::TransferError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends transfer jobs to their endpoint.
///
/// One uploader drives one job at a time; [`progress`](Self::progress)
/// reflects the most recent job.
pub struct Uploader {
    http: reqwest::Client,
    config: TransferConfig,
    progress: ProgressHandle,
    cancel: CancellationToken,
}

impl Uploader {
    /// Creates an uploader with its own HTTP client.
    pub fn new(config: TransferConfig) -> Result<Self, TransferError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("vegh/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Self::with_client(http, config)
    }

    /// Creates an uploader on top of an existing client.
    pub fn with_client(http: reqwest::Client, config: TransferConfig) -> Result<Self, TransferError> {
        config.validate()?;
        Ok(Self {
            http,
            config,
            progress: ProgressHandle::new(),
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Read-only progress view for reporters.
    pub fn progress(&self) -> ProgressHandle {
        self.progress.clone()
    }

    /// Cancelling this token stops the running job and its workers.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Strategy this uploader would use for `job`.
    pub fn mode_for(&self, job: &TransferJob) -> TransferMode {
        plan(job.file_size, job.force_chunk, self.config.threshold)
    }

    /// Runs `job` to completion.
    ///
    /// The mode is fixed before any bytes move. Header problems surface before
    /// any request is made.
    pub async fn send(&self, job: &TransferJob) -> Result<TransferResult, TransferError> {
        let mode = self.mode_for(job);
        let span = info_span!("send", job = %job.id, %mode, file = %job.file_path.display());

        async move {
            let headers = job_headers(job)?;
            match mode {
                TransferMode::Direct => self.run_direct(job, headers).await,
                TransferMode::Chunked => {
                    let total = upload_chunked(
                        &self.http,
                        job,
                        headers,
                        &self.config,
                        &self.progress,
                        &self.cancel,
                    )
                    .await?;
                    Ok(TransferResult::Chunked {
                        total_chunks: total,
                    })
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_direct(
        &self,
        job: &TransferJob,
        headers: reqwest::header::HeaderMap,
    ) -> Result<TransferResult, TransferError> {
        self.progress.begin_direct();
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TransferError::Cancelled),
            r = send_direct(&self.http, job, headers) => r,
        };
        match &result {
            Ok(_) => {
                self.progress.record_chunk(job.file_size);
                self.progress.finish(true);
            }
            Err(_) => self.progress.finish(false),
        }
        result
    }
}
