use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::header::HeaderMap;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::headers::chunk_headers;
use crate::progress::ProgressHandle;
use crate::types::{ChunkTask, TransferJob};
use crate::{TransferConfig, TransferError};

// ---------------------------------------------------------------------------
// Chunk layout
// ---------------------------------------------------------------------------

/// Splits `file_size` bytes into `chunk_size` ranges.
///
/// Ranges are contiguous, non-overlapping and cover `[0, file_size)`; only
/// the last one may be short. An empty file yields no chunks.
///
/// # Panics
///
/// If `chunk_size` is zero. [`TransferConfig::validate`] rules that out.
pub fn chunk_tasks(file_size: u64, chunk_size: u64) -> Vec<ChunkTask> {
    assert!(chunk_size > 0, "chunk size must be positive");
    let total_chunks = file_size.div_ceil(chunk_size);
    (0..total_chunks)
        .map(|index| {
            let offset = index * chunk_size;
            ChunkTask {
                index,
                offset,
                length: chunk_size.min(file_size - offset),
                total_chunks,
            }
        })
        .collect()
}

/// Reads exactly the bytes of `task` from `path` with a private handle.
pub fn read_chunk(path: &Path, task: &ChunkTask) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(task.offset))?;
    let mut buf = vec![0u8; task.length as usize];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Everything a worker needs, shared read-only across the pool.
struct ChunkContext {
    http: reqwest::Client,
    url: String,
    path: PathBuf,
    headers: HeaderMap,
}

/// Uploads the job's file as chunks on a bounded worker pool.
///
/// Completions are observed in arrival order and counted on `progress`. The
/// first failing chunk aborts the job: pending workers are cancelled and
/// in-flight requests dropped. A chunk whose request already reached the
/// receiver may still land there; chunk uploads are idempotent per index.
pub(crate) async fn upload_chunked(
    http: &reqwest::Client,
    job: &TransferJob,
    headers: HeaderMap,
    config: &TransferConfig,
    progress: &ProgressHandle,
    cancel: &CancellationToken,
) -> Result<u64, TransferError> {
    let tasks = chunk_tasks(job.file_size, config.chunk_size);
    let total = tasks.len() as u64;
    progress.begin_chunked(total);

    info!(
        file = %job.file_path.display(),
        bytes = job.file_size,
        chunks = total,
        workers = config.concurrency,
        "starting chunked upload"
    );

    let ctx = Arc::new(ChunkContext {
        http: http.clone(),
        url: job.target_url.clone(),
        path: job.file_path.clone(),
        headers,
    });
    let pool = Arc::new(Semaphore::new(config.concurrency));
    let abort = cancel.child_token();
    let mut set = JoinSet::new();

    for task in tasks {
        let ctx = Arc::clone(&ctx);
        let pool = Arc::clone(&pool);
        let abort = abort.clone();
        set.spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = abort.cancelled() => return Err(TransferError::Cancelled),
                permit = pool.acquire_owned() => permit,
            };
            let Ok(_permit) = permit else {
                return Err(chunk_failed(&task, "worker pool closed"));
            };
            tokio::select! {
                biased;
                _ = abort.cancelled() => Err(TransferError::Cancelled),
                r = upload_one(&ctx, &task) => match r {
                    Ok(()) => Ok(task),
                    Err(reason) => {
                        // Cancel while the permit is still held so no queued
                        // worker starts a request after a failure.
                        abort.cancel();
                        Err(chunk_failed(&task, reason))
                    }
                },
            }
        });
    }

    loop {
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                abort.cancel();
                set.abort_all();
                progress.finish(false);
                return Err(TransferError::Cancelled);
            }
            joined = set.join_next() => joined,
        };
        let Some(joined) = joined else {
            break;
        };

        match joined {
            Ok(Ok(task)) => {
                let done = progress.record_chunk(task.length);
                debug!(index = task.index, completed = done, total, "chunk uploaded");
            }
            // A sibling stopped by the abort token; the failure that fired
            // it is still to be joined.
            Ok(Err(TransferError::Cancelled)) => continue,
            Ok(Err(TransferError::ChunkFailed { index, reason })) => {
                warn!(index, %reason, "chunk failed, aborting upload");
                abort.cancel();
                set.abort_all();
                progress.finish(false);
                return Err(TransferError::TransferAborted {
                    failed_index: index,
                    reason,
                });
            }
            Ok(Err(e)) => {
                abort.cancel();
                set.abort_all();
                progress.finish(false);
                return Err(e);
            }
            Err(e) => {
                abort.cancel();
                set.abort_all();
                progress.finish(false);
                return Err(TransferError::TransferFailed {
                    reason: format!("upload worker crashed: {e}"),
                });
            }
        }
    }

    progress.finish(true);
    info!(chunks = total, "chunked upload complete");
    Ok(total)
}

fn chunk_failed(task: &ChunkTask, reason: impl Into<String>) -> TransferError {
    TransferError::ChunkFailed {
        index: task.index,
        reason: reason.into(),
    }
}

/// Reads one chunk and posts it. Errors come back as display reasons.
async fn upload_one(ctx: &ChunkContext, task: &ChunkTask) -> Result<(), String> {
    let data = tokio::task::spawn_blocking({
        let path = ctx.path.clone();
        let task = *task;
        move || read_chunk(&path, &task)
    })
    .await
    .map_err(|e| format!("read task failed: {e}"))?
    .map_err(|e| format!("read failed: {e}"))?;

    let resp = ctx
        .http
        .post(&ctx.url)
        .headers(chunk_headers(&ctx.headers, task))
        .body(data)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(format!("Status {}", status.as_u16()))
    }
}
