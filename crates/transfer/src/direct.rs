//! Single-request upload for small files.

use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderValue};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::types::{TransferJob, TransferResult};
use crate::TransferError;

/// Streams the whole file as one request body.
///
/// Any status in `[200, 300)` is success; everything else, including
/// transport errors, is `TransferFailed`. Nothing is retried.
pub(crate) async fn send_direct(
    http: &reqwest::Client,
    job: &TransferJob,
    mut headers: HeaderMap,
) -> Result<TransferResult, TransferError> {
    let file = tokio::fs::File::open(&job.file_path).await?;
    headers.insert(CONTENT_LENGTH, HeaderValue::from(job.file_size));

    debug!(url = %job.target_url, bytes = job.file_size, "starting direct upload");

    let resp = http
        .post(&job.target_url)
        .headers(headers)
        .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
        .send()
        .await
        .map_err(|e| {
            warn!(error = %e, "direct upload failed");
            TransferError::TransferFailed {
                reason: e.to_string(),
            }
        })?;

    let status = resp.status();
    if !status.is_success() {
        warn!(status = status.as_u16(), "direct upload rejected");
        return Err(TransferError::TransferFailed {
            reason: format!("Status {}", status.as_u16()),
        });
    }

    let body = match resp.text().await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "upload accepted but response body was unreadable");
            String::new()
        }
    };
    info!(status = status.as_u16(), bytes = job.file_size, "direct upload complete");
    Ok(TransferResult::Direct {
        status: status.as_u16(),
        body,
    })
}
