//! Minimal receiving endpoint for the upload protocol.
//!
//! Direct uploads are stored as-is. Chunks are buffered per file name and
//! joined in index order once every index has arrived, whatever order they
//! came in.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::routing::post;
use percent_encoding::percent_decode_str;
use vegh_transfer::{HEADER_CHUNK_INDEX, HEADER_FILE_NAME, HEADER_TOTAL_CHUNKS};

/// Behaviour knobs for tests.
#[derive(Debug, Clone, Default)]
pub struct ReceiverOptions {
    /// Required bearer token; `None` accepts anything.
    pub token: Option<String>,
    /// Chunk index answered with 500.
    pub fail_chunk: Option<u64>,
    /// Per-index delay before a chunk is accepted.
    pub delays: HashMap<u64, Duration>,
    /// Completed files are also written here.
    pub out_dir: Option<PathBuf>,
}

/// One request as seen by the receiver.
#[derive(Debug, Clone)]
#[cfg_attr(not(test), allow(dead_code))]
pub struct RequestRecord {
    pub file_name: String,
    pub chunk_index: Option<u64>,
    pub total_chunks: Option<u64>,
    pub authorization: Option<String>,
    pub len: usize,
}

#[derive(Default)]
struct Inner {
    /// Chunks received so far, by file name and index.
    pending: HashMap<String, BTreeMap<u64, Vec<u8>>>,
    completed: HashMap<String, Vec<u8>>,
    requests: Vec<RequestRecord>,
    /// Chunk indices in the order they were accepted.
    accepted: Vec<u64>,
    in_flight: usize,
    max_in_flight: usize,
}

#[derive(Clone, Default)]
pub struct Receiver {
    options: Arc<ReceiverOptions>,
    inner: Arc<Mutex<Inner>>,
}

impl Receiver {
    pub fn new(options: ReceiverOptions) -> Self {
        Self {
            options: Arc::new(options),
            inner: Arc::default(),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/upload", post(upload))
            .layer(DefaultBodyLimit::disable())
            .with_state(self.clone())
    }

    /// Reassembled file contents, once complete.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn completed(&self, name: &str) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().completed.get(name).cloned()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn requests(&self) -> Vec<RequestRecord> {
        self.inner.lock().unwrap().requests.clone()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn accepted_order(&self) -> Vec<u64> {
        self.inner.lock().unwrap().accepted.clone()
    }

    /// Highest number of chunk requests handled at the same time.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn max_in_flight(&self) -> usize {
        self.inner.lock().unwrap().max_in_flight
    }

    fn enter(&self) -> InFlight<'_> {
        let mut inner = self.inner.lock().unwrap();
        inner.in_flight += 1;
        inner.max_in_flight = inner.max_in_flight.max(inner.in_flight);
        InFlight(&self.inner)
    }

    fn store(&self, name: String, data: Vec<u8>) -> std::io::Result<()> {
        if let Some(dir) = &self.options.out_dir {
            std::fs::create_dir_all(dir)?;
            std::fs::write(dir.join(&name), &data)?;
        }
        tracing::info!(file = %name, bytes = data.len(), "upload complete");
        self.inner.lock().unwrap().completed.insert(name, data);
        Ok(())
    }
}

/// Counts a chunk request as in flight until dropped.
struct InFlight<'a>(&'a Mutex<Inner>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.lock().unwrap().in_flight -= 1;
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn parse_u64(headers: &HeaderMap, name: &str) -> Result<Option<u64>, (StatusCode, String)> {
    match header(headers, name) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| (StatusCode::BAD_REQUEST, format!("bad {name}: {v}"))),
    }
}

async fn upload(
    State(rx): State<Receiver>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<String, (StatusCode, String)> {
    let raw_name = header(&headers, HEADER_FILE_NAME)
        .ok_or((StatusCode::BAD_REQUEST, "missing file name".to_string()))?;
    let file_name = percent_decode_str(raw_name)
        .decode_utf8()
        .map_err(|_| (StatusCode::BAD_REQUEST, "file name is not UTF-8".to_string()))?
        .into_owned();
    if file_name.contains('/') || file_name.contains('\\') || file_name == ".." {
        return Err((StatusCode::BAD_REQUEST, "unsafe file name".into()));
    }

    let index = parse_u64(&headers, HEADER_CHUNK_INDEX)?;
    let total = parse_u64(&headers, HEADER_TOTAL_CHUNKS)?;
    let authorization = header(&headers, AUTHORIZATION.as_str()).map(str::to_string);

    rx.inner.lock().unwrap().requests.push(RequestRecord {
        file_name: file_name.clone(),
        chunk_index: index,
        total_chunks: total,
        authorization: authorization.clone(),
        len: body.len(),
    });

    if let Some(token) = &rx.options.token {
        let expected = format!("Bearer {token}");
        if authorization.as_deref() != Some(expected.as_str()) {
            return Err((StatusCode::UNAUTHORIZED, "bad token".into()));
        }
    }

    let (index, total) = match (index, total) {
        (None, None) => {
            let len = body.len();
            rx.store(file_name.clone(), body.to_vec())
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
            return Ok(format!("stored {file_name} ({len} bytes)"));
        }
        (Some(i), Some(t)) if i < t => (i, t),
        _ => return Err((StatusCode::BAD_REQUEST, "bad chunk headers".into())),
    };

    let _in_flight = rx.enter();
    if let Some(delay) = rx.options.delays.get(&index) {
        tokio::time::sleep(*delay).await;
    }
    if rx.options.fail_chunk == Some(index) {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "injected failure".into()));
    }

    let assembled = {
        let mut inner = rx.inner.lock().unwrap();
        inner.accepted.push(index);
        let pending = inner.pending.entry(file_name.clone()).or_default();
        pending.insert(index, body.to_vec());
        if pending.len() as u64 == total {
            let chunks = inner.pending.remove(&file_name).unwrap_or_default();
            Some(chunks.into_values().flatten().collect::<Vec<u8>>())
        } else {
            None
        }
    };

    if let Some(data) = assembled {
        rx.store(file_name, data)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    }
    Ok(format!("chunk {index}/{total} received"))
}
