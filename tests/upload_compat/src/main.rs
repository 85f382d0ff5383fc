//! Reference receiver for `vegh send`.
//!
//! Run it to try uploads by hand; `cargo test -p upload-compat` drives the
//! real uploader against it.

mod receiver;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::receiver::{Receiver, ReceiverOptions};

#[derive(Debug, Parser)]
#[command(name = "upload-compat", about = "Receive vegh uploads into a directory")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Where completed uploads are written.
    #[arg(long, default_value = "received")]
    out_dir: PathBuf,

    /// Bearer token required from clients.
    #[arg(long)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let receiver = Receiver::new(ReceiverOptions {
        token: args.token,
        out_dir: Some(args.out_dir.clone()),
        ..Default::default()
    });

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    tracing::info!(
        addr = %args.listen,
        out_dir = %args.out_dir.display(),
        "listening on /upload"
    );
    axum::serve(listener, receiver.router().into_make_service()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;
    use vegh_transfer::{
        TransferConfig, TransferError, TransferJob, TransferMode, TransferResult, Uploader,
    };

    const MIB: usize = 1024 * 1024;

    async fn serve(options: ReceiverOptions) -> (Receiver, String) {
        let receiver = Receiver::new(options);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = receiver.router();
        tokio::spawn(async move {
            axum::serve(listener, router.into_make_service())
                .await
                .unwrap();
        });
        (receiver, format!("http://{addr}/upload"))
    }

    fn fixture(dir: &Path, name: &str, len: usize) -> (PathBuf, Vec<u8>) {
        let data: Vec<u8> = (0..len).map(|i| (i * 31 % 251) as u8).collect();
        let path = dir.join(name);
        std::fs::write(&path, &data).unwrap();
        (path, data)
    }

    fn small_chunks() -> TransferConfig {
        TransferConfig {
            threshold: 64,
            chunk_size: 16,
            concurrency: 4,
        }
    }

    #[tokio::test]
    async fn out_of_order_chunks_reassemble() {
        let (receiver, url) = serve(ReceiverOptions {
            delays: HashMap::from([(0, Duration::from_millis(300))]),
            ..Default::default()
        })
        .await;

        let dir = TempDir::new().unwrap();
        let (path, data) = fixture(dir.path(), "proj.snap", 100);
        let job = TransferJob::from_path(&path, url, None, false).unwrap();
        let uploader = Uploader::new(small_chunks()).unwrap();

        let result = uploader.send(&job).await.unwrap();
        assert_eq!(result, TransferResult::Chunked { total_chunks: 7 });
        assert_eq!(receiver.completed("proj.snap").unwrap(), data);

        let order = receiver.accepted_order();
        assert_eq!(order.len(), 7);
        assert_eq!(*order.last().unwrap(), 0, "delayed chunk should land last");
    }

    #[tokio::test]
    async fn every_chunk_carries_protocol_headers() {
        let (receiver, url) = serve(ReceiverOptions {
            token: Some("s3cret".into()),
            ..Default::default()
        })
        .await;

        let dir = TempDir::new().unwrap();
        let (path, _) = fixture(dir.path(), "proj.snap", 64);
        let job = TransferJob::from_path(&path, url, Some("s3cret".into()), false).unwrap();
        Uploader::new(small_chunks()).unwrap().send(&job).await.unwrap();

        let mut requests = receiver.requests();
        requests.sort_by_key(|r| r.chunk_index);
        let indices: Vec<_> = requests.iter().map(|r| r.chunk_index).collect();
        assert_eq!(indices, vec![Some(0), Some(1), Some(2), Some(3)]);
        for r in &requests {
            assert_eq!(r.file_name, "proj.snap");
            assert_eq!(r.total_chunks, Some(4));
            assert_eq!(r.authorization.as_deref(), Some("Bearer s3cret"));
            assert_eq!(r.len, 16);
        }
    }

    #[tokio::test]
    async fn protocol_defaults_split_25_mib_into_three() {
        let (receiver, url) = serve(ReceiverOptions::default()).await;

        let dir = TempDir::new().unwrap();
        let (path, data) = fixture(dir.path(), "big.snap", 25 * MIB);
        let job = TransferJob::from_path(&path, url, None, true).unwrap();
        let result = Uploader::new(TransferConfig::default())
            .unwrap()
            .send(&job)
            .await
            .unwrap();

        assert_eq!(result, TransferResult::Chunked { total_chunks: 3 });
        let mut sizes: Vec<(u64, usize)> = receiver
            .requests()
            .iter()
            .map(|r| (r.chunk_index.unwrap(), r.len))
            .collect();
        sizes.sort();
        assert_eq!(sizes, vec![(0, 10 * MIB), (1, 10 * MIB), (2, 5 * MIB)]);
        assert_eq!(receiver.completed("big.snap").unwrap(), data);
    }

    #[tokio::test]
    async fn direct_upload_arrives_whole() {
        let (receiver, url) = serve(ReceiverOptions::default()).await;

        let dir = TempDir::new().unwrap();
        let (path, data) = fixture(dir.path(), "small.snap", 4096);
        let job = TransferJob::from_path(&path, url, None, false).unwrap();
        let uploader = Uploader::new(TransferConfig::default()).unwrap();
        assert_eq!(uploader.mode_for(&job), TransferMode::Direct);

        let result = uploader.send(&job).await.unwrap();
        assert_eq!(
            result,
            TransferResult::Direct {
                status: 200,
                body: "stored small.snap (4096 bytes)".into()
            }
        );
        assert_eq!(receiver.completed("small.snap").unwrap(), data);

        let requests = receiver.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].chunk_index, None);
        assert_eq!(requests[0].total_chunks, None);
    }

    #[tokio::test]
    async fn encoded_file_name_round_trips() {
        let (receiver, url) = serve(ReceiverOptions::default()).await;

        let dir = TempDir::new().unwrap();
        let (path, data) = fixture(dir.path(), "café 100%.snap", 10);
        let job = TransferJob::from_path(&path, url, None, false).unwrap();
        Uploader::new(TransferConfig::default())
            .unwrap()
            .send(&job)
            .await
            .unwrap();

        assert_eq!(receiver.completed("café 100%.snap").unwrap(), data);
    }

    #[tokio::test]
    async fn rejected_chunk_aborts_and_nothing_completes() {
        let (receiver, url) = serve(ReceiverOptions {
            fail_chunk: Some(2),
            ..Default::default()
        })
        .await;

        let dir = TempDir::new().unwrap();
        let (path, _) = fixture(dir.path(), "proj.snap", 80);
        let job = TransferJob::from_path(&path, url, None, false).unwrap();
        let uploader = Uploader::new(small_chunks()).unwrap();

        let err = uploader.send(&job).await.unwrap_err();
        match err {
            TransferError::TransferAborted {
                failed_index,
                reason,
            } => {
                assert_eq!(failed_index, 2);
                assert_eq!(reason, "Status 500");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(receiver.completed("proj.snap").is_none());
        assert!(uploader.progress().completed() < 5);
    }

    #[tokio::test]
    async fn wrong_token_is_refused() {
        let (receiver, url) = serve(ReceiverOptions {
            token: Some("right".into()),
            ..Default::default()
        })
        .await;

        let dir = TempDir::new().unwrap();
        let (path, _) = fixture(dir.path(), "a.snap", 10);
        let job = TransferJob::from_path(&path, url, Some("wrong".into()), false).unwrap();
        let err = Uploader::new(TransferConfig::default())
            .unwrap()
            .send(&job)
            .await
            .unwrap_err();

        assert!(
            matches!(&err, TransferError::TransferFailed { reason } if reason == "Status 401"),
            "unexpected error: {err}"
        );
        assert!(receiver.completed("a.snap").is_none());
    }

    #[tokio::test]
    async fn completed_upload_is_written_to_disk() {
        let out = TempDir::new().unwrap();
        let (_receiver, url) = serve(ReceiverOptions {
            out_dir: Some(out.path().to_path_buf()),
            ..Default::default()
        })
        .await;

        let dir = TempDir::new().unwrap();
        let (path, data) = fixture(dir.path(), "disk.snap", 100);
        let job = TransferJob::from_path(&path, url, None, true).unwrap();
        Uploader::new(small_chunks()).unwrap().send(&job).await.unwrap();

        assert_eq!(std::fs::read(out.path().join("disk.snap")).unwrap(), data);
    }

    #[tokio::test]
    async fn worker_pool_never_exceeds_concurrency() {
        let delays = (0..10).map(|i| (i, Duration::from_millis(200))).collect();
        let (receiver, url) = serve(ReceiverOptions {
            delays,
            ..Default::default()
        })
        .await;

        let dir = TempDir::new().unwrap();
        let (path, data) = fixture(dir.path(), "pool.snap", 160);
        let job = TransferJob::from_path(&path, url, None, false).unwrap();
        let config = small_chunks();
        let result = Uploader::new(config).unwrap().send(&job).await.unwrap();

        assert_eq!(result, TransferResult::Chunked { total_chunks: 10 });
        assert_eq!(receiver.completed("pool.snap").unwrap(), data);
        assert_eq!(receiver.max_in_flight(), config.concurrency);
    }

    #[tokio::test]
    async fn failure_stops_queued_chunks() {
        let (receiver, url) = serve(ReceiverOptions {
            fail_chunk: Some(0),
            ..Default::default()
        })
        .await;

        let dir = TempDir::new().unwrap();
        let (path, _) = fixture(dir.path(), "proj.snap", 80);
        let job = TransferJob::from_path(&path, url, None, false).unwrap();
        let uploader = Uploader::new(TransferConfig {
            concurrency: 1,
            ..small_chunks()
        })
        .unwrap();

        let err = uploader.send(&job).await.unwrap_err();
        assert!(
            matches!(&err, TransferError::TransferAborted { failed_index: 0, .. }),
            "unexpected error: {err}"
        );
        let requests = receiver.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].chunk_index, Some(0));
        assert_eq!(uploader.progress().completed(), 0);
    }
}
