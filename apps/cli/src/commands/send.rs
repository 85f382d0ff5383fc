use anyhow::{Context, Result};
use vegh_transfer::{
    ProgressReporter, ProgressUpdate, TransferJob, TransferMode, TransferResult, Uploader,
};

use super::App;
use crate::cli::SendArgs;
use crate::output;

pub(super) async fn send(app: &App, args: SendArgs) -> Result<()> {
    let prefs = app.store.load()?.resolve(args.url, args.auth);
    let url = prefs
        .url
        .context("no target URL: pass one or run `vegh config set url <URL>`")?;

    let job = TransferJob::from_path(&args.file, url, prefs.auth, args.force_chunk)?;
    let uploader = Uploader::new(app.transfer)?;
    let mode = uploader.mode_for(&job);

    println!("Target: {}", job.target_url);
    println!(
        "File:   {} ({})",
        job.file_name(),
        output::human_bytes(job.file_size)
    );
    if job.auth_token.is_some() {
        println!("Auth:   enabled");
    }
    println!("Mode:   {mode}");

    let cancel = uploader.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let reporter = (mode == TransferMode::Chunked).then(|| {
        ProgressReporter::start(
            uploader.progress(),
            None,
            Box::new(|update: ProgressUpdate| eprint!("\r{}", output::progress_line(&update))),
        )
    });

    let result = uploader.send(&job).await;
    interrupt.abort();
    if let Some(reporter) = reporter {
        reporter.stop();
        eprintln!();
    }

    match result? {
        TransferResult::Direct { status, body } => {
            println!("Transfer complete (status {status})");
            if !body.is_empty() {
                println!("Server response:\n{body}");
            }
        }
        TransferResult::Chunked { total_chunks } => {
            println!("Transfer complete ({total_chunks} chunks)");
        }
    }
    Ok(())
}
