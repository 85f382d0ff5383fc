use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use vegh_snapshot::{CreateOptions, EntryKind, ProjectStats, classify_entry};

use super::App;
use crate::cli::{DryRunArgs, SnapArgs};
use crate::output;

pub(super) async fn snap(app: &App, args: SnapArgs) -> Result<()> {
    let output_path = args.output.unwrap_or_else(|| default_output(&args.path));
    let author = match args.author {
        Some(a) => Some(a),
        None => app.store.load()?.author.or_else(host_name),
    };
    let options = CreateOptions {
        level: args.level,
        comment: args.comment,
        author,
        include: args.filter.include,
        exclude: args.filter.exclude,
    };

    println!(
        "Packing {} -> {}",
        args.path.display(),
        output_path.display()
    );
    let start = Instant::now();
    let source = args.path.clone();
    let out = output_path.clone();
    let count = app
        .with_engine(move |engine| engine.create_archive(&source, &out, &options))
        .await?;

    let size = std::fs::metadata(&output_path).map(|m| m.len()).unwrap_or(0);
    println!(
        "Done! Packed {count} files ({}) in {:.2}s",
        output::human_bytes(size),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

pub(super) async fn dry_run(app: &App, args: DryRunArgs) -> Result<()> {
    let source = args.path.clone();
    let (include, exclude) = (args.filter.include, args.filter.exclude);
    let entries = app
        .with_engine(move |engine| engine.dry_run(&source, &include, &exclude))
        .await?;

    let total: u64 = entries.iter().map(|e| e.size).sum();
    for entry in &entries {
        println!("{:>10}  {}", output::human_bytes(entry.size), entry.path);
    }
    println!(
        "{} files, {} (uncompressed) would be packed from {}",
        entries.len(),
        output::human_bytes(total),
        args.path.display()
    );
    Ok(())
}

pub(super) async fn restore(app: &App, file: PathBuf, out_dir: PathBuf) -> Result<()> {
    println!("Restoring {} -> {}", file.display(), out_dir.display());
    let dest = out_dir.clone();
    app.with_engine(move |engine| engine.restore_archive(&file, &dest))
        .await?;
    println!("Restored into {}", out_dir.display());
    Ok(())
}

pub(super) async fn list(app: &App, file: PathBuf) -> Result<()> {
    let entries = app
        .with_engine(move |engine| engine.list_entries(&file))
        .await?;
    for entry in &entries {
        match classify_entry(entry) {
            EntryKind::Metadata => println!("{entry} (meta)"),
            EntryKind::Content => println!("{entry}"),
        }
    }
    Ok(())
}

pub(super) async fn check(app: &App, file: PathBuf) -> Result<()> {
    let name = display_name(&file);
    let report = app
        .with_engine(move |engine| vegh_snapshot::check(engine, &file))
        .await?;
    print!("{}", output::check_report(&name, &report));
    Ok(())
}

pub(super) async fn loc(app: &App, file: PathBuf) -> Result<()> {
    let counts = app
        .with_engine(move |engine| engine.count_lines_of_code(&file))
        .await?;
    let stats = ProjectStats::from_counts(&counts);
    if stats.total_files == 0 {
        println!("No text files found.");
        return Ok(());
    }
    print!(
        "{}",
        output::loc_table(&stats.summary(), stats.total_files, stats.total_lines)
    );
    Ok(())
}

/// `<dir name>.snap` in the current directory; `backup.snap` when the
/// source has no usable name.
fn default_output(source: &Path) -> PathBuf {
    let name = std::fs::canonicalize(source)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "backup".into());
    PathBuf::from(format!("{name}.snap"))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn host_name() -> Option<String> {
    hostname::get().ok().and_then(|h| h.into_string().ok())
}
