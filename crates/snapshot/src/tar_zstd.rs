//! Reference engine: a tar stream compressed with zstd.
//!
//! Layout: the metadata sidecar first, then the preserved ignore files, then
//! every accepted file sorted by path. The archive is written to a temporary
//! sibling and only moved to the output path once complete.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::engine::{ArchiveEngine, CreateOptions, PlannedEntry};
use crate::filter::{PRESERVED_FILES, PathFilter};
use crate::metadata::SnapshotMetadata;
use crate::{LEVEL_RANGE, METADATA_ENTRY, Result, SnapshotError};

/// tar + zstd archive engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarZstdEngine;

impl TarZstdEngine {
    pub fn new() -> Self {
        Self
    }

    /// Collects `(absolute, relative)` pairs to pack, preserved files first.
    fn collect(
        &self,
        source_dir: &Path,
        include: &[String],
        exclude: &[String],
        skip: Option<&Path>,
    ) -> Result<Vec<(PathBuf, String)>> {
        if !source_dir.exists() {
            return Err(SnapshotError::NotFound(source_dir.to_path_buf()));
        }
        if !source_dir.is_dir() {
            return Err(SnapshotError::Engine(format!(
                "source is not a directory: {}",
                source_dir.display()
            )));
        }

        let filter = PathFilter::new(source_dir, include, exclude)?;
        let mut files = Vec::new();

        for name in PRESERVED_FILES {
            let path = source_dir.join(name);
            if path.is_file() {
                files.push((path, name.to_string()));
            }
        }

        for (rel, path) in filter.walk() {
            let name = to_archive_name(&rel);
            if PRESERVED_FILES.contains(&name.as_str()) || name == METADATA_ENTRY {
                continue;
            }
            if let Some(skip) = skip {
                if std::fs::canonicalize(&path).is_ok_and(|abs| abs == skip) {
                    debug!(path = %name, "skipping output archive");
                    continue;
                }
            }
            files.push((path, name));
        }

        Ok(files)
    }
}

impl ArchiveEngine for TarZstdEngine {
    fn create_archive(
        &self,
        source_dir: &Path,
        output: &Path,
        options: &CreateOptions,
    ) -> Result<usize> {
        if !LEVEL_RANGE.contains(&options.level) {
            return Err(SnapshotError::Engine(format!(
                "compression level {} outside {}..={}",
                options.level,
                LEVEL_RANGE.start(),
                LEVEL_RANGE.end()
            )));
        }

        let output_abs = absolute_output(output);
        let files = self.collect(
            source_dir,
            &options.include,
            &options.exclude,
            Some(&output_abs),
        )?;
        let meta = SnapshotMetadata::now(options.author.clone(), options.comment.clone());
        write_snapshot(output, &meta, &files, options.level)?;

        info!(
            source = %source_dir.display(),
            output = %output.display(),
            files = files.len(),
            level = options.level,
            "snapshot created"
        );
        Ok(files.len())
    }

    fn dry_run(
        &self,
        source_dir: &Path,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<PlannedEntry>> {
        self.collect(source_dir, include, exclude, None)?
            .into_iter()
            .map(|(path, name)| {
                let size = std::fs::metadata(&path)?.len();
                Ok(PlannedEntry { path: name, size })
            })
            .collect()
    }

    fn restore_archive(&self, archive: &Path, dest_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dest_dir)
            .map_err(|e| SnapshotError::engine("create destination", e))?;
        let mut tar = open_archive(archive)?;
        let mut restored = 0usize;

        for entry in tar.entries().map_err(|e| SnapshotError::engine("read entries", e))? {
            let mut entry = entry.map_err(|e| SnapshotError::engine("read entry", e))?;
            let name = entry_name(&entry)?;
            if name == METADATA_ENTRY {
                continue;
            }
            let unpacked = entry
                .unpack_in(dest_dir)
                .map_err(|e| SnapshotError::engine(&format!("unpack {name}"), e))?;
            if !unpacked {
                return Err(SnapshotError::Engine(format!(
                    "entry escapes destination: {name}"
                )));
            }
            restored += 1;
        }

        info!(
            archive = %archive.display(),
            dest = %dest_dir.display(),
            entries = restored,
            "snapshot restored"
        );
        Ok(())
    }

    fn list_entries(&self, archive: &Path) -> Result<Vec<String>> {
        let mut tar = open_archive(archive)?;
        let mut names = Vec::new();
        for entry in tar.entries().map_err(|e| SnapshotError::engine("read entries", e))? {
            let entry = entry.map_err(|e| SnapshotError::engine("read entry", e))?;
            names.push(entry_name(&entry)?);
        }
        Ok(names)
    }

    fn count_lines_of_code(&self, archive: &Path) -> Result<BTreeMap<String, u64>> {
        let mut tar = open_archive(archive)?;
        let mut counts = BTreeMap::new();
        for entry in tar.entries().map_err(|e| SnapshotError::engine("read entries", e))? {
            let entry = entry.map_err(|e| SnapshotError::engine("read entry", e))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = entry_name(&entry)?;
            if name == METADATA_ENTRY {
                continue;
            }
            let lines = count_lines(entry)
                .map_err(|e| SnapshotError::engine(&format!("read {name}"), e))?;
            counts.insert(name, lines);
        }
        Ok(counts)
    }

    fn read_metadata(&self, archive: &Path) -> Result<Vec<u8>> {
        let mut tar = open_archive(archive)?;
        for entry in tar.entries().map_err(|e| SnapshotError::engine("read entries", e))? {
            let mut entry = entry.map_err(|e| SnapshotError::engine("read entry", e))?;
            if entry_name(&entry)? != METADATA_ENTRY {
                continue;
            }
            let mut raw = Vec::new();
            entry
                .read_to_end(&mut raw)
                .map_err(|e| SnapshotError::engine("read metadata", e))?;
            return Ok(raw);
        }
        Err(SnapshotError::MetadataMissing)
    }
}

/// Packs `files` behind the metadata sidecar into a temp file next to
/// `output`, then renames it into place. On error the temp file is removed
/// and `output` is untouched.
fn write_snapshot(
    output: &Path,
    meta: &SnapshotMetadata,
    files: &[(PathBuf, String)],
    level: i32,
) -> Result<()> {
    let meta_json = meta.to_json()?;
    let tmp = tempfile::Builder::new()
        .prefix(".vegh-")
        .suffix(".partial")
        .tempfile_in(output_dir(output))
        .map_err(|e| SnapshotError::engine("create output", e))?;

    let encoder = zstd::stream::write::Encoder::new(tmp, level)
        .map_err(|e| SnapshotError::engine("init encoder", e))?;
    let mut tar = tar::Builder::new(encoder);

    let mut header = tar::Header::new_gnu();
    header.set_size(meta_json.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(meta.timestamp.unwrap_or_default().max(0) as u64);
    header.set_cksum();
    tar.append_data(&mut header, METADATA_ENTRY, meta_json.as_bytes())
        .map_err(|e| SnapshotError::engine("write metadata", e))?;

    for (path, name) in files {
        tar.append_path_with_name(path, name)
            .map_err(|e| SnapshotError::engine(&format!("append {name}"), e))?;
    }

    let encoder = tar
        .into_inner()
        .map_err(|e| SnapshotError::engine("finish tar", e))?;
    let tmp = encoder
        .finish()
        .map_err(|e| SnapshotError::engine("finish zstd", e))?;

    // Temp files are created owner-only; archives get the usual mode.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(|e| SnapshotError::engine("set permissions", e))?;
    }

    tmp.persist(output)
        .map_err(|e| SnapshotError::engine("persist output", e.error))?;
    Ok(())
}

fn output_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Where `output` will live once created, with its directory resolved.
fn absolute_output(output: &Path) -> PathBuf {
    match (std::fs::canonicalize(output_dir(output)), output.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => output.to_path_buf(),
    }
}

type ZstdTar = tar::Archive<zstd::stream::read::Decoder<'static, BufReader<File>>>;

fn open_archive(path: &Path) -> Result<ZstdTar> {
    let file = File::open(path).map_err(|e| SnapshotError::open(path, e))?;
    let decoder =
        zstd::stream::read::Decoder::new(file).map_err(|e| SnapshotError::engine("init decoder", e))?;
    Ok(tar::Archive::new(decoder))
}

fn entry_name<R: Read>(entry: &tar::Entry<'_, R>) -> Result<String> {
    let path = entry
        .path()
        .map_err(|e| SnapshotError::engine("entry path", e))?;
    Ok(to_archive_name(&path))
}

fn to_archive_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Counts lines in a text stream; any NUL byte marks it binary (zero).
fn count_lines<R: Read>(mut reader: R) -> std::io::Result<u64> {
    let mut buf = [0u8; 8192];
    let mut lines = 0u64;
    let mut last = None;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        let chunk = &buf[..n];
        if chunk.contains(&0) {
            return Ok(0);
        }
        lines += chunk.iter().filter(|&&b| b == b'\n').count() as u64;
        last = Some(chunk[n - 1]);
    }
    match last {
        Some(b) if b != b'\n' => Ok(lines + 1),
        _ => Ok(lines),
    }
}
