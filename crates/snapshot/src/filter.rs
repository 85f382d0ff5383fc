//! Which files the packing walk picks up.
//!
//! `.veghignore` and `.gitignore` files apply at every depth with gitignore
//! rules, hidden entries are skipped and exclude globs drop matches. Include
//! globs force files back in past all of those.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use ignore::overrides::{Override, OverrideBuilder};
use tracing::warn;

use crate::SnapshotError;

/// Root-level files always packed, ahead of everything else.
pub(crate) const PRESERVED_FILES: &[&str] = &[".veghignore", ".gitignore"];

const VEGH_IGNORE: &str = ".veghignore";

pub(crate) struct PathFilter {
    root: PathBuf,
    include: Override,
    exclude: Override,
}

impl PathFilter {
    pub(crate) fn new(
        root: &Path,
        include: &[String],
        exclude: &[String],
    ) -> Result<Self, SnapshotError> {
        Ok(Self {
            root: root.to_path_buf(),
            include: build_override(root, include, "")?,
            exclude: build_override(root, exclude, "!")?,
        })
    }

    /// Accepted files, keyed by path relative to the root.
    pub(crate) fn walk(&self) -> BTreeMap<PathBuf, PathBuf> {
        let mut files = BTreeMap::new();

        let mut walker = WalkBuilder::new(&self.root);
        walker
            .add_custom_ignore_filename(VEGH_IGNORE)
            .hidden(true)
            .git_ignore(true)
            .require_git(false)
            .git_global(false)
            .parents(false)
            .overrides(self.exclude.clone());
        self.gather(&walker, &mut files, |_| true);

        if !self.include.is_empty() {
            let mut walker = WalkBuilder::new(&self.root);
            walker.standard_filters(false);
            self.gather(&walker, &mut files, |rel| self.forced(rel));
        }
        files
    }

    fn gather(
        &self,
        walker: &WalkBuilder,
        files: &mut BTreeMap<PathBuf, PathBuf>,
        keep: impl Fn(&Path) -> bool,
    ) {
        for entry in walker.build() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            if keep(rel) {
                files.insert(rel.to_path_buf(), entry.path().to_path_buf());
            }
        }
    }

    // An include naming a directory covers everything below it.
    fn forced(&self, rel: &Path) -> bool {
        self.include.matched(rel, false).is_whitelist()
            || rel
                .ancestors()
                .skip(1)
                .filter(|p| !p.as_os_str().is_empty())
                .any(|p| self.include.matched(p, true).is_whitelist())
    }
}

fn build_override(root: &Path, patterns: &[String], prefix: &str) -> Result<Override, SnapshotError> {
    let mut builder = OverrideBuilder::new(root);
    for raw in patterns {
        let pattern = raw.trim();
        if pattern.is_empty() {
            continue;
        }
        builder
            .add(&format!("{prefix}{pattern}"))
            .map_err(|e| SnapshotError::Engine(format!("invalid pattern {raw:?}: {e}")))?;
    }
    builder
        .build()
        .map_err(|e| SnapshotError::Engine(format!("pattern set: {e}")))
}
