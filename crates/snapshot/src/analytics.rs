//! Per-language line counts for a snapshot.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

// Matched before extensions.
const FILENAMES: &[(&str, &str)] = &[
    ("dockerfile", "Dockerfile"),
    ("makefile", "Makefile"),
    ("cargo.toml", "Cargo"),
    ("pyproject.toml", "Python Config"),
    ("package.json", "NPM Config"),
];

const EXTENSIONS: &[(&str, &str)] = &[
    ("rs", "Rust"),
    ("py", "Python"),
    ("pyi", "Python"),
    ("js", "JavaScript"),
    ("jsx", "JavaScript"),
    ("mjs", "JavaScript"),
    ("ts", "TypeScript"),
    ("tsx", "TypeScript"),
    ("html", "HTML"),
    ("css", "CSS"),
    ("scss", "SCSS"),
    ("c", "C"),
    ("h", "C/C++"),
    ("cpp", "C++"),
    ("hpp", "C++"),
    ("cc", "C++"),
    ("go", "Go"),
    ("java", "Java"),
    ("rb", "Ruby"),
    ("php", "PHP"),
    ("sh", "Shell"),
    ("bash", "Shell"),
    ("zsh", "Shell"),
    ("json", "JSON"),
    ("toml", "TOML"),
    ("yaml", "YAML"),
    ("yml", "YAML"),
    ("md", "Markdown"),
    ("txt", "Text"),
    ("sql", "SQL"),
    ("dockerfile", "Dockerfile"),
];

/// Language bucket for `path`, `"Other"` when unrecognised.
pub fn language_of(path: &str) -> &'static str {
    let p = Path::new(path);
    let name = p
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if let Some((_, lang)) = FILENAMES.iter().find(|(f, _)| *f == name) {
        return *lang;
    }
    let ext = p
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
        .unwrap_or("Other")
}

/// One row of the language breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageSummary {
    pub language: &'static str,
    pub files: u64,
    pub lines: u64,
    /// Share of all counted lines, 0 to 100.
    pub percent: f64,
}

/// Aggregated line counts.
#[derive(Debug, Clone, Default)]
pub struct ProjectStats {
    pub total_files: u64,
    pub total_lines: u64,
    by_language: HashMap<&'static str, (u64, u64)>,
}

impl ProjectStats {
    /// Builds stats from engine line counts. Zero-line entries are skipped.
    pub fn from_counts(counts: &BTreeMap<String, u64>) -> Self {
        let mut stats = Self::default();
        for (path, &lines) in counts {
            if lines > 0 {
                stats.add_file(path, lines);
            }
        }
        stats
    }

    pub fn add_file(&mut self, path: &str, lines: u64) {
        self.total_files += 1;
        self.total_lines += lines;
        let slot = self.by_language.entry(language_of(path)).or_default();
        slot.0 += 1;
        slot.1 += lines;
    }

    /// Languages ordered by line count, largest first; ties by name.
    pub fn summary(&self) -> Vec<LanguageSummary> {
        let mut rows: Vec<_> = self
            .by_language
            .iter()
            .map(|(&language, &(files, lines))| LanguageSummary {
                language,
                files,
                lines,
                percent: if self.total_lines == 0 {
                    0.0
                } else {
                    lines as f64 * 100.0 / self.total_lines as f64
                },
            })
            .collect();
        rows.sort_by(|a, b| b.lines.cmp(&a.lines).then(a.language.cmp(b.language)));
        rows
    }
}
