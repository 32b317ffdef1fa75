//! Sketch source collection for the CLI.
//!
//! Walks a sketch directory and turns every non-excluded file into a
//! request file. Default exclusions cover VCS metadata and local build
//! output; a `.sketchlaneignore` file adds more patterns.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use sketchlane_protocol::ops::NamedFile;
use walkdir::WalkDir;

/// Name of the per-sketch ignore file.
pub const IGNORE_FILE: &str = ".sketchlaneignore";

/// Default patterns to exclude from requests
const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".git/**",
    ".svn",
    ".svn/**",
    ".vscode",
    ".vscode/**",
    ".DS_Store",
    "**/.DS_Store",
    "build",
    "build/**",
    "*.md",
    IGNORE_FILE,
];

/// Errors for source collection
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Glob pattern error: {0}")]
    Glob(#[from] globset::Error),

    #[error("{0} is not valid UTF-8 text")]
    NotText(PathBuf),

    #[error("no sources found in {0}")]
    Empty(PathBuf),
}

/// Exclusion rules for filtering files
#[derive(Debug)]
pub struct ExcludeRules {
    glob_set: GlobSet,
}

impl ExcludeRules {
    /// Create new exclusion rules with defaults
    pub fn new() -> Result<Self, SourceError> {
        Self::with_patterns(&[])
    }

    /// Defaults plus additional patterns
    pub fn with_patterns(patterns: &[&str]) -> Result<Self, SourceError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in DEFAULT_EXCLUDES.iter().chain(patterns) {
            if !pattern.is_empty() {
                builder.add(Glob::new(pattern)?);
            }
        }
        Ok(Self {
            glob_set: builder.build()?,
        })
    }

    /// Defaults plus the patterns of an ignore file
    pub fn from_ignore_file(path: &Path) -> Result<Self, SourceError> {
        let contents = fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let patterns: Vec<&str> = contents
            .lines()
            .map(|l| l.trim().trim_end_matches('/'))
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        Self::with_patterns(&patterns)
    }

    /// Check if a relative path should be excluded
    pub fn is_excluded(&self, relative: &Path) -> bool {
        self.glob_set.is_match(relative)
    }
}

/// Rules for `dir`: defaults, plus its ignore file when present.
pub fn rules_for(dir: &Path) -> Result<ExcludeRules, SourceError> {
    let ignore = dir.join(IGNORE_FILE);
    if ignore.is_file() {
        ExcludeRules::from_ignore_file(&ignore)
    } else {
        ExcludeRules::new()
    }
}

/// Collect the files under `dir`, named relative to it with `/` separators.
pub fn collect_sources(dir: &Path, rules: &ExcludeRules) -> Result<Vec<NamedFile>, SourceError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry
                .path()
                .strip_prefix(dir)
                .map(|relative| !rules.is_excluded(relative))
                .unwrap_or(false)
        });

    for entry in walker {
        let entry = entry.map_err(|e| SourceError::Io {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(NamedFile::new(name, read_text(entry.path())?));
    }

    if files.is_empty() {
        return Err(SourceError::Empty(dir.to_path_buf()));
    }
    Ok(files)
}

/// Load one path: a sketch directory, or a single source file.
pub fn load_sources(path: &Path) -> Result<Vec<NamedFile>, SourceError> {
    if path.is_dir() {
        return collect_sources(path, &rules_for(path)?);
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(vec![NamedFile::new(name, read_text(path)?)])
}

/// Sketch name implied by a path: the directory name, or the file stem.
pub fn sketch_name_for(path: &Path) -> Option<String> {
    let name = if path.is_dir() {
        path.canonicalize().ok()?.file_name()?.to_string_lossy().into_owned()
    } else {
        path.file_stem()?.to_string_lossy().into_owned()
    };
    Some(name).filter(|n| !n.is_empty())
}

fn read_text(path: &Path) -> Result<String, SourceError> {
    let bytes = fs::read(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| SourceError::NotText(path.to_path_buf()))
}
