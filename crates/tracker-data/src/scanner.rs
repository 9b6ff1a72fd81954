//! Activity directory discovery.
//!
//! Lists a directory written by the backup tool (non-recursively), keeps the
//! files with a recognised extension and groups them by activity identifier.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, warn};
use tracker_core::error::DirectoryError;
use tracker_core::models::{ActivityFile, ActivityFileGroup, FileFormat, FileRole};
use tracker_core::time_utils::parse_timestamp;

/// Index of all activities written by the download step; not an activity.
const ACTIVITY_INDEX_FILE: &str = "activities.json";

// ── Filename grammar ──────────────────────────────────────────────────────────

/// What a recognised filename says about its file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFileName {
    pub id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub role: FileRole,
    pub format: FileFormat,
}

fn file_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^(?:(?P<ts>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?)_)?
            (?P<id>.+?)
            (?:_(?P<role>(?i:summary|details)))?$",
        )
        .expect("regex is valid")
    })
}

/// Parse `[<timestamp>_]<id>[_<role>].<ext>`.
///
/// Returns `None` for unrecognised extensions and for names with an empty
/// identifier.
pub fn parse_file_name(path: &Path) -> Option<ParsedFileName> {
    let format = FileFormat::from_extension(path.extension()?.to_str()?)?;
    let stem = path.file_stem()?.to_str()?;

    let caps = file_name_regex().captures(stem)?;
    let id = caps.name("id")?.as_str().to_string();
    if id.is_empty() {
        return None;
    }
    let timestamp = caps.name("ts").and_then(|m| parse_timestamp(m.as_str()));
    let role = caps
        .name("role")
        .and_then(|m| FileRole::from_suffix(m.as_str()))
        .unwrap_or(FileRole::Activity);

    Some(ParsedFileName {
        id,
        timestamp,
        role,
        format,
    })
}

// ── DirectoryScanner ──────────────────────────────────────────────────────────

/// Enumerates and groups the activity files in one directory.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    root: PathBuf,
    allow_missing: bool,
}

impl DirectoryScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            allow_missing: false,
        }
    }

    /// Treat a missing directory as empty instead of a [`DirectoryError`].
    pub fn allow_missing(mut self, allow: bool) -> Self {
        self.allow_missing = allow;
        self
    }

    /// List the directory and group its recognised files.
    ///
    /// Groups come out ordered by identifier. Subdirectories and files with
    /// unknown extensions are skipped.
    pub fn scan(&self) -> Result<ActivityGroups, DirectoryError> {
        match std::fs::metadata(&self.root) {
            Ok(meta) if !meta.is_dir() => {
                return Err(DirectoryError::NotADirectory(self.root.clone()));
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if self.allow_missing {
                    warn!("Activities directory does not exist: {}", self.root.display());
                    return Ok(ActivityGroups::empty());
                }
                return Err(DirectoryError::NotFound(self.root.clone()));
            }
            Err(e) => {
                return Err(DirectoryError::Unreadable {
                    path: self.root.clone(),
                    source: e,
                });
            }
        }

        let mut groups: BTreeMap<String, ActivityFileGroup> = BTreeMap::new();
        let mut recognised = 0usize;
        let mut ignored = 0usize;

        let walker = walkdir::WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("directory loop"));
                    return Err(DirectoryError::Unreadable {
                        path: self.root.clone(),
                        source,
                    });
                }
                Err(err) => {
                    warn!("Skipping unreadable entry in {}: {}", self.root.display(), err);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            if entry.file_name() == ACTIVITY_INDEX_FILE {
                debug!("Skipping activity index {}", entry.path().display());
                ignored += 1;
                continue;
            }

            let Some(parsed) = parse_file_name(entry.path()) else {
                ignored += 1;
                continue;
            };
            recognised += 1;

            let group = groups
                .entry(parsed.id.clone())
                .or_insert_with(|| ActivityFileGroup::new(parsed.id.clone()));
            if group.filename_timestamp.is_none() {
                group.filename_timestamp = parsed.timestamp;
            }
            group.files.push(ActivityFile {
                path: entry.into_path(),
                format: parsed.format,
                role: parsed.role,
            });
        }

        for group in groups.values_mut() {
            group
                .files
                .sort_by(|a, b| a.role.cmp(&b.role).then_with(|| a.path.cmp(&b.path)));
        }

        debug!(
            "Scanned {}: {} recognised files in {} activities, {} ignored",
            self.root.display(),
            recognised,
            groups.len(),
            ignored
        );

        Ok(ActivityGroups {
            inner: groups.into_values(),
        })
    }
}

/// Convenience wrapper: strict scan of `root`.
pub fn scan_directory(root: &Path) -> Result<ActivityGroups, DirectoryError> {
    DirectoryScanner::new(root).scan()
}

// ── ActivityGroups ────────────────────────────────────────────────────────────

/// Iterator over the groups found by a scan, ordered by identifier.
#[derive(Debug)]
pub struct ActivityGroups {
    inner: btree_map::IntoValues<String, ActivityFileGroup>,
}

impl ActivityGroups {
    fn empty() -> Self {
        Self {
            inner: BTreeMap::new().into_values(),
        }
    }
}

impl Iterator for ActivityGroups {
    type Item = ActivityFileGroup;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ActivityGroups {}

// ── Tests ─────────────────────────────────────────────────────────────────────
