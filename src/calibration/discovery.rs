//! Calibration discovery sources
//!
//! How a physical display is detected is outside this crate. A discovery
//! source only has to report the current list of calibration records when
//! polled; the registry's wait loop calls [`CalibrationDiscovery::refresh`] on
//! every poll tick.

use std::fs;
use std::path::{Path, PathBuf};

use super::record::CalibrationRecord;

/// A pollable source of calibration records.
pub trait CalibrationDiscovery: Send {
    /// Poll the source.
    ///
    /// Returns the full current list of records, or `None` when the source
    /// has nothing new to say since the last poll.
    fn refresh(&mut self) -> Option<Vec<CalibrationRecord>>;

    /// Whether the source expects to discover anything further.
    fn is_finished(&self) -> bool {
        false
    }
}

/// Discovers calibrations from `*.json` files in a directory.
///
/// Files are read in name order so discovery order is stable. Files that do
/// not parse are skipped with a warning.
pub struct DirectoryDiscovery {
    /// Directory to scan
    dir: PathBuf,
    /// Stop after the first successful scan
    one_shot: bool,
    /// Has a scan completed?
    scanned: bool,
    /// Records from the previous scan
    last: Vec<CalibrationRecord>,
}

impl DirectoryDiscovery {
    /// Scan `dir` on every refresh
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            one_shot: false,
            scanned: false,
            last: Vec::new(),
        }
    }

    /// Scan `dir` once, then report discovery as finished
    pub fn one_shot(dir: impl Into<PathBuf>) -> Self {
        Self {
            one_shot: true,
            ..Self::new(dir)
        }
    }

    /// Directory being scanned
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn scan(&self) -> Vec<CalibrationRecord> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("DirectoryDiscovery: cannot read {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            match CalibrationRecord::load_from_file(&path) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("DirectoryDiscovery: skipping {}: {}", path.display(), e);
                }
            }
        }
        records
    }
}

impl CalibrationDiscovery for DirectoryDiscovery {
    fn refresh(&mut self) -> Option<Vec<CalibrationRecord>> {
        if self.one_shot && self.scanned {
            return None;
        }

        let records = self.scan();
        let first_scan = !self.scanned;
        self.scanned = true;

        if first_scan || records != self.last {
            tracing::debug!(
                "DirectoryDiscovery: {} calibration(s) in {}",
                records.len(),
                self.dir.display()
            );
            self.last = records.clone();
            Some(records)
        } else {
            None
        }
    }

    fn is_finished(&self) -> bool {
        self.one_shot && self.scanned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("holo-camera-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_directory_scan_in_name_order() {
        let dir = scratch_dir("scan");
        fs::write(
            dir.join("b.json"),
            r#"{"serial": "B", "screenW": 3840, "screenH": 2160, "deviceType": "16in"}"#,
        )
        .unwrap();
        fs::write(
            dir.join("a.json"),
            r#"{"serial": "A", "screenW": 1536, "screenH": 2048, "deviceType": "Portrait"}"#,
        )
        .unwrap();
        fs::write(dir.join("broken.json"), "{ not json").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let mut discovery = DirectoryDiscovery::new(&dir);
        let records = discovery.refresh().unwrap();
        let serials: Vec<_> = records.iter().map(|r| r.serial.as_str()).collect();
        assert_eq!(serials, vec!["A", "B"]);

        // Unchanged directory reports nothing new
        assert!(discovery.refresh().is_none());
        assert!(!discovery.is_finished());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_one_shot_finishes() {
        let dir = scratch_dir("one-shot");
        let mut discovery = DirectoryDiscovery::one_shot(&dir);
        assert!(!discovery.is_finished());
        assert_eq!(discovery.refresh(), Some(Vec::new()));
        assert!(discovery.is_finished());
        assert!(discovery.refresh().is_none());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let mut discovery = DirectoryDiscovery::new("/definitely/not/a/real/dir");
        assert_eq!(discovery.refresh(), Some(Vec::new()));
    }
}
