//! Durable search progress and the found-password artifact.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::estimate::{format_elapsed, group_thousands};

/// Snapshot of a run, serialized as a JSON object.
///
/// The field names on disk are kept stable so progress files stay
/// interchangeable with other tooling reading them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(rename = "pdf_file")]
    pub target: String,
    /// Candidates verified by the run that wrote this checkpoint.
    #[serde(rename = "passwords_tried")]
    pub tried: u64,
    /// Last candidate whose verification completed; the resume point.
    #[serde(rename = "current_password")]
    pub last_candidate: Option<String>,
    /// Cumulative seconds spent searching, across resumes.
    pub duration: f64,
    pub timestamp: String,
    pub charset: String,
    pub min_length: usize,
    pub max_length: usize,
}

impl Checkpoint {
    /// Whether this checkpoint was written for the same target and search space.
    pub fn matches(&self, target: &str, charset: &str, min_length: usize, max_length: usize) -> bool {
        self.target == target
            && self.charset == charset
            && self.min_length == min_length
            && self.max_length == max_length
    }
}

/// Current local time as an ISO-8601 string.
pub fn timestamp() -> String {
    Local::now().to_rfc3339()
}

/// Reads and writes a single checkpoint file.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Store backed by the JSON file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the checkpoint, `Ok(None)` if the file does not exist.
    pub fn load(&self) -> Result<Option<Checkpoint>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path).map_err(|source| Error::CheckpointIo {
            path: self.path.clone(),
            source,
        })?;
        let checkpoint = serde_json::from_str(&text).map_err(|source| Error::CheckpointFormat {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(checkpoint))
    }

    /// Writes the checkpoint through a sibling temporary file and a rename,
    /// so a crash mid-write leaves the previous checkpoint intact.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let json = serde_json::to_string_pretty(checkpoint).map_err(|source| Error::CheckpointFormat {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp_name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("checkpoint"));
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        let io_err = |source| Error::CheckpointIo {
            path: self.path.clone(),
            source,
        };
        fs::write(&tmp_path, json).map_err(io_err)?;
        fs::rename(&tmp_path, &self.path).map_err(io_err)?;

        debug!(
            "Saved checkpoint to {} ({} tried)",
            self.path.display(),
            checkpoint.tried
        );
        Ok(())
    }
}

/// Writes the found password, attempt count, elapsed time and date to `path`.
pub fn write_result(path: &Path, password: &str, tried: u64, elapsed_secs: f64) -> Result<()> {
    let body = format!(
        "Password: {}\nFound after {} attempts\nTime taken: {}\nDate: {}\n",
        password,
        group_thousands(tried as u128),
        format_elapsed(elapsed_secs),
        timestamp()
    );
    fs::write(path, body).map_err(|source| Error::ResultIo {
        path: path.to_path_buf(),
        source,
    })
}
