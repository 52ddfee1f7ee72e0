//! Search configuration, fixed once a run starts.

use std::ffi::OsString;
use std::fs;
use std::path::{self, Path, PathBuf};
use std::time::Duration;

use crate::charset::Alphabet;
use crate::error::{Error, Result};
use crate::oracle::Backend;

/// Shortest candidate tried when none is given.
pub const DEFAULT_MIN_LENGTH: usize = 1;
/// Longest candidate tried when none is given.
pub const DEFAULT_MAX_LENGTH: usize = 8;
/// Candidates between progress events.
pub const DEFAULT_PROGRESS_EVERY: u64 = 1000;
/// Time between periodic checkpoint writes.
pub const DEFAULT_CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

/// Everything a run needs besides the oracle.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// File being attacked; also identifies its checkpoint.
    pub target: PathBuf,
    pub min_length: usize,
    pub max_length: usize,
    pub alphabet: Alphabet,
    /// Enumeration starts strictly after this candidate.
    pub resume_from: Option<String>,
    pub backend: Backend,
    /// Emit a progress event every this many candidates; 0 disables.
    pub progress_every: u64,
    /// Minimum wall-clock time between periodic checkpoint writes.
    pub checkpoint_interval: Duration,
    /// `None` disables checkpointing.
    pub checkpoint_file: Option<PathBuf>,
    /// `None` skips writing the found password to disk.
    pub result_file: Option<PathBuf>,
    /// Resume from a matching checkpoint when `resume_from` is unset.
    pub auto_resume: bool,
    /// Oracle calls in flight at once; 1 keeps verification sequential.
    pub threads: usize,
}

impl SearchConfig {
    /// Defaults for `target`, with checkpoint and result files beside it
    /// in the working directory.
    pub fn new(target: impl Into<PathBuf>) -> Self {
        let target = target.into();
        Self {
            checkpoint_file: Some(sidecar_path(&target, "progress")),
            result_file: Some(sidecar_path(&target, "password")),
            target,
            min_length: DEFAULT_MIN_LENGTH,
            max_length: DEFAULT_MAX_LENGTH,
            alphabet: Alphabet::default(),
            resume_from: None,
            backend: Backend::default(),
            progress_every: DEFAULT_PROGRESS_EVERY,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            auto_resume: true,
            threads: 1,
        }
    }

    /// Rejects lengths and thread counts no run can use.
    pub fn validate(&self) -> Result<()> {
        if self.min_length == 0 {
            return Err(Error::ZeroMinLength);
        }
        if self.min_length > self.max_length {
            return Err(Error::LengthRange {
                min: self.min_length,
                max: self.max_length,
            });
        }
        if self.threads == 0 {
            return Err(Error::ZeroThreads);
        }
        Ok(())
    }

    /// Target identity as recorded in checkpoints: the canonical path when
    /// the file exists, else the absolute path, so `./a.pdf` and `a.pdf`
    /// name the same target.
    pub fn target_id(&self) -> String {
        fs::canonicalize(&self.target)
            .or_else(|_| path::absolute(&self.target))
            .unwrap_or_else(|_| self.target.clone())
            .display()
            .to_string()
    }
}

/// `<target file name>.<ext>` in the working directory.
pub fn sidecar_path(target: &Path, ext: &str) -> PathBuf {
    let mut name = target
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("target"));
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_derive_sidecars_from_file_name() {
        let config = SearchConfig::new("/data/docs/report.pdf");
        assert_eq!(config.checkpoint_file, Some(PathBuf::from("report.pdf.progress")));
        assert_eq!(config.result_file, Some(PathBuf::from("report.pdf.password")));
        assert_eq!(config.min_length, 1);
        assert_eq!(config.max_length, 8);
        assert_eq!(config.alphabet.len(), 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_lengths() {
        let mut config = SearchConfig::new("a.pdf");
        config.min_length = 0;
        assert!(matches!(config.validate(), Err(Error::ZeroMinLength)));

        config.min_length = 5;
        config.max_length = 3;
        assert!(matches!(
            config.validate(),
            Err(Error::LengthRange { min: 5, max: 3 })
        ));
    }

    #[test]
    fn target_id_ignores_spelling_of_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("a.pdf");
        fs::write(&file, b"%PDF-1.4").unwrap();

        let plain = SearchConfig::new(&file).target_id();
        let dotted = SearchConfig::new(dir.path().join(".").join("a.pdf")).target_id();
        assert_eq!(plain, dotted);

        let relative = SearchConfig::new("missing.pdf").target_id();
        assert_eq!(relative, SearchConfig::new("./missing.pdf").target_id());
    }

    #[test]
    fn rejects_zero_threads() {
        let mut config = SearchConfig::new("a.pdf");
        config.threads = 0;
        assert!(matches!(config.validate(), Err(Error::ZeroThreads)));
    }
}
