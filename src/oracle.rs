//! Password verification backends.
//!
//! An [`Oracle`] answers one question per candidate: does this password
//! unlock the target? `Ok(true)` is a match, `Ok(false)` a miss, and `Err`
//! a per-candidate failure the search logs and moves past.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use lopdf::Document;
use lopdf::Error as LopdfError;
use lopdf::encryption::DecryptionError;
use tracing::warn;

use crate::error::{Error, OracleError};

/// Decides whether a candidate password opens the target.
pub trait Oracle: Send + Sync {
    /// Backend name used in logs.
    fn name(&self) -> &str;

    /// One-time setup before the first candidate. A failure here ends the
    /// search as failed rather than being retried per candidate.
    fn prepare(&self) -> Result<(), OracleError> {
        Ok(())
    }

    /// `Ok(false)` is a plain miss; `Err` means the backend could not tell.
    fn verify(&self, candidate: &str) -> Result<bool, OracleError>;
}

impl<O: Oracle + ?Sized> Oracle for Box<O> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn prepare(&self) -> Result<(), OracleError> {
        (**self).prepare()
    }

    fn verify(&self, candidate: &str) -> Result<bool, OracleError> {
        (**self).verify(candidate)
    }
}

impl<O: Oracle + ?Sized> Oracle for Arc<O> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn prepare(&self) -> Result<(), OracleError> {
        (**self).prepare()
    }

    fn verify(&self, candidate: &str) -> Result<bool, OracleError> {
        (**self).verify(candidate)
    }
}

/// Verifies candidates in-process with lopdf. The document is parsed once
/// during [`Oracle::prepare`].
pub struct PdfOracle {
    path: PathBuf,
    document: OnceLock<Document>,
}

impl PdfOracle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: OnceLock::new(),
        }
    }
}

impl Oracle for PdfOracle {
    fn name(&self) -> &str {
        "lopdf"
    }

    fn prepare(&self) -> Result<(), OracleError> {
        if self.document.get().is_some() {
            return Ok(());
        }
        let document = Document::load(&self.path)?;
        if !document.is_encrypted() {
            return Err(OracleError::NotEncrypted);
        }
        let _ = self.document.set(document);
        Ok(())
    }

    fn verify(&self, candidate: &str) -> Result<bool, OracleError> {
        let document = self
            .document
            .get()
            .ok_or(OracleError::NotPrepared("lopdf"))?;
        match document.authenticate_password(candidate) {
            Ok(()) => Ok(true),
            Err(LopdfError::Decryption(DecryptionError::IncorrectPassword)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Verifies candidates by asking the `qpdf` command-line tool to decrypt
/// the target into a scratch file.
pub struct QpdfOracle {
    path: PathBuf,
    program: String,
}

impl QpdfOracle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_program(path, "qpdf")
    }

    /// Runs `program` instead of looking up `qpdf` on `PATH`.
    pub fn with_program(path: impl Into<PathBuf>, program: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            program: program.into(),
        }
    }

    fn launch_error(&self, source: std::io::Error) -> OracleError {
        OracleError::Launch {
            program: self.program.clone(),
            source,
        }
    }
}

impl Oracle for QpdfOracle {
    fn name(&self) -> &str {
        "qpdf"
    }

    fn prepare(&self) -> Result<(), OracleError> {
        if program_runs(&self.program) {
            Ok(())
        } else {
            Err(OracleError::Unavailable(format!("{} --version failed", self.program)))
        }
    }

    fn verify(&self, candidate: &str) -> Result<bool, OracleError> {
        let scratch = tempfile::Builder::new()
            .prefix("pdf-brute-")
            .suffix(".pdf")
            .tempfile()
            .map_err(|e| self.launch_error(e))?;

        let output = Command::new(&self.program)
            .arg(format!("--password={}", candidate))
            .arg("--decrypt")
            .arg(&self.path)
            .arg(scratch.path())
            .output()
            .map_err(|e| self.launch_error(e))?;

        // Exit code 3 means success with warnings.
        if output.status.success() || output.status.code() == Some(3) {
            return Ok(true);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.to_lowercase().contains("invalid password") {
            return Ok(false);
        }

        Err(OracleError::Command {
            program: self.program.clone(),
            status: output.status.to_string(),
            stderr: stderr.trim().to_string(),
        })
    }
}

fn program_runs(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Tries each inner oracle in priority order; any match wins.
///
/// Inner oracles that fail to prepare are skipped for the rest of the run.
/// A candidate is an error only when every usable oracle errored on it.
pub struct FallbackOracle {
    oracles: Vec<Box<dyn Oracle>>,
    usable: OnceLock<Vec<usize>>,
}

impl FallbackOracle {
    /// `oracles` in priority order.
    pub fn new(oracles: Vec<Box<dyn Oracle>>) -> Self {
        Self {
            oracles,
            usable: OnceLock::new(),
        }
    }
}

impl Oracle for FallbackOracle {
    fn name(&self) -> &str {
        "all"
    }

    fn prepare(&self) -> Result<(), OracleError> {
        if self.usable.get().is_some() {
            return Ok(());
        }

        let mut usable = Vec::new();
        for (i, oracle) in self.oracles.iter().enumerate() {
            match oracle.prepare() {
                Ok(()) => usable.push(i),
                Err(e) => warn!("Skipping backend {}: {}", oracle.name(), e),
            }
        }

        if usable.is_empty() {
            return Err(OracleError::Unavailable(
                "no backend could be prepared".to_string(),
            ));
        }
        let _ = self.usable.set(usable);
        Ok(())
    }

    fn verify(&self, candidate: &str) -> Result<bool, OracleError> {
        let usable = self.usable.get().ok_or(OracleError::NotPrepared("all"))?;

        let mut last_error = None;
        let mut answered = false;
        for &i in usable {
            let oracle = &self.oracles[i];
            match oracle.verify(candidate) {
                Ok(true) => return Ok(true),
                Ok(false) => answered = true,
                Err(e) => {
                    warn!("{} error on '{}': {}", oracle.name(), candidate, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !answered => Err(e),
            _ => Ok(false),
        }
    }
}

/// Selectable verification backends, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Lopdf,
    Qpdf,
    All,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Lopdf => "lopdf",
            Backend::Qpdf => "qpdf",
            Backend::All => "all",
        }
    }

    /// One line for `--show-available-libraries`.
    pub fn description(self) -> &'static str {
        match self {
            Backend::Lopdf => "In-process PDF library (lopdf)",
            Backend::Qpdf => "Command line tool for PDF files",
            Backend::All => "Try every available backend in order",
        }
    }

    /// Backends usable on this machine. `lopdf` is always compiled in;
    /// `qpdf` requires the executable on `PATH`.
    pub fn available() -> Vec<Backend> {
        let mut backends = vec![Backend::Lopdf];
        if program_runs("qpdf") {
            backends.push(Backend::Qpdf);
        }
        backends.push(Backend::All);
        backends
    }

    /// Builds the oracle for `target`. No I/O happens until it is prepared.
    pub fn oracle(self, target: &Path) -> Box<dyn Oracle> {
        match self {
            Backend::Lopdf => Box::new(PdfOracle::new(target)),
            Backend::Qpdf => Box::new(QpdfOracle::new(target)),
            Backend::All => Box::new(FallbackOracle::new(vec![
                Box::new(PdfOracle::new(target)),
                Box::new(QpdfOracle::new(target)),
            ])),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lopdf" => Ok(Backend::Lopdf),
            "qpdf" => Ok(Backend::Qpdf),
            "all" => Ok(Backend::All),
            _ => Err(Error::UnknownBackend(s.to_string())),
        }
    }
}
