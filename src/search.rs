//! The search controller: drives enumeration, verification, progress
//! reporting, checkpointing and cancellation for a single run.
//!
//! State machine: `Idle -> Running -> {Found, Exhausted, Stopped, Failed}`.
//! Cancellation is polled before every batch of oracle calls; with one
//! thread a batch is a single candidate, so a stop request is honoured
//! at the next oracle-call boundary.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};
use tracing::{debug, error, info, info_span, warn};

use crate::checkpoint::{self, Checkpoint, CheckpointStore};
use crate::config::SearchConfig;
use crate::enumerate::{Candidates, rank};
use crate::error::{OracleError, Result};
use crate::estimate::{Estimate, Estimator, format_elapsed, group_thousands, rate, search_space};
use crate::oracle::Oracle;

/// Candidates handed to each worker per batch when verifying in parallel.
const BATCH_PER_THREAD: usize = 64;

/// Shared stop flag. Cloning yields a handle to the same flag, safe to set
/// from any thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop; the running search observes it before its next oracle call.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Lifecycle of a controller; every phase after `Running` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Found,
    Exhausted,
    Stopped,
    Failed,
}

impl Phase {
    /// True once the run has ended, whatever the reason.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Phase::Idle | Phase::Running)
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Found(String),
    Exhausted,
    Stopped,
    Failed(String),
}

impl Outcome {
    fn phase(&self) -> Phase {
        match self {
            Outcome::Found(_) => Phase::Found,
            Outcome::Exhausted => Phase::Exhausted,
            Outcome::Stopped => Phase::Stopped,
            Outcome::Failed(_) => Phase::Failed,
        }
    }
}

/// Summary returned when a run reaches a terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    pub outcome: Outcome,
    pub tried: u64,
    pub elapsed: Duration,
}

impl SearchReport {
    /// The recovered password, if the run found one.
    pub fn password(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Found(password) => Some(password),
            _ => None,
        }
    }
}

/// Periodic progress event handed to the caller's sink.
#[derive(Debug, Clone)]
pub struct Progress {
    pub tried: u64,
    pub current: String,
    /// Absolute position in the full enumeration, resumes included.
    pub position: u128,
    pub total: u128,
    pub rate: Option<f64>,
    pub elapsed: Duration,
    pub estimate: Estimate,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rate = self.rate.unwrap_or(0.0);
        write!(
            f,
            "Tried: {} | Current: {} | Rate: {:.1}/sec | Elapsed: {} | Est. completion: {}",
            group_thousands(self.tried as u128),
            self.current,
            rate,
            format_elapsed(self.elapsed.as_secs_f64()),
            self.estimate
        )
    }
}

/// Caller-supplied receiver of [`Progress`] events.
pub type ProgressSink = Box<dyn FnMut(&Progress) + Send>;

/// Mutable state of a run, owned by the controller.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    /// Candidates pulled from the enumerator in this invocation.
    pub tried: u64,
    /// Most recent candidate handed to the oracle.
    pub current: Option<String>,
    /// Most recent candidate whose verification completed.
    pub last_verified: Option<String>,
    pub started: Option<Instant>,
    pub found: Option<String>,
}

/// Result of one oracle call; `Err` carries a panic message.
type Attempt = std::result::Result<std::result::Result<bool, OracleError>, String>;

/// Runs one search over a [`SearchConfig`] with an injected [`Oracle`].
pub struct SearchController<O: Oracle> {
    config: SearchConfig,
    /// Target identity written to and matched against checkpoints.
    target_id: String,
    oracle: O,
    store: Option<CheckpointStore>,
    cancel: CancelToken,
    sink: Option<ProgressSink>,
    state: SearchState,
    phase: Phase,
    /// Candidates verified in this invocation, contiguous from the start.
    verified: u64,
    /// Verified count and seconds carried over from the checkpoint this
    /// run resumed from.
    prior_tried: u64,
    prior_duration: f64,
    /// Cleared when the run cannot make progress, so an existing
    /// checkpoint is left as it was.
    persist: bool,
    report: Option<SearchReport>,
}

impl<O: Oracle> SearchController<O> {
    /// Validates `config`; configuration errors surface here and the
    /// controller never leaves `Idle`.
    pub fn new(config: SearchConfig, oracle: O) -> Result<Self> {
        config.validate()?;
        let store = config.checkpoint_file.clone().map(CheckpointStore::new);
        let target_id = config.target_id();
        Ok(Self {
            config,
            target_id,
            oracle,
            store,
            cancel: CancelToken::new(),
            sink: None,
            state: SearchState::default(),
            phase: Phase::Idle,
            verified: 0,
            prior_tried: 0,
            prior_duration: 0.0,
            persist: true,
            report: None,
        })
    }

    /// Routes progress events to `sink` instead of the log.
    pub fn with_sink(mut self, sink: impl FnMut(&Progress) + Send + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Uses an externally owned token instead of the controller's own.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle for stopping this run from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Configuration this controller was built with.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Counters and last candidates of the current run.
    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Size of the full search space.
    pub fn total(&self) -> u128 {
        search_space(
            self.config.alphabet.len(),
            self.config.min_length,
            self.config.max_length,
        )
    }

    /// Runs the search to a terminal state. Calling it again returns the
    /// first run's report.
    pub fn run(&mut self) -> SearchReport {
        if let Some(report) = &self.report {
            warn!("Search already finished; returning previous result");
            return report.clone();
        }

        let _span = info_span!("search", target = %self.config.target.display()).entered();
        self.phase = Phase::Running;
        self.state.started = Some(Instant::now());
        self.log_configuration();

        let resume = self
            .config
            .resume_from
            .clone()
            .or_else(|| self.checkpoint_resume_point());

        let alphabet = &self.config.alphabet;
        let (min_len, max_len) = (self.config.min_length, self.config.max_length);
        let (mut candidates, offset) = match &resume {
            Some(point) => {
                info!("Resuming after '{}'", point);
                match rank(alphabet, min_len, max_len, point) {
                    Some(position) => {
                        self.state.last_verified = Some(point.clone());
                        (
                            Candidates::after(alphabet, min_len, max_len, point),
                            position.saturating_add(1),
                        )
                    }
                    None => {
                        self.persist = false;
                        (Candidates::after(alphabet, min_len, max_len, point), 0)
                    }
                }
            }
            None => (Candidates::new(alphabet, min_len, max_len), 0),
        };
        let estimator = Estimator::new(self.total(), offset);

        if let Err(e) = self.oracle.prepare() {
            error!("Backend {} could not be prepared: {}", self.oracle.name(), e);
            return self.finish(Outcome::Failed(e.to_string()));
        }

        let pool = if self.config.threads > 1 {
            match ThreadPoolBuilder::new().num_threads(self.config.threads).build() {
                Ok(pool) => Some(pool),
                Err(e) => {
                    error!("Failed to initialize thread pool: {}", e);
                    return self.finish(Outcome::Failed(e.to_string()));
                }
            }
        } else {
            None
        };

        let batch = match &pool {
            Some(pool) => pool.current_num_threads() * BATCH_PER_THREAD,
            None => 1,
        };
        let mut last_save = Instant::now();

        loop {
            if self.cancel.is_cancelled() {
                info!("Process stopped by user.");
                return self.finish(Outcome::Stopped);
            }

            let chunk: Vec<String> = candidates.by_ref().take(batch).collect();
            if chunk.is_empty() {
                info!(
                    "Exhausted all combinations. Tried {} passwords.",
                    group_thousands(self.state.tried as u128)
                );
                return self.finish(Outcome::Exhausted);
            }

            let attempts = verify_chunk(&self.oracle, pool.as_ref(), &chunk);

            for (candidate, attempt) in chunk.into_iter().zip(attempts) {
                self.state.tried += 1;
                self.state.current = Some(candidate.clone());

                if self.config.progress_every > 0 && self.state.tried % self.config.progress_every == 0 {
                    self.emit_progress(&estimator, offset, &candidate);
                }

                if self.store.is_some() && last_save.elapsed() >= self.config.checkpoint_interval {
                    self.save_checkpoint();
                    last_save = Instant::now();
                }

                let verdict = match attempt {
                    Ok(verdict) => verdict,
                    Err(message) => {
                        error!("Backend panicked on '{}': {}", candidate, message);
                        return self.finish(Outcome::Failed(message));
                    }
                };

                // A match is not recorded as verified, so a later run
                // resuming from the checkpoint tests it again.
                match verdict {
                    Ok(true) => return self.finish(Outcome::Found(candidate)),
                    Ok(false) => {}
                    Err(e) => warn!("{} error on '{}': {}", self.oracle.name(), candidate, e),
                }

                self.verified += 1;
                self.state.last_verified = Some(candidate);
            }
        }
    }

    fn log_configuration(&self) {
        let config = &self.config;
        info!("File: {}", config.target.display());
        info!(
            "Length: {} to {} characters",
            config.min_length, config.max_length
        );
        info!("Character set: {} characters", config.alphabet.len());
        info!("Library: {}", self.oracle.name());
        info!(
            "Total possible combinations: {}",
            group_thousands(self.total())
        );
        match &self.store {
            Some(store) => info!("Progress file: {}", store.path().display()),
            None => info!("Progress file: Disabled"),
        }
    }

    /// Resume point from a checkpoint written for this exact search, if any.
    fn checkpoint_resume_point(&mut self) -> Option<String> {
        if !self.config.auto_resume {
            return None;
        }
        let store = self.store.as_ref()?;

        match store.load() {
            Ok(Some(saved)) => {
                let matches = saved.matches(
                    &self.target_id,
                    &self.config.alphabet.to_string(),
                    self.config.min_length,
                    self.config.max_length,
                );
                if !matches {
                    info!(
                        "Ignoring {}: written for a different target or search space",
                        store.path().display()
                    );
                    return None;
                }
                info!(
                    "Loaded progress from {} ({} tried previously)",
                    store.path().display(),
                    group_thousands(saved.tried as u128)
                );
                self.prior_tried = saved.tried;
                self.prior_duration = saved.duration;
                saved.last_candidate
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Could not load progress file: {}", e);
                None
            }
        }
    }

    fn emit_progress(&mut self, estimator: &Estimator, offset: u128, candidate: &str) {
        let elapsed = self.elapsed();
        let secs = elapsed.as_secs_f64();
        let progress = Progress {
            tried: self.state.tried,
            current: candidate.to_string(),
            position: offset.saturating_add(self.state.tried as u128),
            total: estimator.total(),
            rate: rate(self.state.tried, secs),
            elapsed,
            estimate: estimator.estimate(self.state.tried, secs),
        };

        match self.sink.as_mut() {
            Some(sink) => sink(&progress),
            None => info!("{}", progress),
        }
    }

    fn elapsed(&self) -> Duration {
        self.state
            .started
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            target: self.target_id.clone(),
            tried: self.prior_tried.saturating_add(self.verified),
            last_candidate: self.state.last_verified.clone(),
            duration: self.prior_duration + self.elapsed().as_secs_f64(),
            timestamp: checkpoint::timestamp(),
            charset: self.config.alphabet.to_string(),
            min_length: self.config.min_length,
            max_length: self.config.max_length,
        }
    }

    /// Best effort: failures are logged and the run carries on.
    fn save_checkpoint(&self) {
        let Some(store) = self.store.as_ref().filter(|_| self.persist) else {
            return;
        };
        if let Err(e) = store.save(&self.checkpoint()) {
            warn!("Could not save progress: {}", e);
        }
    }

    fn finish(&mut self, outcome: Outcome) -> SearchReport {
        let elapsed = self.elapsed();
        let secs = elapsed.as_secs_f64();

        match &outcome {
            Outcome::Found(password) => {
                if self.state.found.is_none() {
                    self.state.found = Some(password.clone());
                }
                info!("PASSWORD FOUND: '{}'", password);
                info!("Attempts: {}", group_thousands(self.state.tried as u128));
                info!("Time elapsed: {}", format_elapsed(secs));
                if let Some(rate) = rate(self.state.tried, secs) {
                    info!("Rate: {:.1} passwords/second", rate);
                }
                if let Some(path) = &self.config.result_file {
                    match checkpoint::write_result(path, password, self.state.tried, secs) {
                        Ok(()) => info!("Password saved to {}", path.display()),
                        Err(e) => warn!("Error saving password to file: {}", e),
                    }
                }
            }
            Outcome::Exhausted => {
                info!("Time elapsed: {}", format_elapsed(secs));
            }
            Outcome::Stopped => {
                debug!("Stopped after {} candidates", self.state.tried);
            }
            Outcome::Failed(reason) => {
                error!("Search failed: {}", reason);
            }
        }

        self.save_checkpoint();
        self.phase = outcome.phase();

        let report = SearchReport {
            outcome,
            tried: self.state.tried,
            elapsed,
        };
        self.report = Some(report.clone());
        report
    }
}

/// Verifies `chunk` in order, fanning out over `pool` when there is one.
/// Panics inside the oracle are caught per candidate.
fn verify_chunk<O: Oracle>(oracle: &O, pool: Option<&ThreadPool>, chunk: &[String]) -> Vec<Attempt> {
    let attempt = |candidate: &String| -> Attempt {
        panic::catch_unwind(AssertUnwindSafe(|| oracle.verify(candidate))).map_err(panic_message)
    };

    match pool {
        Some(pool) => pool.install(|| chunk.par_iter().map(attempt).collect()),
        None => chunk.iter().map(attempt).collect(),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "backend panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Never;

    impl Oracle for Never {
        fn name(&self) -> &str {
            "never"
        }

        fn verify(&self, _candidate: &str) -> std::result::Result<bool, OracleError> {
            Ok(false)
        }
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn invalid_config_stays_idle() {
        let mut config = SearchConfig::new("a.pdf");
        config.min_length = 3;
        config.max_length = 2;
        assert!(SearchController::new(config, Never).is_err());
    }

    #[test]
    fn second_run_returns_first_report() {
        let mut config = SearchConfig::new("a.pdf");
        config.max_length = 1;
        config.checkpoint_file = None;
        config.result_file = None;

        let mut controller = SearchController::new(config, Never).unwrap();
        assert_eq!(controller.phase(), Phase::Idle);
        let first = controller.run();
        assert_eq!(first.outcome, Outcome::Exhausted);
        assert_eq!(first.tried, 10);

        let second = controller.run();
        assert_eq!(second, first);
        assert!(controller.phase().is_terminal());
    }

    #[test]
    fn progress_line_format() {
        let progress = Progress {
            tried: 1_000,
            current: "0999".to_string(),
            position: 1_000,
            total: 10_000,
            rate: Some(500.0),
            elapsed: Duration::from_secs(2),
            estimate: Estimate::Remaining(18.0),
        };
        assert_eq!(
            progress.to_string(),
            "Tried: 1,000 | Current: 0999 | Rate: 500.0/sec | Elapsed: 2.0 seconds | Est. completion: ~18.0 seconds"
        );
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload = panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload), "boom");
    }
}
