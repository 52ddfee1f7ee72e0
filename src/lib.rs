//! Resumable brute-force password search for encrypted documents.
//!
//! The engine enumerates candidates over an [`Alphabet`] and a length range
//! in a fixed order, asks an [`Oracle`] about each one, and checkpoints
//! its position so an interrupted search picks up where it stopped.
//!
//! ```no_run
//! use pdf_brute::{Backend, SearchConfig, SearchController, resolve};
//!
//! let mut config = SearchConfig::new("locked.pdf");
//! config.alphabet = resolve("dl");
//! config.max_length = 4;
//!
//! let oracle = Backend::Lopdf.oracle(&config.target);
//! let mut controller = SearchController::new(config, oracle)?;
//! let report = controller.run();
//! println!("{:?} after {} attempts", report.outcome, report.tried);
//! # Ok::<(), pdf_brute::Error>(())
//! ```

pub mod charset;
pub mod checkpoint;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod estimate;
pub mod oracle;
pub mod search;

pub use charset::{Alphabet, Charset, resolve};
pub use checkpoint::{Checkpoint, CheckpointStore};
pub use config::SearchConfig;
pub use enumerate::Candidates;
pub use error::{Error, OracleError, Result};
pub use estimate::{Estimate, Estimator};
pub use oracle::{Backend, FallbackOracle, Oracle, PdfOracle, QpdfOracle};
pub use search::{CancelToken, Outcome, Phase, Progress, SearchController, SearchReport, SearchState};
