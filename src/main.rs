//! Command-line entry point for the resumable PDF password brute-force tool.

use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_brute::config::{DEFAULT_MAX_LENGTH, DEFAULT_MIN_LENGTH, DEFAULT_PROGRESS_EVERY};
use pdf_brute::estimate::group_thousands;
use pdf_brute::{Backend, Charset, Error, Outcome, Progress, SearchConfig, SearchController};
use tokio::signal;
use tracing::Level;

use std::path::PathBuf;
use std::process::exit;

/// Progress events per candidate in `--verbose` mode.
const VERBOSE_PROGRESS_EVERY: u64 = 100;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
/// CLI arguments supported by pdf-brute.
struct Cli {
    /// Path to the encrypted PDF file
    #[arg(value_name = "PDF", required_unless_present = "show_available_libraries")]
    target: Option<PathBuf>,

    /// Minimum password length
    #[arg(long = "min-length", default_value_t = DEFAULT_MIN_LENGTH)]
    min_length: usize,

    /// Maximum password length
    #[arg(long = "max-length", default_value_t = DEFAULT_MAX_LENGTH)]
    max_length: usize,

    /// Character set: digits, lowercase, uppercase, letters, symbols, alphanum, all,
    /// or any combination of d (digits), l (lowercase), u (uppercase), s (symbols)
    #[arg(long = "charset", default_value = "digits")]
    charset: String,

    /// Resume strictly after this password
    #[arg(long = "start-from", value_name = "PASSWORD")]
    start_from: Option<String>,

    /// Verification library to use (see --show-available-libraries)
    #[arg(long = "library", value_name = "NAME")]
    library: Option<String>,

    /// Disable progress saving
    #[arg(long = "no-save-progress", action = ArgAction::SetTrue)]
    no_save_progress: bool,

    /// Custom progress file name
    #[arg(long = "progress-file", value_name = "PATH")]
    progress_file: Option<PathBuf>,

    /// Start from the beginning even if a matching progress file exists
    #[arg(long = "ignore-progress", action = ArgAction::SetTrue)]
    ignore_progress: bool,

    /// Show available libraries and exit
    #[arg(long = "show-available-libraries", action = ArgAction::SetTrue)]
    show_available_libraries: bool,

    /// Number of worker threads verifying candidates
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    threads: usize,

    /// Show more detailed progress
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    verbose: bool,
}

/// Entrypoint that validates flags, wires the search to the terminal, and
/// stops it cleanly on Ctrl-C.
#[tokio::main]
async fn main() {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let available = Backend::available();

    if args.show_available_libraries {
        println!("\nAvailable PDF libraries:");
        print_backends(&available);
        return;
    }

    let Some(target) = args.target.clone() else {
        eprintln!("Error: a PDF file is required.");
        exit(1);
    };

    if !target.exists() {
        eprintln!("Error: {}", Error::TargetNotFound(target));
        exit(1);
    }

    let backend = match args.library.as_deref() {
        None => available.first().copied().unwrap_or_default(),
        Some(name) => match name.parse::<Backend>() {
            Ok(backend) if available.contains(&backend) => backend,
            _ => {
                eprintln!("Error: Invalid library '{}'. Available libraries:", name);
                print_backends(&available);
                exit(1);
            }
        },
    };

    let charset = Charset::parse(&args.charset);

    let mut config = SearchConfig::new(&target);
    config.min_length = args.min_length;
    config.max_length = args.max_length;
    config.alphabet = charset.alphabet();
    config.resume_from = args.start_from.clone().filter(|s| !s.is_empty());
    config.backend = backend;
    config.progress_every = if args.verbose {
        VERBOSE_PROGRESS_EVERY
    } else {
        DEFAULT_PROGRESS_EVERY
    };
    if args.no_save_progress {
        config.checkpoint_file = None;
    } else if let Some(path) = &args.progress_file {
        config.checkpoint_file = Some(path.clone());
    }
    config.auto_resume = !args.ignore_progress;
    config.threads = args.threads;

    println!("PDF: {}", target.display());
    println!("Min length: {}", config.min_length);
    println!("Max length: {}", config.max_length);
    println!("Character set: {}", charset.describe());

    let oracle = config.backend.oracle(&target);
    let controller = match SearchController::new(config, oracle) {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(1);
        }
    };

    let total = controller.total();
    println!("Total possible combinations: {}", group_thousands(total));

    let progress = ProgressBar::new(u64::try_from(total).unwrap_or(u64::MAX));
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} {percent:>3}% [{wide_bar:.cyan/blue}] {msg}",
        )
        .expect("valid progress template"),
    );

    let bar = progress.clone();
    let mut controller = controller.with_sink(move |event: &Progress| {
        bar.set_position(u64::try_from(event.position).unwrap_or(u64::MAX));
        bar.set_message(format!(
            "{} | {:.1}/sec | eta {}",
            event.current,
            event.rate.unwrap_or(0.0),
            event.estimate
        ));
    });
    let cancel = controller.cancel_token();

    println!("\nStarting brute force attack...");
    println!("Press Ctrl+C to stop at any time (progress will be saved)");

    let mut search = tokio::task::spawn_blocking(move || controller.run());
    let joined = tokio::select! {
        joined = &mut search => joined,
        Ok(()) = signal::ctrl_c() => {
            progress.println("Stopping, saving progress...");
            cancel.cancel();
            search.await
        }
    };

    progress.finish_and_clear();

    let report = match joined {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Search task failed: {}", e);
            exit(3);
        }
    };

    match report.outcome {
        Outcome::Found(password) => {
            println!("Password found: {}", password);
            println!("Attempts: {}", group_thousands(report.tried as u128));
            println!("Elapsed: {:.2?}", report.elapsed);
        }
        Outcome::Exhausted => {
            println!("Password not found in provided search space.");
            println!("Attempts: {}", group_thousands(report.tried as u128));
            println!("Elapsed: {:.2?}", report.elapsed);
        }
        Outcome::Stopped => {
            println!("Brute force attack interrupted by user.");
            println!("Elapsed: {:.2?}", report.elapsed);
            exit(130);
        }
        Outcome::Failed(reason) => {
            eprintln!("Error during brute force: {}", reason);
            println!("Elapsed: {:.2?}", report.elapsed);
            exit(3);
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn print_backends(backends: &[Backend]) {
    for backend in backends {
        println!("  {}: {}", backend, backend.description());
    }
}
