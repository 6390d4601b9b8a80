#![forbid(unsafe_code)]

use std::io::{self, BufWriter, IsTerminal};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lsgrid::cli::Args;
use lsgrid::collate::LocaleCollator;
use lsgrid::config::Environment;
use lsgrid::diag::{Diagnostics, ExitStatus};
use lsgrid::listing::Session;
use lsgrid::signals::SignalGuard;
use lsgrid::source::HostFs;

fn main() {
    init_tracing();
    match run_app() {
        Ok(status) => std::process::exit(status.code()),
        Err(e) => {
            eprintln!("lsgrid: {e:#}");
            std::process::exit(ExitStatus::Serious.code());
        }
    }
}

/// Debug tracing goes to stderr and is off unless `LSGRID_LOG` asks for it.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("LSGRID_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run_app() -> Result<ExitStatus> {
    let args = Args::parse().validated();

    let stdout_tty = io::stdout().is_terminal();
    let env = Environment::capture(stdout_tty);
    let mut diag = Diagnostics::stderr();
    let opts = args.options(&env, stdout_tty, &mut diag)?;
    tracing::debug!(
        format = ?opts.format,
        sort = ?opts.sort,
        width = opts.line_length,
        "resolved options"
    );

    // Colour escapes must be reset before a signal takes effect.
    let signals = if opts.color.is_some() && stdout_tty {
        Some(SignalGuard::install().context("failed to install signal handlers")?)
    } else {
        None
    };

    let fs = HostFs::new();
    let collator = LocaleCollator::from_env();
    let stdout = io::stdout();
    let out = BufWriter::new(stdout.lock());

    match Session::new(opts, &fs, &collator, diag, out)
        .with_signals(signals)
        .run(&args.paths)
    {
        Ok((status, _)) => Ok(status),
        // Reader went away, e.g. `lsgrid | head`.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(ExitStatus::Serious),
        Err(e) => Err(e).context("write error"),
    }
}
