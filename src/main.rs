use anyhow::Context;
use clap::Parser;
use simsync::commands::sync::{self, format_summary};
use simsync::config::Cli;
use simsync::executor::{EventCallback, SyncEvent};
use simsync::ui::ProgressReporter;
use simsync::Config;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let summary_json = cli.summary_json.clone();
    // Verbose logs on stderr and a spinner on stderr do not mix.
    let show_progress = cli.verbose == 0 || cli.log_file.is_some();

    // Convert CLI args to Config - this validates immediately
    let config = Config::try_from(cli)?;

    let reporter = Arc::new(if show_progress {
        ProgressReporter::new()
    } else {
        ProgressReporter::hidden()
    });
    let on_event: Arc<EventCallback> = {
        let reporter = Arc::clone(&reporter);
        Arc::new(move |event: &SyncEvent| reporter.handle_event(event))
    };

    let result = sync::run(&config, Some(on_event));
    reporter.finish();
    let report = result.context("sync aborted")?;

    println!("{}", format_summary(&report));

    if let Some(path) = summary_json {
        let json = serde_json::to_string_pretty(&report).context("cannot serialize summary")?;
        fs::write(&path, json)
            .with_context(|| format!("cannot write summary to {}", path.display()))?;
    }

    Ok(())
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> anyhow::Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_thread_ids(true)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
    }

    Ok(())
}
