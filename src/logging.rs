//! Tracing setup for the `unfolder` binary.
//!
//! Diagnostics go to stderr; stdout only carries batch summaries and dry-run
//! plans. A primary instance may run with no terminal attached (started from
//! a file manager), so a configured log file receives the same events,
//! uncoloured, through a non-blocking writer.

use anyhow::Result;
use chrono::Local;
use std::fmt as stdfmt;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry, fmt as tsfmt, registry};
use unfolder::output as out;
use unfolder::platform::open_log_file_secure_append;
use unfolder::{LogLevel, default_log_path, path_has_symlink_ancestor};

type Filtered = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Filtered> + Send + Sync>;

/// DD/MM/YY HH:MM:SS in local time.
struct LocalHumanTime;

impl FormatTime for LocalHumanTime {
    fn format_time(&self, w: &mut tsfmt::format::Writer<'_>) -> stdfmt::Result {
        write!(w, "{}", Local::now().format("%d/%m/%y %H:%M:%S"))
    }
}

/// `normal` shows batch progress; each step up reveals one more level of
/// coordination detail.
fn level_filter(lvl: &LogLevel) -> EnvFilter {
    let level = match lvl {
        LogLevel::Quiet => LevelFilter::ERROR,
        LogLevel::Normal => LevelFilter::INFO,
        LogLevel::Info => LevelFilter::DEBUG,
        LogLevel::Debug => LevelFilter::TRACE,
    };
    EnvFilter::default().add_directive(level.into())
}

fn fmt_layer<W>(writer: W, json: bool, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tsfmt::layer().with_writer(writer).with_ansi(ansi);
    if json {
        layer
            .event_format(
                tsfmt::format()
                    .json()
                    .with_timer(LocalHumanTime)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .boxed()
    } else {
        layer
            .event_format(
                tsfmt::format()
                    .compact()
                    .with_timer(LocalHumanTime)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .boxed()
    }
}

/// Log file writer, or None (with a reason on stderr) when the path has a
/// symlinked ancestor or cannot be opened.
fn open_file_writer(path: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    match path_has_symlink_ancestor(path) {
        Ok(false) => {}
        Ok(true) => {
            out::print_warn(&format!("an ancestor of log file {} is a symlink", path.display()));
            return None;
        }
        Err(e) => {
            out::print_warn(&format!("could not inspect log path {}: {e}", path.display()));
            return None;
        }
    }
    match open_log_file_secure_append(path) {
        Ok(file) => Some(tracing_appender::non_blocking(file)),
        Err(e) => {
            out::print_warn(&format!("could not open log file {}: {e}", path.display()));
            None
        }
    }
}

/// Install the global subscriber. The returned guard flushes the log file
/// when dropped, so it must live until the last batch has been reported.
pub fn init_tracing(
    lvl: &LogLevel,
    log_file: Option<&Path>,
    json: bool,
) -> Result<Option<WorkerGuard>> {
    let mut layers = vec![fmt_layer(std::io::stderr, json, atty::is(atty::Stream::Stderr))];
    let mut guard = None;

    if let Some(path) = log_file {
        match open_file_writer(path) {
            Some((writer, g)) => {
                layers.push(fmt_layer(writer, json, false));
                guard = Some(g);
            }
            None => {
                out::print_warn(&format!(
                    "File logging to '{}' is disabled for this run.",
                    path.display()
                ));
                if let Some(def) = default_log_path() {
                    out::print_info(&format!("The default log path is: {}", def.display()));
                }
            }
        }
    }

    registry().with(level_filter(lvl)).with(layers).try_init()?;
    Ok(guard)
}
