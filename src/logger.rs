use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use tracing::level_filters::LevelFilter;
use tracing::{Dispatch, Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

/// Log sink owned by the trading façade.
///
/// Holds its own `Dispatch` instead of installing a global subscriber, so
/// several loggers can coexist and the file is flushed when the last clone
/// is dropped.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
    _guards: Arc<Vec<WorkerGuard>>,
}

impl Logger {
    /// Console (stderr) plus an append-only file at `path`.
    pub fn open(path: &Path, level: LevelFilter) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let (file_writer, file_guard) = tracing_appender::non_blocking(file);

        let subscriber = tracing_subscriber::registry()
            .with(level)
            .with(
                tracing_subscriber::fmt::layer()
                    .event_format(LineFormat)
                    .with_ansi(false)
                    .with_writer(file_writer),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .event_format(LineFormat)
                    .with_writer(io::stderr),
            );

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            _guards: Arc::new(vec![file_guard]),
        })
    }

    /// Wraps an already assembled dispatcher, e.g. one with a capturing layer.
    pub fn from_dispatch(dispatch: Dispatch) -> Self {
        Self {
            dispatch,
            _guards: Arc::new(Vec::new()),
        }
    }

    pub fn info(&self, message: impl fmt::Display) {
        tracing::dispatcher::with_default(&self.dispatch, || tracing::info!("{}", message));
    }

    pub fn error(&self, message: impl fmt::Display) {
        tracing::dispatcher::with_default(&self.dispatch, || tracing::error!("{}", message));
    }
}

/// `2024-05-01 12:00:00,123 - INFO - message`
struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "{} - {} - ",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
