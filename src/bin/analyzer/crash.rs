//! Sentry crash reporting, enabled by `SENTRY_DSN`

use std::time::Duration;

use sentry::types::Dsn;
use sentry::ClientInitGuard;
use sentry_tracing::{EventFilter, SentryLayer};
use tracing::Level;
use tracing_subscriber::registry::LookupSpan;

use crate::style::print_warning;

/// How long a fatal report may take to leave before the process exits
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Starts the Sentry client; `None` when no usable DSN is configured.
/// The guard must live until exit.
pub fn init(dsn: Option<&str>) -> Option<ClientInitGuard> {
    let dsn = dsn.map(str::trim).filter(|d| !d.is_empty())?;
    let dsn: Dsn = match dsn.parse() {
        Ok(dsn) => dsn,
        Err(e) => {
            print_warning(&format!("Ignoring invalid SENTRY_DSN: {}", e));
            return None;
        }
    };
    let guard = sentry::init(sentry::ClientOptions {
        dsn: Some(dsn),
        release: sentry::release_name!(),
        traces_sample_rate: 0.0,
        send_default_pii: false,
        ..Default::default()
    });
    guard.is_enabled().then_some(guard)
}

/// Warnings and errors become breadcrumbs on the next reported event
pub fn tracing_layer<S>() -> SentryLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    sentry_tracing::layer().event_filter(|metadata| breadcrumb_filter(metadata.level()))
}

fn breadcrumb_filter(level: &Level) -> EventFilter {
    match *level {
        Level::ERROR | Level::WARN => EventFilter::Breadcrumb,
        _ => EventFilter::Ignore,
    }
}

/// Sends the error that ended the run and waits for delivery
pub fn report_fatal(guard: &ClientInitGuard, message: &str) {
    sentry::capture_message(message, sentry::Level::Fatal);
    if !guard.flush(Some(FLUSH_TIMEOUT)) {
        tracing::warn!("Crash report was not delivered within {:?}", FLUSH_TIMEOUT);
    }
}
