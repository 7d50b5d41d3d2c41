use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{MobileNumber, SendSms};

/// Environment variable that turns on request echo in log lines when set to a truthy value.
pub const DEBUG_ENV: &str = "MENGWANG_DEBUG";

const ECHO_CONTENT_CHARS: usize = 64;
const ECHO_MOBILES_CHARS: usize = 128;

#[derive(Clone)]
/// Receives one formatted line per client event.
///
/// The sink is called synchronously and must not block. Every line is also emitted as a
/// `tracing` event under the `mengwang` target.
pub struct LogSink(Arc<dyn Fn(&str) + Send + Sync>);

impl LogSink {
    pub fn new(sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self(Arc::new(sink))
    }

    pub fn noop() -> Self {
        Self::new(|_| {})
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LogSink")
    }
}

pub(crate) fn debug_from_env() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| {
            let value = value.trim();
            !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
        })
        .unwrap_or(false)
}

#[derive(Debug, Clone, Default)]
pub(crate) struct GatewayLog {
    sink: LogSink,
    debug: bool,
}

impl GatewayLog {
    pub(crate) fn new(sink: LogSink, debug: bool) -> Self {
        Self { sink, debug }
    }

    pub(crate) fn debug_enabled(&self) -> bool {
        self.debug
    }

    pub(crate) fn info(&self, message: &str) {
        tracing::debug!(target: "mengwang", "{message}");
        (self.sink.0)(message);
    }

    pub(crate) fn warn(&self, message: &str) {
        tracing::warn!(target: "mengwang", "{message}");
        (self.sink.0)(message);
    }

    pub(crate) fn elapsed(&self, operation: &'static str, elapsed: Duration, echo: &str) {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(target: "mengwang", operation, elapsed_ms, "gateway call complete");
        (self.sink.0)(&format!(
            "{operation} complete. elapsedTime[{elapsed_ms}]{echo}"
        ));
    }

    /// Request summary appended to log lines; empty unless debug is on.
    pub(crate) fn echo_request(&self, request: &SendSms) -> String {
        if !self.debug {
            return String::new();
        }
        let mobiles = request
            .mobiles()
            .iter()
            .map(MobileNumber::raw)
            .collect::<Vec<_>>()
            .join(",");
        format!(
            " mobile[{}] content[{}]",
            truncate(&mobiles, ECHO_MOBILES_CHARS),
            truncate(request.content().as_str(), ECHO_CONTENT_CHARS)
        )
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &value[..idx]),
        None => value.to_owned(),
    }
}
