//! Observability for the relay
//!
//! - Structured logging (one JSON object per line)
//! - Typed lifecycle events
//! - Monotonic relay counters
//!
//! Observability is read-only: a logging failure never affects relaying.
//!
//! # Usage
//!
//! ```ignore
//! use islandrelay::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::ConnectionOpened, &[("connection_id", "c1")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, RelayMetrics};

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

/// Log an event at an explicit severity
pub fn log_event_at(severity: Severity, event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        // This just verifies no panic
        log_event(Event::BootStart);
        log_event(Event::ShutdownComplete);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::Listening, &[("addr", "127.0.0.1:9998")]);
        log_event_at(Severity::Warn, Event::MessageMalformed, &[("error", "eof")]);
    }
}
