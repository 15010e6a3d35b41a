//! # Connection Lifecycle
//!
//! `Connecting -> Open -> Closed`.
//!
//! Inbound messages are only processed while `Open`. Close and error signals
//! share one cleanup path; once `Closed`, further signals are ignored, so
//! cleanup happens exactly once. Dropping an unclosed connection also runs
//! cleanup.

use std::fmt;
use std::sync::Arc;

use super::errors::{RelayError, RelayResult};
use super::hub::{FanoutResult, ItemSender, SubscriptionToken};
use super::message::{decode, Inbound};
use super::state::RelayState;
use crate::observability::{log_event_at, log_event_with_fields, Event, Severity};

/// Lifecycle state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake done, not yet joined
    Connecting,
    /// Joined; receives replay and live items
    Open,
    /// Subscriptions removed
    Closed,
}

/// Why a connection closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Client sent a close frame
    ClientClosed,
    /// Stream ended without a close frame
    StreamEnded,
    /// Receiving failed
    TransportError(String),
    /// Writing to the client failed
    SendFailed(String),
    /// Connection dropped without an explicit close
    Dropped,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::ClientClosed => write!(f, "client_closed"),
            CloseReason::StreamEnded => write!(f, "stream_ended"),
            CloseReason::TransportError(e) => write!(f, "transport_error: {}", e),
            CloseReason::SendFailed(e) => write!(f, "send_failed: {}", e),
            CloseReason::Dropped => write!(f, "dropped"),
        }
    }
}

/// Outcome of handling one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    /// Item emitted and recorded
    Published(FanoutResult),
    /// Histories truncated
    Cleared { dropped: usize },
    /// Valid JSON with no known type
    Ignored,
    /// Not JSON; dropped
    Malformed,
    /// Connection not open; nothing done
    NotOpen,
}

/// One connected client
#[derive(Debug)]
pub struct Connection {
    id: String,
    state: ConnectionState,
    tokens: Vec<SubscriptionToken>,
    relay: Arc<RelayState>,
    peer: Option<String>,
    log_messages: bool,
}

impl Connection {
    /// Create a connection in `Connecting`
    pub fn new(id: impl Into<String>, relay: Arc<RelayState>) -> Self {
        Self {
            id: id.into(),
            state: ConnectionState::Connecting,
            tokens: Vec::new(),
            relay,
            peer: None,
            log_messages: true,
        }
    }

    /// Remote address, included in lifecycle logs
    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = Some(peer.into());
        self
    }

    /// Toggle per-message TRACE logging
    pub fn with_message_logging(mut self, enabled: bool) -> Self {
        self.log_messages = enabled;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Replay history onto `sender` and subscribe it to every kind.
    ///
    /// Returns the number of replayed items.
    pub fn open(&mut self, sender: ItemSender) -> RelayResult<usize> {
        if self.state != ConnectionState::Connecting {
            return Err(RelayError::Internal(format!(
                "Connection {} cannot open from {:?}",
                self.id, self.state
            )));
        }

        let joined = self.relay.join(sender);
        self.tokens = joined.tokens;
        self.state = ConnectionState::Open;
        self.relay.metrics().increment_connections_opened();

        log_event_with_fields(
            Event::ConnectionOpened,
            &[
                ("connection_id", self.id.as_str()),
                ("peer", self.peer.as_deref().unwrap_or("")),
                ("replayed", joined.replayed.to_string().as_str()),
            ],
        );

        Ok(joined.replayed)
    }

    /// Handle one inbound text frame
    pub fn handle_text(&self, text: &str) -> Handled {
        if self.state != ConnectionState::Open {
            return Handled::NotOpen;
        }

        if self.log_messages {
            log_event_at(
                Severity::Trace,
                Event::MessageReceived,
                &[("connection_id", self.id.as_str()), ("text", text)],
            );
        }

        match decode(text) {
            Ok(Inbound::Publish(item)) => {
                let kind = item.kind;
                let result = self.relay.publish(item);
                log_event_at(
                    Severity::Trace,
                    Event::ItemPublished,
                    &[
                        ("connection_id", self.id.as_str()),
                        ("delivered", result.delivered.to_string().as_str()),
                        ("kind", kind.to_string().as_str()),
                    ],
                );
                Handled::Published(result)
            }
            Ok(Inbound::Clear) => {
                let dropped = self.relay.clear();
                log_event_with_fields(
                    Event::HistoryCleared,
                    &[
                        ("connection_id", self.id.as_str()),
                        ("dropped", dropped.to_string().as_str()),
                    ],
                );
                Handled::Cleared { dropped }
            }
            Ok(Inbound::Ignored { tag }) => {
                self.relay.metrics().increment_ignored();
                log_event_at(
                    Severity::Trace,
                    Event::MessageIgnored,
                    &[
                        ("connection_id", self.id.as_str()),
                        ("type", tag.as_deref().unwrap_or("")),
                    ],
                );
                Handled::Ignored
            }
            Err(e) => {
                self.report_malformed(e.to_string().as_str());
                Handled::Malformed
            }
        }
    }

    /// Record a frame that could not be read as text
    pub fn report_malformed(&self, error: &str) {
        self.relay.metrics().increment_malformed();
        log_event_at(
            Severity::Warn,
            Event::MessageMalformed,
            &[("connection_id", self.id.as_str()), ("error", error)],
        );
    }

    /// Remove this connection's subscriptions.
    ///
    /// Returns true if this call performed the cleanup, false if the
    /// connection was already closed.
    pub fn close(&mut self, reason: &CloseReason) -> bool {
        if self.state == ConnectionState::Closed {
            return false;
        }

        let was_open = self.state == ConnectionState::Open;
        let removed = self.relay.leave(&self.tokens);
        self.tokens.clear();
        self.state = ConnectionState::Closed;

        if was_open {
            self.relay.metrics().increment_connections_closed();
            log_event_with_fields(
                Event::ConnectionClosed,
                &[
                    ("connection_id", self.id.as_str()),
                    (
                        "open_connections",
                        self.relay.metrics().open_connections().to_string().as_str(),
                    ),
                    ("reason", reason.to_string().as_str()),
                    ("unsubscribed", removed.to_string().as_str()),
                ],
            );
        }

        true
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close(&CloseReason::Dropped);
    }
}
