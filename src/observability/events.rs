//! Observable relay events
//!
//! Events are explicit and typed; the log line carries `as_str()`.

use std::fmt;

/// Observable events in the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Startup begins
    BootStart,
    /// Configuration loaded
    ConfigLoaded,
    /// Listener bound, accepting connections
    Listening,
    /// Shutdown initiated
    ShutdownStart,
    /// Shutdown complete
    ShutdownComplete,
    /// Listener failed to bind (FATAL)
    BindFailed,

    // Connections
    /// WebSocket handshake completed, history replayed
    ConnectionOpened,
    /// Connection cleaned up
    ConnectionClosed,
    /// WebSocket handshake failed
    HandshakeFailed,
    /// Accepting a TCP connection failed
    AcceptFailed,
    /// Writing to a connection failed
    SendFailed,

    // Messages
    /// Inbound message received
    MessageReceived,
    /// Inbound message was not JSON
    MessageMalformed,
    /// Inbound message had no known type
    MessageIgnored,

    // History
    /// Item emitted and recorded
    ItemPublished,
    /// Both histories truncated
    HistoryCleared,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "RELAY_STARTUP_BEGIN",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::Listening => "RELAY_LISTENING",
            Event::ShutdownStart => "SHUTDOWN_START",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",
            Event::BindFailed => "BIND_FAILED",

            Event::ConnectionOpened => "CONNECTION_OPENED",
            Event::ConnectionClosed => "CONNECTION_CLOSED",
            Event::HandshakeFailed => "HANDSHAKE_FAILED",
            Event::AcceptFailed => "ACCEPT_FAILED",
            Event::SendFailed => "SEND_FAILED",

            Event::MessageReceived => "MESSAGE_RECEIVED",
            Event::MessageMalformed => "MESSAGE_MALFORMED",
            Event::MessageIgnored => "MESSAGE_IGNORED",

            Event::ItemPublished => "ITEM_PUBLISHED",
            Event::HistoryCleared => "HISTORY_CLEARED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::BindFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
