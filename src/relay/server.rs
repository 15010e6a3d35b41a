//! # WebSocket Relay Server
//!
//! Accepts WebSocket connections, replays history to each new connection and
//! relays inbound items to every open connection.
//!
//! Each connection runs as two tasks: a reader that decodes inbound frames
//! and drives the [`Connection`], and a writer that drains the connection's
//! outbound queue into the socket. Fan-out only enqueues, so a stalled
//! client never delays other clients or the next inbound message.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use uuid::Uuid;

use super::connection::{CloseReason, Connection};
use super::errors::{RelayError, RelayResult};
use super::hub::ItemReceiver;
use super::message::encode;
use super::state::RelayState;
use crate::observability::{log_event_at, log_event_with_fields, Event, Severity};

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9998";

/// Relay server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Log every inbound message at TRACE
    #[serde(default = "default_log_messages")]
    pub log_messages: bool,
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_log_messages() -> bool {
    true
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            log_messages: default_log_messages(),
        }
    }
}

impl RelayConfig {
    /// Parse the bind address
    pub fn socket_addr(&self) -> RelayResult<SocketAddr> {
        self.bind_addr
            .parse()
            .map_err(|e| RelayError::ConfigError(format!("Invalid bind address: {}", e)))
    }
}

/// Stops a running server's accept loop
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Stop accepting connections. Already open connections are left alone.
    /// The flag is stored even when `run` has not subscribed yet.
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }
}

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// WebSocket relay server
pub struct RelayServer {
    config: RelayConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Arc<RelayState>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl RelayServer {
    /// Bind the listener. Port 0 picks a free port.
    pub async fn bind(config: RelayConfig) -> RelayResult<Self> {
        let addr = config.socket_addr()?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RelayError::BindFailed(format!("{}: {}", addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| RelayError::BindFailed(format!("{}: {}", addr, e)))?;

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            listener,
            local_addr,
            state: Arc::new(RelayState::new()),
            shutdown_tx: Arc::new(shutdown_tx),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared relay state
    pub fn state(&self) -> Arc<RelayState> {
        Arc::clone(&self.state)
    }

    /// Handle for stopping `run`
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Accept connections until shutdown
    pub async fn run(&self) -> RelayResult<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        log_event_with_fields(
            Event::Listening,
            &[("addr", self.local_addr.to_string().as_str())],
        );

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            let state = Arc::clone(&self.state);
                            let log_messages = self.config.log_messages;

                            tokio::spawn(async move {
                                if let Err(e) =
                                    Self::handle_connection(stream, peer_addr, state, log_messages).await
                                {
                                    log_event_at(
                                        Severity::Warn,
                                        Event::HandshakeFailed,
                                        &[
                                            ("error", e.to_string().as_str()),
                                            ("peer", peer_addr.to_string().as_str()),
                                        ],
                                    );
                                }
                            });
                        }
                        Err(e) => {
                            log_event_at(
                                Severity::Error,
                                Event::AcceptFailed,
                                &[("error", e.to_string().as_str())],
                            );
                        }
                    }
                }

                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Handle a single WebSocket connection
    async fn handle_connection(
        stream: TcpStream,
        peer_addr: SocketAddr,
        state: Arc<RelayState>,
        log_messages: bool,
    ) -> RelayResult<()> {
        let ws_stream = accept_async(stream).await.map_err(|e| {
            RelayError::ConnectionError(format!("WebSocket handshake failed: {}", e))
        })?;

        let (ws_sender, mut ws_receiver) = ws_stream.split();

        let connection_id = Uuid::new_v4().to_string();
        let (item_tx, item_rx) = mpsc::unbounded_channel();

        let mut connection = Connection::new(connection_id.clone(), state)
            .with_peer(peer_addr.to_string())
            .with_message_logging(log_messages);
        connection.open(item_tx)?;

        let mut writer = tokio::spawn(Self::write_loop(ws_sender, item_rx, connection_id));

        // tungstenite queues and flushes Pong replies itself while reading.
        let reason = loop {
            tokio::select! {
                msg = ws_receiver.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            connection.handle_text(&text);
                        }
                        Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                            Ok(text) => {
                                connection.handle_text(&text);
                            }
                            Err(e) => connection.report_malformed(&e.to_string()),
                        },
                        Some(Ok(Message::Close(_))) => break CloseReason::ClientClosed,
                        None => break CloseReason::StreamEnded,
                        Some(Err(e)) => break CloseReason::TransportError(e.to_string()),
                        Some(Ok(_)) => {}
                    }
                }

                written = &mut writer => {
                    break match written {
                        Ok(Ok(())) => CloseReason::StreamEnded,
                        Ok(Err(e)) => CloseReason::SendFailed(e.to_string()),
                        Err(e) => CloseReason::SendFailed(e.to_string()),
                    };
                }
            }
        };

        // Dropping the subscriptions drops every sender, so the writer
        // drains what is already queued and then exits on its own.
        connection.close(&reason);
        Ok(())
    }

    /// Drain a connection's outbound queue into its socket
    async fn write_loop(
        mut sink: WsSink,
        mut items: ItemReceiver,
        connection_id: String,
    ) -> RelayResult<()> {
        while let Some(item) = items.recv().await {
            let json = match encode(&item) {
                Ok(json) => json,
                Err(e) => {
                    log_event_at(
                        Severity::Error,
                        Event::SendFailed,
                        &[
                            ("connection_id", connection_id.as_str()),
                            ("error", e.to_string().as_str()),
                        ],
                    );
                    continue;
                }
            };

            if let Err(e) = sink.send(Message::Text(json)).await {
                log_event_at(
                    Severity::Warn,
                    Event::SendFailed,
                    &[
                        ("connection_id", connection_id.as_str()),
                        ("error", e.to_string().as_str()),
                    ],
                );
                return Err(RelayError::ConnectionError(e.to_string()));
            }
        }

        let _ = sink.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = RelayConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:9998");
        assert!(config.log_messages);
    }

    #[test]
    fn test_config_partial_json() {
        let config: RelayConfig = serde_json::from_str(r#"{"log_messages": false}"#).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert!(!config.log_messages);
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        let result = serde_json::from_str::<RelayConfig>(r#"{"port": 1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_bind_addr() {
        let config = RelayConfig {
            bind_addr: "not an address".to_string(),
            ..RelayConfig::default()
        };
        assert!(matches!(config.socket_addr(), Err(RelayError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let config = RelayConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            log_messages: false,
        };
        let server = RelayServer::bind(config).await.unwrap();
        assert_ne!(server.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_before_run_returns() {
        let config = RelayConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            log_messages: false,
        };
        let server = RelayServer::bind(config).await.unwrap();
        server.shutdown_handle().shutdown();

        tokio::time::timeout(std::time::Duration::from_secs(2), server.run())
            .await
            .expect("run did not return after an early shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_while_running() {
        let config = RelayConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            log_messages: false,
        };
        let server = RelayServer::bind(config).await.unwrap();
        let shutdown = server.shutdown_handle();
        let task = tokio::spawn(async move { server.run().await });

        tokio::task::yield_now().await;
        shutdown.shutdown();

        tokio::time::timeout(std::time::Duration::from_secs(2), task)
            .await
            .expect("run did not return after shutdown")
            .unwrap()
            .unwrap();
    }
}
