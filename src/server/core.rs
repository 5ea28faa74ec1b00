//! Broadcast server.
//!
//! Accepts WebSocket clients on one port and relays every text frame
//! to every connected client as `"{name}: {text}"`. An `exchange` command
//! is answered with a rates report instead, relayed the same way.
//!
//! # Connection Lifecycle
//!
//! 1. `BroadcastServer::bind` - Bind listener, spawn accept loop
//! 2. Accept loop upgrades each TCP connection to WebSocket
//! 3. Session registers the peer in the hub under a fresh name
//! 4. Inbound text is logged, `exchange` commands are resolved, and the
//!    result is fanned out through the hub
//! 5. `BroadcastServer::shutdown` - Stop accepting, close every session

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::accept_async_with_config;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::channel::Limits;
use crate::error::{Error, Result};
use crate::identifiers::ClientId;

use super::exchange::{DEFAULT_RATES_URL, ExchangeRequest, RatesClient, render};
use super::hub::Hub;

// ============================================================================
// Constants
// ============================================================================

/// Default bind address (localhost, OS-assigned port).
const DEFAULT_BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);

// ============================================================================
// ServerConfig
// ============================================================================

/// Broadcast server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on. Port 0 lets the OS choose.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Transport limits for accepted connections.
    #[serde(flatten)]
    pub limits: Limits,

    /// Endpoint queried by the `exchange` command.
    #[serde(default = "default_rates_url")]
    pub rates_url: String,
}

fn default_bind() -> SocketAddr {
    DEFAULT_BIND
}

fn default_rates_url() -> String {
    DEFAULT_RATES_URL.to_owned()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND,
            limits: Limits::default(),
            rates_url: default_rates_url(),
        }
    }
}

impl ServerConfig {
    /// Creates a configuration listening on `bind`.
    #[inline]
    #[must_use]
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            ..Self::default()
        }
    }

    /// Sets the endpoint queried by the `exchange` command.
    #[inline]
    #[must_use]
    pub fn with_rates_url(mut self, url: impl Into<String>) -> Self {
        self.rates_url = url.into();
        self
    }

    /// Loads a configuration from JSON.
    ///
    /// ```json
    /// { "bind": "127.0.0.1:8080", "max_message_size": 65536 }
    /// ```
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the document does not parse
    /// - [`Error::Config`] if the limits or the rates URL are invalid
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the limits and the rates URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.limits.validate()?;
        Url::parse(&self.rates_url).map_err(|e| {
            Error::config(format!("Invalid rates URL '{}': {e}", self.rates_url))
        })?;
        Ok(())
    }
}

// ============================================================================
// BroadcastServer
// ============================================================================

/// WebSocket endpoint that relays every message to every client.
///
/// The accept loop holds a reference to the server, so it keeps running
/// until [`shutdown`](Self::shutdown) is called.
pub struct BroadcastServer {
    /// Bound listener address.
    local_addr: SocketAddr,
    /// Connected peers.
    hub: Hub,
    /// Client for `exchange` lookups.
    rates: RatesClient,
    /// Transport settings for accepted connections.
    ws_config: WebSocketConfig,
    /// Flips to `true` once on shutdown.
    shutdown_tx: watch::Sender<bool>,
}

// ============================================================================
// BroadcastServer - Constructor
// ============================================================================

impl BroadcastServer {
    /// Binds the listener and starts the accept loop.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the limits or the rates URL are invalid
    /// - [`Error::Http`] if the HTTP client cannot be built
    /// - [`Error::Io`] if binding fails
    pub async fn bind(config: ServerConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let rates = RatesClient::new(&config.rates_url)?;

        let listener = TcpListener::bind(config.bind).await?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, "Broadcast server bound");

        let (shutdown_tx, _) = watch::channel(false);
        let server = Arc::new(Self {
            local_addr,
            hub: Hub::new(),
            rates,
            ws_config: config.limits.to_websocket_config(),
            shutdown_tx,
        });

        tokio::spawn(Arc::clone(&server).accept_loop(listener));

        info!(%local_addr, "Broadcast server started");

        Ok(server)
    }
}

// ============================================================================
// BroadcastServer - Public API
// ============================================================================

impl BroadcastServer {
    /// Returns the WebSocket URL for this server.
    ///
    /// Format: `ws://{ip}:{port}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Returns the bound address.
    #[inline]
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the bound port.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the number of connected clients.
    #[inline]
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.hub.len()
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    #[inline]
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Stops accepting and closes every session. Idempotent.
    pub fn shutdown(&self) {
        if self.shutdown_tx.send_replace(true) {
            return;
        }
        info!(local_addr = %self.local_addr, "Broadcast server shutting down");
    }
}

// ============================================================================
// BroadcastServer - Accept Loop
// ============================================================================

impl BroadcastServer {
    /// Background task that accepts new connections.
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        debug!("Accept loop started");
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            if *shutdown_rx.borrow_and_update() {
                break;
            }

            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let server = Arc::clone(&self);
                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, addr).await {
                                    warn!(error = %e, %addr, "Connection handling failed");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Accept failed");
                        }
                    }
                }

                _ = shutdown_rx.changed() => {}
            }
        }

        debug!("Accept loop terminated");
    }

    /// Runs one client session until either side closes.
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        debug!(%addr, "New TCP connection");

        let ws_stream = accept_async_with_config(stream, Some(self.ws_config)).await?;

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let (mut ws_write, mut ws_read) = ws_stream.split();

        if *shutdown_rx.borrow_and_update() {
            let _ = ws_write.close().await;
            return Ok(());
        }

        let id = ClientId::generate();
        let name = id.display_name();
        let mut outbound_rx = self.hub.register(id, name.clone());

        info!(%addr, client = %name, "Client connected");

        let result = loop {
            tokio::select! {
                // Incoming frames from the client
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            let text = text.as_str();
                            info!(client = %name, message = %text, "Message received");

                            let body = match ExchangeRequest::from_command(text) {
                                Some(request) => {
                                    debug!(client = %name, days = request.days, "Exchange requested");
                                    render(&self.rates.fetch(&request).await)
                                }
                                None => text.to_owned(),
                            };
                            self.hub.broadcast(&format!("{name}: {body}"));
                        }

                        Some(Ok(Message::Close(_))) | None => {
                            // Flushes the queued close reply.
                            let _ = ws_write.close().await;
                            break Ok(());
                        }

                        Some(Err(e)) => {
                            break Err(e.into());
                        }

                        // Binary, Ping, Pong
                        Some(Ok(_)) => {}
                    }
                }

                // Relayed text for this client
                outbound = outbound_rx.recv() => {
                    match outbound {
                        Some(text) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                break Err(e.into());
                            }
                        }
                        None => {
                            let _ = ws_write.close().await;
                            break Ok(());
                        }
                    }
                }

                _ = shutdown_rx.changed() => {
                    let _ = ws_write.close().await;
                    break Ok(());
                }
            }
        };

        self.hub.unregister(id);
        info!(%addr, client = %name, "Client disconnected");

        result
    }
}

// ============================================================================
// Tests
// ============================================================================
