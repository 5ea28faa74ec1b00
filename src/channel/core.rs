//! Message channel and its connection task.
//!
//! A [`MessageChannel`] owns one WebSocket connection. Opening spawns a
//! tokio task that performs the handshake and then runs the event loop:
//!
//! - Inbound text frames become [`InboundEvent`]s, in arrival order
//! - Outbound text is handed over through an unbounded command queue
//! - Lifecycle transitions are published to every [`LifecycleEvents`]
//!
//! Inbound text is untrusted data. It is delivered verbatim and must not
//! be interpreted as markup unless the caller deliberately opts into that.

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use futures_util::{SinkExt, Stream, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};

use super::address::Address;
use super::config::{ChannelBuilder, ChannelConfig};
use super::state::{Fault, Lifecycle, LifecycleEvents, LifecycleState};

// ============================================================================
// Types
// ============================================================================

type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Internal commands for the event loop.
enum ChannelCommand {
    /// Write one text frame.
    Send(String),
    /// Close the connection.
    Shutdown,
}

/// How the event loop ended.
enum LoopExit {
    /// Either side closed cleanly.
    Closed,
    /// Transport failed.
    Dropped(String),
}

// ============================================================================
// InboundEvent
// ============================================================================

/// One text frame received from the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    seq: u64,
    text: String,
}

impl InboundEvent {
    /// Zero-based arrival position on this connection.
    #[inline]
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    /// Frame payload, verbatim.
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consumes the event, returning the payload.
    #[inline]
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Lazy sequence of inbound events.
///
/// Ends when the connection ends. Obtained once per channel through
/// [`MessageChannel::messages`].
#[derive(Debug)]
pub struct Messages {
    rx: mpsc::UnboundedReceiver<InboundEvent>,
}

impl Messages {
    /// Waits for the next inbound event.
    pub async fn next(&mut self) -> Option<InboundEvent> {
        self.rx.recv().await
    }
}

impl Stream for Messages {
    type Item = InboundEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ============================================================================
// MessageChannel
// ============================================================================

/// A single bidirectional text channel to a broadcast endpoint.
///
/// # Thread Safety
///
/// `MessageChannel` is `Send + Sync`; every method takes `&self` and none
/// of them block. Wrap it in an `Arc` to call [`close`](Self::close) from
/// inside a consumer of its own sequences.
///
/// Dropping the channel closes the connection gracefully.
pub struct MessageChannel {
    /// Target endpoint.
    address: Address,
    /// Lifecycle cell (shared with the connection task).
    lifecycle: Arc<Lifecycle>,
    /// Queue into the connection task.
    command_tx: mpsc::UnboundedSender<ChannelCommand>,
    /// Inbound sequence until taken.
    inbound: Mutex<Option<Messages>>,
    /// Set by the first `close()`.
    close_requested: AtomicBool,
}

impl MessageChannel {
    /// Creates a builder for a configured channel.
    #[inline]
    #[must_use]
    pub fn builder() -> ChannelBuilder {
        ChannelBuilder::new()
    }

    /// Begins connecting to `address` and returns immediately.
    ///
    /// The channel starts in [`LifecycleState::Connecting`]. Connection
    /// failures are reported through the lifecycle, not here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if `address` is not a `ws://` or
    /// `wss://` URI.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn open(address: &str) -> Result<Self> {
        let address = Address::parse(address)?;
        Ok(Self::open_with_config(ChannelConfig::new(address)))
    }

    /// Begins connecting with an explicit configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn open_with_config(config: ChannelConfig) -> Self {
        let lifecycle = Arc::new(Lifecycle::new());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let address = config.address.clone();
        debug!(%address, "Opening channel");

        tokio::spawn(Self::run_connection(
            config,
            Arc::clone(&lifecycle),
            command_rx,
            inbound_tx,
        ));

        Self {
            address,
            lifecycle,
            command_tx,
            inbound: Mutex::new(Some(Messages { rx: inbound_rx })),
            close_requested: AtomicBool::new(false),
        }
    }

    /// Returns the target address.
    #[inline]
    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Returns why the channel errored, if it did.
    #[inline]
    #[must_use]
    pub fn fault(&self) -> Option<Fault> {
        self.lifecycle.fault()
    }

    /// Submits `text` as one outbound frame.
    ///
    /// Delivery is best-effort and not acknowledged. Nothing is buffered:
    /// text rejected here is gone and must be re-submitted by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] unless the channel is open and
    /// [`close`](Self::close) has not been requested.
    pub fn send(&self, text: impl Into<String>) -> Result<()> {
        let state = self.lifecycle.state();
        if state != LifecycleState::Open || self.close_requested.load(Ordering::Acquire) {
            return Err(Error::not_ready(state));
        }

        self.command_tx
            .send(ChannelCommand::Send(text.into()))
            .map_err(|_| Error::not_ready(self.lifecycle.state()))?;

        trace!(address = %self.address, "Outbound frame queued");
        Ok(())
    }

    /// Takes the inbound sequence.
    ///
    /// Returns `None` on every call after the first.
    ///
    /// Frames that arrive before this is called are buffered without bound
    /// and handed over in order. A send-only caller should take the
    /// sequence and drop it; later frames are then discarded.
    #[must_use]
    pub fn messages(&self) -> Option<Messages> {
        self.inbound.lock().take()
    }

    /// Subscribes to lifecycle transitions.
    ///
    /// Every subscriber sees the full path from `connecting`.
    #[inline]
    #[must_use]
    pub fn lifecycle(&self) -> LifecycleEvents {
        self.lifecycle.subscribe()
    }

    /// Waits until the channel is open.
    ///
    /// No timeout is applied; wrap in `tokio::time::timeout` if needed.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectFailure`] / [`Error::TransportDrop`] if errored
    /// - [`Error::ConnectionClosed`] if closed
    pub async fn wait_open(&self) -> Result<()> {
        let mut events = self.lifecycle.subscribe();

        loop {
            match self.lifecycle.state() {
                LifecycleState::Open => return Ok(()),
                LifecycleState::Closed => return Err(Error::ConnectionClosed),
                LifecycleState::Errored => {
                    return Err(self
                        .lifecycle
                        .fault()
                        .map_or_else(|| Error::connect_failure("unknown"), Error::from));
                }
                LifecycleState::Connecting => {}
            }

            if events.next().await.is_none() {
                return Err(Error::ConnectionClosed);
            }
        }
    }

    /// Requests a graceful shutdown.
    ///
    /// Idempotent. If the handshake is still in progress, the channel
    /// closes as soon as it opens.
    pub fn close(&self) {
        if self.close_requested.swap(true, Ordering::AcqRel) {
            return;
        }

        debug!(address = %self.address, state = %self.lifecycle.state(), "Close requested");

        // The task may already be gone after a terminal transition.
        let _ = self.command_tx.send(ChannelCommand::Shutdown);
    }

    /// Connects, then drives the event loop until the connection ends.
    async fn run_connection(
        config: ChannelConfig,
        lifecycle: Arc<Lifecycle>,
        mut command_rx: mpsc::UnboundedReceiver<ChannelCommand>,
        inbound_tx: mpsc::UnboundedSender<InboundEvent>,
    ) {
        let address = config.address;
        let ws_config = config.limits.to_websocket_config();

        let ws_stream =
            match connect_async_with_config(address.as_str(), Some(ws_config), false).await {
                Ok((stream, response)) => {
                    debug!(%address, status = %response.status(), "Handshake completed");
                    stream
                }
                Err(e) => {
                    warn!(%address, error = %e, "Connect failed");
                    lifecycle.fail(Fault::ConnectFailure {
                        reason: e.to_string(),
                    });
                    return;
                }
            };

        lifecycle.advance(LifecycleState::Open);
        info!(%address, "Channel open");

        match Self::run_event_loop(ws_stream, &mut command_rx, &inbound_tx).await {
            LoopExit::Closed => {
                lifecycle.advance(LifecycleState::Closed);
                info!(%address, "Channel closed");
            }
            LoopExit::Dropped(reason) => {
                lifecycle.fail(Fault::TransportDrop { reason });
            }
        }

        // Terminal state is visible before the inbound sequence ends.
        drop(inbound_tx);
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: ClientStream,
        command_rx: &mut mpsc::UnboundedReceiver<ChannelCommand>,
        inbound_tx: &mpsc::UnboundedSender<InboundEvent>,
    ) -> LoopExit {
        let (mut ws_write, mut ws_read) = ws_stream.split();
        let mut seq: u64 = 0;

        loop {
            tokio::select! {
                // Incoming frames from the peer
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(seq, len = text.len(), "Inbound frame");
                            let event = InboundEvent {
                                seq,
                                text: text.as_str().to_owned(),
                            };
                            seq += 1;

                            // Receiver dropped means nobody is listening.
                            let _ = inbound_tx.send(event);
                        }

                        Some(Ok(Message::Binary(data))) => {
                            debug!(len = data.len(), "Ignoring binary frame");
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "WebSocket closed by remote");
                            // Flushes the queued close reply.
                            let _ = ws_write.close().await;
                            return LoopExit::Closed;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            return LoopExit::Dropped(e.to_string());
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            return LoopExit::Closed;
                        }

                        // Ping, Pong, raw frames
                        Some(Ok(_)) => {}
                    }
                }

                // Commands from the channel handle
                command = command_rx.recv() => {
                    match command {
                        Some(ChannelCommand::Send(text)) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                warn!(error = %e, "Failed to send frame");
                                return LoopExit::Dropped(e.to_string());
                            }
                        }

                        Some(ChannelCommand::Shutdown) | None => {
                            debug!("Shutdown command received");
                            if let Err(e) = ws_write.close().await {
                                debug!(error = %e, "Close frame not delivered");
                            }
                            return LoopExit::Closed;
                        }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
