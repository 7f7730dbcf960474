//! Per-connection driver
//!
//! Owns one WebSocket from accept to teardown: performs the registration
//! handshake, pumps inbound frames into the lifecycle manager, and runs a
//! send task that drains the connection's outbound channel. Disconnect
//! cleanup runs on every exit path, whatever killed the socket.

use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use crate::error::Result;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::registry::ConnectionId;
use crate::server::config::ServerConfig;
use crate::server::sink::PeerSockets;
use crate::session::{LifecycleManager, SessionState};

/// One live client connection
pub(crate) struct Connection {
    state: SessionState,
    config: ServerConfig,
    lifecycle: Arc<LifecycleManager<PeerSockets>>,
    sockets: Arc<PeerSockets>,
}

impl Connection {
    pub(crate) fn new(
        id: ConnectionId,
        peer_addr: SocketAddr,
        config: ServerConfig,
        lifecycle: Arc<LifecycleManager<PeerSockets>>,
        sockets: Arc<PeerSockets>,
    ) -> Self {
        Self {
            state: SessionState::new(id, peer_addr),
            config,
            lifecycle,
            sockets,
        }
    }

    /// Drive the connection to completion
    pub(crate) async fn run(mut self, socket: TcpStream) -> Result<()> {
        let ws = accept_async(socket).await?;
        let (mut ws_sender, mut ws_receiver) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        // Send task: forwards queued frames and keeps the peer alive with
        // periodic pings. Exits when the channel closes or the socket dies.
        let ping_interval = self.config.ping_interval;
        let send_task = tokio::spawn(async move {
            let mut ping = tokio::time::interval(ping_interval);
            loop {
                tokio::select! {
                    msg = rx.recv() => {
                        let Some(msg) = msg else { break };
                        let closing = matches!(msg, Message::Close(_));
                        if ws_sender.send(msg).await.is_err() || closing {
                            break;
                        }
                    }
                    _ = ping.tick() => {
                        if ws_sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        if self.register(&mut ws_receiver, &tx).await {
            self.read_loop(&mut ws_receiver, &tx).await;

            // Transport is gone; tear down core state before the send task.
            self.sockets.remove(self.state.id).await;
            self.lifecycle.on_disconnect(self.state.id).await;
        } else {
            // Refused connections surface a close frame, not a silent hang.
            let _ = tx.send(Message::Close(Some(CloseFrame {
                code: CloseCode::Policy,
                reason: "registration required".into(),
            })));
        }
        self.state.disconnect();

        // Drop our sender so the send task drains the queue and exits.
        drop(tx);
        let _ = send_task.await;

        tracing::debug!(
            connection = %self.state.id,
            peer = %self.state.peer_addr,
            events = self.state.events_received,
            "Session ended"
        );
        Ok(())
    }

    /// Registration phase: the first text frame must be a `register` event
    /// and must arrive before the configured deadline.
    async fn register(
        &mut self,
        receiver: &mut SplitStream<WebSocketStream<TcpStream>>,
        tx: &mpsc::UnboundedSender<Message>,
    ) -> bool {
        let deadline = Instant::now() + self.config.register_timeout;

        loop {
            let frame = match timeout_at(deadline, receiver.next()).await {
                Ok(Some(Ok(frame))) => frame,
                Ok(Some(Err(e))) => {
                    tracing::debug!(
                        connection = %self.state.id,
                        error = %e,
                        "WebSocket error before registration"
                    );
                    return false;
                }
                Ok(None) => return false,
                Err(_) => {
                    tracing::debug!(connection = %self.state.id, "Registration timed out");
                    queue_error(tx, "registration timed out");
                    return false;
                }
            };

            let text = match frame {
                Message::Text(text) => text,
                Message::Ping(_) | Message::Pong(_) => continue,
                Message::Close(_) => return false,
                _ => {
                    queue_error(tx, "expected a register event");
                    return false;
                }
            };

            return match serde_json::from_str::<ClientEvent>(&text) {
                Ok(ClientEvent::Register {
                    identity,
                    display_name,
                }) => {
                    // The ack goes through the sink, so the socket has to be
                    // attached first; rolled back if registration is refused.
                    self.sockets.insert(self.state.id, tx.clone()).await;
                    match self
                        .lifecycle
                        .on_connect(self.state.id, identity, display_name)
                        .await
                    {
                        Ok(info) => {
                            self.state.activate();
                            tracing::debug!(
                                connection = %self.state.id,
                                identity = %info.identity,
                                peer = %self.state.peer_addr,
                                "Session active"
                            );
                            true
                        }
                        Err(e) => {
                            self.sockets.remove(self.state.id).await;
                            tracing::info!(
                                connection = %self.state.id,
                                peer = %self.state.peer_addr,
                                error = %e,
                                "Registration refused"
                            );
                            queue_error(tx, &e.to_string());
                            false
                        }
                    }
                }
                Ok(_) => {
                    queue_error(tx, "register must be the first event");
                    false
                }
                Err(e) => {
                    tracing::debug!(
                        connection = %self.state.id,
                        error = %e,
                        "Malformed registration frame"
                    );
                    queue_error(tx, "malformed event");
                    false
                }
            };
        }
    }

    /// Main event loop for an active session
    async fn read_loop(
        &mut self,
        receiver: &mut SplitStream<WebSocketStream<TcpStream>>,
        tx: &mpsc::UnboundedSender<Message>,
    ) {
        while let Some(frame) = receiver.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::debug!(connection = %self.state.id, error = %e, "WebSocket error");
                    break;
                }
            };

            match frame {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => {
                        self.state.event_handled();
                        self.lifecycle.handle_event(self.state.id, event).await;
                    }
                    Err(e) => {
                        tracing::debug!(
                            connection = %self.state.id,
                            error = %e,
                            "Malformed event"
                        );
                        queue_error(tx, "malformed event");
                    }
                },
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Binary(_) => queue_error(tx, "binary frames are not supported"),
                Message::Frame(_) => {}
            }
        }
    }
}

/// Queue an `error` event onto a connection's outbound channel
fn queue_error(tx: &mpsc::UnboundedSender<Message>, message: &str) {
    let event = ServerEvent::Error {
        message: message.into(),
    };
    if let Ok(text) = serde_json::to_string(&event) {
        let _ = tx.send(Message::Text(text.into()));
    }
}
