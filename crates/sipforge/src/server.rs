//! `PartyServer` builder and accept loop.
//!
//! This is the entry point for running a Sipforge server. It ties the layers
//! together: transport → protocol → room registry.

use std::sync::Arc;

use sipforge_protocol::{Codec, JsonCodec};
use sipforge_room::{RoomConfig, RoomRegistry};
use sipforge_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::SipforgeError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks, with the
/// registry behind a `Mutex` — the registry itself is plain data; all
/// cross-task coordination happens through room actor channels.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: Mutex<RoomRegistry>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Sipforge server.
///
/// # Example
///
/// ```rust,ignore
/// use sipforge::prelude::*;
///
/// let server = PartyServerBuilder::new()
///     .bind("0.0.0.0:3000")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct PartyServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
}

impl PartyServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration stamped onto every room.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Builds the server, binding the WebSocket transport.
    ///
    /// Uses `JsonCodec` — the format the party clients speak.
    pub async fn build(self) -> Result<PartyServer<JsonCodec>, SipforgeError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: Mutex::new(RoomRegistry::new(self.room_config)),
            codec: JsonCodec,
        });

        Ok(PartyServer { transport, state })
    }
}

impl Default for PartyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Sipforge server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct PartyServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> PartyServer<C> {
    /// Creates a new builder.
    pub fn builder() -> PartyServerBuilder {
        PartyServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Each accepted connection gets its own handler task; a connection's
    /// failure never takes down the loop. Runs until the process terminates.
    pub async fn run(mut self) -> Result<(), SipforgeError> {
        tracing::info!("Sipforge server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
