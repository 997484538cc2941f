use anyhow::{anyhow, Context, Result};
use futures::{SinkExt, StreamExt};
use shared::{
    domain::{Location, PlayerId},
    protocol::{decode_server_frame, encode_frame, ClientFrame, ServerFrame},
};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Frame(ServerFrame),
    /// A server frame that could not be decoded.
    Error(String),
    Disconnected,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
}

/// Where frames for the server go.
pub trait FrameSink {
    fn send(&self, frame: ClientFrame) -> Result<(), TransportError>;
}

#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::UnboundedSender<ClientFrame>,
}

impl FrameSink for FrameSender {
    fn send(&self, frame: ClientFrame) -> Result<(), TransportError> {
        self.tx.send(frame).map_err(|_| TransportError::Closed)
    }
}

/// Identity and position the host registers the player with.
#[derive(Debug, Clone)]
pub struct JoinParams {
    pub player_id: PlayerId,
    pub name: String,
    pub team: Option<String>,
    pub level: Option<u8>,
    pub location: Option<Location>,
}

pub struct Connection {
    pub sender: FrameSender,
    pub events: mpsc::UnboundedReceiver<ClientEvent>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Connection {
    pub fn close(self) {
        self.reader.abort();
        self.writer.abort();
    }
}

/// `http(s)://` is rewritten to `ws(s)://`; the `/ws` path and the join
/// parameters are appended.
pub fn ws_url(server_url: &str, params: &JoinParams) -> Result<Url> {
    let base = if let Some(rest) = server_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = server_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if server_url.starts_with("ws://") || server_url.starts_with("wss://") {
        server_url.to_string()
    } else {
        return Err(anyhow!(
            "server_url must start with ws://, wss://, http:// or https://"
        ));
    };

    let mut url = Url::parse(&base).with_context(|| format!("invalid server url: {server_url}"))?;
    url.set_path("/ws");
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("player_id", &params.player_id.to_string())
            .append_pair("name", &params.name);
        if let Some(team) = &params.team {
            query.append_pair("team", team);
        }
        if let Some(level) = params.level {
            query.append_pair("level", &level.to_string());
        }
        if let Some(location) = &params.location {
            query
                .append_pair("dimension", location.dimension.as_str())
                .append_pair("x", &location.position.x.to_string())
                .append_pair("y", &location.position.y.to_string())
                .append_pair("z", &location.position.z.to_string());
        }
    }
    Ok(url)
}

pub async fn connect(server_url: &str, params: &JoinParams) -> Result<Connection> {
    let url = ws_url(server_url, params)?;
    let (ws_stream, _) = connect_async(url.as_str())
        .await
        .with_context(|| format!("failed to connect websocket: {url}"))?;
    info!(%url, "connected");
    let (mut ws_writer, mut ws_reader) = ws_stream.split();

    let (event_tx, events) = mpsc::unbounded_channel();
    let reader = tokio::spawn(async move {
        while let Some(msg) = ws_reader.next().await {
            let event = match msg {
                Ok(Message::Text(text)) => match decode_server_frame(&text) {
                    Ok(frame) => ClientEvent::Frame(frame),
                    Err(error) => {
                        warn!(%error, "undecodable server frame");
                        ClientEvent::Error(error.to_string())
                    }
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(error) => {
                    warn!(%error, "websocket read failed");
                    break;
                }
            };
            if event_tx.send(event).is_err() {
                return;
            }
        }
        let _ = event_tx.send(ClientEvent::Disconnected);
    });

    let (tx, mut outgoing) = mpsc::unbounded_channel::<ClientFrame>();
    let writer = tokio::spawn(async move {
        while let Some(frame) = outgoing.recv().await {
            let text = match encode_frame(&frame) {
                Ok(text) => text,
                Err(error) => {
                    warn!(%error, "failed to encode client frame");
                    continue;
                }
            };
            if let Err(error) = ws_writer.send(Message::Text(text)).await {
                debug!(%error, "websocket write failed");
                break;
            }
        }
    });

    Ok(Connection {
        sender: FrameSender { tx },
        events,
        reader,
        writer,
    })
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
