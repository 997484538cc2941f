use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use server_core::{
    collaborators::{ChatLogSink, CommandExecutor, NoPartyPlugin, NoPrefixPlugin, SystemClock},
    ChatRouter, CommandOutcome, CommandService, Dispatch, PlayerSnapshot, RouterDeps,
};
use shared::{
    codec::Envelope,
    color::NamedColor,
    domain::{Dimension, Location, MuteRecord, PlayerId, Position},
    error::ApiError,
    protocol::{decode_client_frame, encode_frame, ClientFrame, ServerFrame},
    text::RichText,
};
use storage::{LogWriter, Storage};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

mod config;
mod host;

use config::{load_settings, prepare_database_url, Settings};
use host::{PlayerRegistry, StaticPermissions, TeamClanDelegate};

#[derive(Clone)]
struct AppState {
    router: Arc<ChatRouter>,
    commands: Arc<CommandService>,
    registry: Arc<PlayerRegistry>,
    clan: Arc<TeamClanDelegate>,
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    player_id: Uuid,
    name: String,
    team: Option<String>,
    dimension: Option<String>,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    level: Option<u8>,
}

impl WsQuery {
    fn snapshot(&self) -> PlayerSnapshot {
        let dimension = self
            .dimension
            .as_deref()
            .map(Dimension::new)
            .unwrap_or_else(Dimension::overworld);
        let position = Position::new(
            self.x.unwrap_or_default(),
            self.y.unwrap_or(64.0),
            self.z.unwrap_or_default(),
        );
        let mut snapshot = PlayerSnapshot::new(
            PlayerId(self.player_id),
            self.name.clone(),
            Location::new(dimension, position),
        )
        .with_permission_level(self.level.unwrap_or_default());
        snapshot.team = self.team.clone().filter(|team| !team.trim().is_empty());
        snapshot
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings()?;
    let database_url = prepare_database_url(&settings.database_url)?;
    let (chat_log, restored) = open_chat_log(&settings, &database_url).await;

    let state = build_state(&settings, Arc::new(chat_log));
    if !restored.is_empty() {
        info!(count = restored.len(), "restored mutes");
    }
    state.router.mutes().restore(restored);
    let app = build_router(state);

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "multichat server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Opens the log database and reads persisted mutes. A database that cannot
/// be opened now is retried lazily by the log worker; chat keeps working.
async fn open_chat_log(settings: &Settings, database_url: &str) -> (LogWriter, Vec<MuteRecord>) {
    let chat = &settings.chat;
    if !(chat.chat_log_enabled || chat.death_log_enabled || chat.mutes_enabled) {
        return (LogWriter::disabled(), Vec::new());
    }
    match Storage::new(database_url).await {
        Ok(storage) => {
            let mutes = storage.load_mutes().await.unwrap_or_else(|error| {
                warn!(%error, "failed to load persisted mutes");
                Vec::new()
            });
            let (writer, _worker) = LogWriter::spawn_with_storage(storage, database_url);
            (writer, mutes)
        }
        Err(error) => {
            error!(
                %database_url,
                %error,
                "failed to open SQLite database; logging will retry in the background"
            );
            let (writer, _worker) = LogWriter::spawn(database_url);
            (writer, Vec::new())
        }
    }
}

fn build_state(settings: &Settings, chat_log: Arc<dyn ChatLogSink>) -> AppState {
    let registry = Arc::new(PlayerRegistry::new());
    let clan = Arc::new(TeamClanDelegate::new(
        registry.clone(),
        settings.chat.clan_command.clone(),
    ));
    let router = Arc::new(ChatRouter::new(RouterDeps {
        settings: settings.chat.clone(),
        permissions: Arc::new(StaticPermissions::new(
            settings.admins.iter().copied().map(PlayerId),
        )),
        prefixes: Arc::new(NoPrefixPlugin),
        parties: Arc::new(NoPartyPlugin),
        clan_delegate: clan.clone(),
        transport: registry.clone(),
        chat_log,
        clock: Arc::new(SystemClock),
        spy_store: settings.spy_store_path.clone(),
    }));
    AppState {
        commands: Arc::new(CommandService::new(router.clone())),
        router,
        registry,
        clan,
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(q): Query<WsQuery>,
) -> impl IntoResponse {
    let snapshot = q.snapshot();
    ws.on_upgrade(move |socket| ws_connection(state, socket, snapshot))
}

async fn ws_connection(state: AppState, socket: WebSocket, snapshot: PlayerSnapshot) {
    let (mut sender, mut receiver) = socket.split();
    let player = snapshot.id;
    let frames = connect_player(&state, snapshot);

    let send_task = tokio::spawn(async move {
        let mut frames = UnboundedReceiverStream::new(frames);
        while let Some(frame) = frames.next().await {
            let text = match encode_frame(&frame) {
                Ok(v) => v,
                Err(error) => {
                    warn!(%error, "failed to encode server frame");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut reported_error = false;
    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => handle_text(&state, player, &text, &mut reported_error),
            Message::Close(_) => break,
            _ => {}
        }
    }

    disconnect_player(&state, player);
    send_task.abort();
}

fn connect_player(
    state: &AppState,
    snapshot: PlayerSnapshot,
) -> tokio::sync::mpsc::UnboundedReceiver<ServerFrame> {
    let frames = state.registry.register(snapshot.clone());
    let sync = state.router.ui_config_for(&snapshot);
    if let Err(error) = state
        .registry
        .send_frame(snapshot.id, ServerFrame::UiConfigSync(sync))
    {
        warn!(%error, "failed to queue ui config");
    }
    info!(player = %snapshot.name, id = %snapshot.id, "player connected");
    announce(state, &format!("{} joined the game", snapshot.name));
    frames
}

fn disconnect_player(state: &AppState, player: PlayerId) {
    state.router.disconnect(player);
    if let Some(snapshot) = state.registry.unregister(player) {
        info!(player = %snapshot.name, "player disconnected");
        announce(state, &format!("{} left the game", snapshot.name));
    }
}

/// A malformed frame is answered with one error frame per connection.
fn handle_text(state: &AppState, player: PlayerId, text: &str, reported_error: &mut bool) {
    match decode_client_frame(text) {
        Ok(frame) => handle_client_frame(state, player, frame),
        Err(error) => {
            warn!(%error, %player, "malformed client frame");
            if !*reported_error {
                *reported_error = true;
                if let Err(error) = state
                    .registry
                    .send_frame(player, ServerFrame::Error(ApiError::from(&error)))
                {
                    debug!(%error, "error frame not delivered");
                }
            }
        }
    }
}

fn handle_client_frame(state: &AppState, player: PlayerId, frame: ClientFrame) {
    let Some(sender) = state.registry.snapshot(player) else {
        return;
    };
    match frame {
        ClientFrame::Chat { text } => {
            let online = state.registry.online();
            match state.router.handle_chat(&sender, &text, &online) {
                Ok(Dispatch::Routed(report)) => debug!(
                    channel = %report.channel,
                    recipients = report.recipients.len(),
                    "chat routed"
                ),
                Ok(Dispatch::Silent) => {}
                Err(error) => debug!(%error, player = %sender.name, "chat not routed"),
            }
        }
        ClientFrame::Command { line } => handle_command(state, &sender, &line),
        ClientFrame::ActiveChannel { ordinal } => {
            let channel = state.router.set_active_channel(player, ordinal);
            debug!(player = %sender.name, %channel, "active channel changed");
        }
        ClientFrame::Move { location } => state.registry.update_location(player, location),
    }
}

fn handle_command(state: &AppState, sender: &PlayerSnapshot, line: &str) {
    let line = line.trim().trim_start_matches('/');
    let online = state.registry.online();
    state.router.observe_command(sender, line, &online);

    match state.commands.execute(sender, line, &online) {
        CommandOutcome::Replies(replies) => {
            for reply in replies {
                state.router.notify(sender.id, reply);
            }
        }
        CommandOutcome::NotHandled if state.clan.handles(line) => {
            if let Err(error) = state.clan.execute_as(sender, line) {
                state.router.notify(
                    sender.id,
                    RichText::literal(error.reason).with_color(NamedColor::Red),
                );
            }
        }
        CommandOutcome::NotHandled => {
            let name = line.split_whitespace().next().unwrap_or_default();
            state.router.notify(
                sender.id,
                RichText::literal(format!("Unknown command: /{name}")).with_color(NamedColor::Red),
            );
        }
    }
}

fn announce(state: &AppState, text: &str) {
    let online = state.registry.online();
    let message = RichText::literal(text).with_color(NamedColor::Yellow);
    for player in online.iter() {
        if let Err(error) = state
            .router
            .relay_system(player, Envelope::plain(message.clone()), &online)
        {
            debug!(%error, "announcement not delivered");
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
