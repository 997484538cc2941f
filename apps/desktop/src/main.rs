use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    connect, settings, ChatSession, ClientChat, ClientSettings, FrameSender, JoinParams,
    MergedTabs, UiConfig,
};
use shared::domain::PlayerId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

mod console;

use console::{parse_console_line, ConsoleCommand, TerminalSurface, HELP};

#[derive(Parser, Debug)]
struct Args {
    /// Overrides `serverUrl` from the settings file.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    team: Option<String>,
    #[arg(long)]
    level: Option<u8>,
    /// Directory holding client.json and client-state.json.
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let config_dir = args.config_dir.unwrap_or_else(settings::default_dir);
    let settings_path = config_dir.join(settings::SETTINGS_FILE);
    let mut client_settings = ClientSettings::load(&settings_path)?;

    let name = args
        .name
        .or_else(|| Some(client_settings.player_name.clone()).filter(|name| !name.is_empty()));
    let Some(name) = name else {
        bail!(
            "no player name; pass --name or set playerName in {}",
            settings_path.display()
        );
    };
    let player_id = match client_settings.player_id {
        Some(id) => id,
        None => {
            let id = PlayerId::new_random();
            client_settings.player_id = Some(id);
            client_settings.player_name = name.clone();
            if let Err(error) = client_settings.save(&settings_path) {
                warn!(%error, "could not remember the player id");
            }
            id
        }
    };
    let server_url = args
        .server_url
        .unwrap_or_else(|| client_settings.server_url.clone());

    let params = JoinParams {
        player_id,
        name,
        team: args.team,
        level: args.level,
        location: None,
    };
    let mut connection = connect(&server_url, &params)
        .await
        .with_context(|| format!("could not reach {server_url}"))?;
    info!(player = %params.name, %player_id, "joined");

    let merged = MergedTabs::load(config_dir.join(settings::STATE_FILE));
    let chat = ClientChat::with_merged(merged, client_settings.show_system_in_all_tabs);
    let mut session = ChatSession::new(
        chat,
        UiConfig::local(&client_settings.switch_key),
        connection.sender.clone(),
    );
    let mut surface = TerminalSurface::new(std::io::stdout());
    session.report_active_channel()?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = connection.events.recv() => {
                let Some(event) = event else { break };
                if !session.handle_event(event, &mut surface) {
                    break;
                }
            }
            line = stdin.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else { break };
                if !run_console_line(&mut session, &mut surface, &line) {
                    break;
                }
            }
        }
    }

    connection.close();
    Ok(())
}

/// Returns false when the player asked to leave.
fn run_console_line(
    session: &mut ChatSession<FrameSender>,
    surface: &mut TerminalSurface<std::io::Stdout>,
    line: &str,
) -> bool {
    let command = match parse_console_line(line) {
        Ok(command) => command,
        Err(error) => {
            surface.print(&error.to_string());
            return true;
        }
    };
    match command {
        ConsoleCommand::Quit => return false,
        ConsoleCommand::Help => surface.print(HELP),
        ConsoleCommand::Tab(channel) => {
            if !session.switch_to(channel, surface) && session.chat().current() != channel {
                surface.print(&format!("Tab {channel} is not available."));
            }
        }
        ConsoleCommand::Merge(channel) => {
            session.toggle_merged(channel, surface);
            let merged = session.chat().merged_channels();
            surface.print(&format!("Merged view: {}", tab_list(session, &merged)));
        }
        ConsoleCommand::Tabs => {
            let current = session.chat().current();
            let tabs = session
                .ui()
                .visible_tabs()
                .into_iter()
                .map(|channel| {
                    let label = session.ui().tab_label(channel);
                    if channel == current {
                        format!("[{label}]")
                    } else {
                        label.to_string()
                    }
                })
                .collect::<Vec<_>>();
            surface.print(&tabs.join(" "));
        }
        ConsoleCommand::Unread => {
            let counts = session
                .ui()
                .visible_tabs()
                .into_iter()
                .map(|channel| {
                    format!(
                        "{}={}",
                        session.ui().tab_label(channel),
                        session.chat().unread(channel)
                    )
                })
                .collect::<Vec<_>>();
            surface.print(&counts.join(" "));
        }
        ConsoleCommand::Send(text) => {
            if let Err(error) = session.submit(&text, surface) {
                surface.print(&format!("Not sent: {error}"));
            }
        }
    }
    true
}

fn tab_list(session: &ChatSession<FrameSender>, channels: &[shared::Channel]) -> String {
    if channels.is_empty() {
        return "off".into();
    }
    channels
        .iter()
        .map(|channel| session.ui().tab_label(*channel))
        .collect::<Vec<_>>()
        .join(" + ")
}
