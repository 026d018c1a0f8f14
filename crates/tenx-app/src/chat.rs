//! `tenx chat`: a line-oriented terminal client over [`ChatController`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tenx_client::{
    ChatController, ChatOptions, ChatStore, DeletedSession, HttpChatLogClient, JsonFilePersister,
    SyncAdapter,
};
use tenx_core::UserId;
use tenx_llm::ChatApi;
use tenx_settings::{ChatSettings, SyncSettings};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

const HELP: &str = "\
commands:
  /new            start a session
  /fork           duplicate the current session
  /list           list sessions
  /select <n>     switch to session n
  /delete         delete the current session
  /undo           restore the last deleted session
  /reset          clear the current session
  /quit           exit
anything else is sent to the model; Ctrl-C stops a running answer";

/// A parsed input line.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Help,
    New,
    Fork,
    List,
    Select(usize),
    Delete,
    Undo,
    Reset,
    Quit,
    Unknown(&'a str),
    Message(&'a str),
}

fn parse_input(line: &str) -> Option<Input<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Some(Input::Message(line));
    };
    let mut parts = command.split_whitespace();
    let input = match (parts.next().unwrap_or_default(), parts.next()) {
        ("help", _) => Input::Help,
        ("new", _) => Input::New,
        ("fork", _) => Input::Fork,
        ("list", _) => Input::List,
        ("select", Some(n)) => match n.parse() {
            Ok(n) => Input::Select(n),
            Err(_) => Input::Unknown(line),
        },
        ("delete", _) => Input::Delete,
        ("undo", _) => Input::Undo,
        ("reset", _) => Input::Reset,
        ("quit" | "exit", _) => Input::Quit,
        _ => Input::Unknown(line),
    };
    Some(input)
}

fn build_sync(settings: &SyncSettings) -> Result<Option<SyncAdapter>> {
    if !settings.enabled {
        return Ok(None);
    }
    let Some(user_id) = settings.user_id.as_deref().filter(|u| !u.is_empty()) else {
        warn!("sync enabled but no user id configured, sessions stay local");
        return Ok(None);
    };
    let client = HttpChatLogClient::new(
        &settings.api_base_url,
        UserId::from(user_id),
        Duration::from_millis(settings.timeout_ms),
    )
    .context("Failed to build chat log client")?;
    info!(base_url = %settings.api_base_url, "mirroring sessions to chat log API");
    Ok(Some(SyncAdapter::new(Arc::new(client))))
}

/// What to tell the user after `/undo`. `None` means nothing was deleted.
fn undo_reply(restored: Option<bool>) -> &'static str {
    match restored {
        Some(true) => "restored",
        Some(false) => "too late to undo",
        None => "nothing to undo",
    }
}

fn print_sessions(controller: &ChatController) {
    let state = controller.store().snapshot();
    for (i, s) in state.sessions.iter().enumerate() {
        let marker = if i == state.current_session_index { '*' } else { ' ' };
        println!("{marker} {i}: {} ({} messages)", s.topic, s.messages.len());
    }
}

/// Run the interactive loop until `/quit` or end of input.
pub async fn run(chat: &ChatSettings, sync: &SyncSettings, api: Arc<dyn ChatApi>) -> Result<()> {
    let state_path = tenx_settings::resolve_path(&chat.state_path);
    let persister = Arc::new(JsonFilePersister::new(state_path));
    let store = Arc::new(ChatStore::open(
        persister,
        Duration::from_millis(chat.undo_delete_ms),
    ));
    let sync = build_sync(sync)?;
    let remote = sync.is_some();
    let controller = ChatController::new(store, api, sync, ChatOptions::from_settings(chat));
    if remote {
        controller.load_from_server().await;
    }

    println!("tenx chat, /help for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_deleted: Option<DeletedSession> = None;

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let Some(input) = parse_input(&line) else {
            continue;
        };
        match input {
            Input::Help => println!("{HELP}"),
            Input::New => {
                let s = controller.new_session(None);
                println!("started {}", s.id);
            }
            Input::Fork => {
                let s = controller.fork_session();
                println!("forked into {}", s.id);
            }
            Input::List => print_sessions(&controller),
            Input::Select(n) => {
                controller.store().select_session(n);
                println!("now in: {}", controller.store().current_session().topic);
            }
            Input::Delete => {
                let index = controller.store().snapshot().current_session_index;
                last_deleted = controller.delete_session(index);
                if last_deleted.is_some() {
                    println!("deleted, /undo to restore");
                }
            }
            Input::Undo => {
                let restored = last_deleted.take().map(|d| controller.undo_delete(d));
                println!("{}", undo_reply(restored));
            }
            Input::Reset => {
                let id = controller.store().current_session().id;
                let _ = controller.reset_session(&id);
                println!("session cleared");
            }
            Input::Quit => break,
            Input::Unknown(cmd) => println!("unknown command: {cmd}"),
            Input::Message(text) => {
                let turn = controller.on_user_input(text, &[]);
                tokio::pin!(turn);
                let reply = tokio::select! {
                    reply = &mut turn => reply,
                    _ = tokio::signal::ctrl_c() => {
                        controller.stop_all();
                        turn.await
                    }
                };
                println!("{}\n", reply.text_content());
            }
        }
    }

    controller.flush().await;
    controller.shutdown().await;
    Ok(())
}
