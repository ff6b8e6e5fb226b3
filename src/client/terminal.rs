use crate::cli::ChatArgs;
use crate::config::persona::load_persona_or_default;
use super::ChatController;
use super::proxy::ProxyClient;
use super::session::{ FileHistoryStore, HistoryStore, MemoryHistoryStore };
use super::view::TerminalView;

use std::error::Error;
use std::io::{ self, Write };
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{ AsyncBufReadExt, BufReader };
use log::info;

/// Everything a line of terminal input can mean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Submit(String),
    QuickReply(usize),
    Open,
    Close,
    Toggle,
    Help,
    Quit,
}

/// `/1`, `/2`, ... pick quick replies; other `/words` are commands.
pub fn parse_event(line: &str) -> UiEvent {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return UiEvent::Submit(line.to_string());
    };

    if let Ok(n) = command.parse::<usize>() {
        if n > 0 {
            return UiEvent::QuickReply(n - 1);
        }
    }
    match command {
        "open" => UiEvent::Open,
        "close" => UiEvent::Close,
        "toggle" => UiEvent::Toggle,
        "help" => UiEvent::Help,
        "quit" | "exit" => UiEvent::Quit,
        _ => UiEvent::Submit(line.to_string()),
    }
}

fn print_help<V: super::view::ChatView>(controller: &ChatController<V>) {
    let mut out = io::stdout();
    let _ = writeln!(out, "Type a message and press Enter. Commands: /open /close /toggle /help /quit");
    for (idx, reply) in controller.quick_replies().iter().enumerate() {
        let _ = writeln!(out, "  /{}  {}  ({})", idx + 1, reply.label, reply.message);
    }
    let _ = out.flush();
}

pub async fn run(args: &ChatArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let persona = load_persona_or_default(&args.persona_path);

    let store: Box<dyn HistoryStore> = if args.ephemeral {
        Box::new(MemoryHistoryStore::default())
    } else {
        let store = FileHistoryStore::new(&args.history_file);
        info!("Chat history will be stored in: {}", store.path().display());
        Box::new(store)
    };

    let transport = Arc::new(ProxyClient::new(
        &args.server_url,
        persona.system_prompt.clone(),
        Duration::from_secs(args.timeout_secs),
    )?);
    info!("Sending chat turns to: {}", transport.endpoint());

    let mut controller = ChatController::new(
        store,
        transport,
        TerminalView::new(io::stdout()),
        persona,
        args.history_limit,
    ).opened();
    controller.init();
    print_help(&controller);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_event(&line) {
            UiEvent::Submit(text) => {
                controller.submit(&text).await;
            }
            UiEvent::QuickReply(idx) => {
                if !controller.submit_quick_reply(idx).await {
                    println!("No quick reply #{}", idx + 1);
                }
            }
            UiEvent::Open => controller.open(),
            UiEvent::Close => controller.close(),
            UiEvent::Toggle => controller.toggle(),
            UiEvent::Help => print_help(&controller),
            UiEvent::Quit => break,
        }
    }

    Ok(())
}
