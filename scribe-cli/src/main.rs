//! Scribe CLI — a line-driven note editor for exercising a session.
//!
//! Reads commands from stdin, applies them to one `EditorSession`, prints
//! every toolbar update as it leaves the debounce window, and autosaves to
//! the file given as the first argument (default `scribe_note.bin`).
//!
//! ```text
//! RUST_LOG=debug scribe-cli notes/today.bin
//! ```

mod command;

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::StreamExt;
use log::info;
use scribe_core::{Attachment, BincodeCodec, FormatState, RichTextDocument, Selection};
use scribe_sync::{
    EditorSession, FileBackend, FileBackendConfig, FormatStateBroadcaster, SessionConfig,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use command::{Command, HELP};

fn describe(state: &FormatState) -> String {
    let formats: Vec<String> = state.formats().iter().map(|f| format!("{f:?}")).collect();
    if formats.is_empty() {
        "Body".to_string()
    } else {
        formats.join(" + ")
    }
}

fn show(session: &EditorSession) {
    println!("{:?}", session.text());
    println!(
        "selection {:?} | {} | version {} | {:?}",
        session.selection(),
        describe(&session.format_state()),
        session.version(),
        session.save_status()
    );
    let detection = session.detection();
    for flag in detection.partially_active.iter() {
        println!("  mixed {flag:?}: {:.0}%", detection.ratio(*flag) * 100.0);
    }
}

async fn open_session(path: PathBuf) -> EditorSession {
    let backend = Arc::new(FileBackend::new(FileBackendConfig {
        path: path.clone(),
        ..FileBackendConfig::default()
    }));
    let broadcaster = FormatStateBroadcaster::default();
    let mut session = EditorSession::new(
        RichTextDocument::new(),
        Arc::new(BincodeCodec),
        backend.clone(),
        broadcaster,
        SessionConfig::default(),
    );

    match backend.load().await {
        Ok(Some(bytes)) => match session.load_bytes(&bytes) {
            Ok(()) => info!("Opened {}", path.display()),
            Err(e) => log::error!("Could not read {}: {e}; starting empty", path.display()),
        },
        Ok(None) => info!("New note at {}", path.display()),
        Err(e) => log::error!("Could not load {}: {e}; starting empty", path.display()),
    }
    session
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| FileBackendConfig::default().path);
    let mut session = open_session(path).await;

    let mut toolbar = session.broadcaster().subscribe();
    tokio::spawn(async move {
        while let Some(state) = toolbar.next().await {
            println!("[toolbar] {}", describe(&state));
        }
    });
    session.focus();

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::error!("stdin: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match command::parse(&line) {
            Ok(Command::Type(text)) => session.insert_text(&text),
            Ok(Command::Caret(offset)) => session.set_selection(Selection::Caret(offset)),
            Ok(Command::Select(a, b)) => session.set_selection(Selection::new(a, b)),
            Ok(Command::Backspace) => {
                session.delete_backward();
            }
            Ok(Command::Toggle(format)) => {
                session.toggle_format(format);
            }
            Ok(Command::Checkbox) => session.insert_attachment(Attachment::Checkbox { checked: false }),
            Ok(Command::Show) => show(&session),
            Ok(Command::Save) => println!("{:?}", session.save_now()),
            Ok(Command::Help) => println!("{HELP}"),
            Ok(Command::Quit) => break,
            Err(message) => println!("{message}"),
        }
    }

    let status = session.close().await;
    info!("Closed with {status:?}");
    session.broadcaster().force_flush();
}
