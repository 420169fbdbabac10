//! Interactive REPL.

use crate::commands::Session;
use crate::error::CliError;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use std::path::Path;

const HELP_TEXT: &str = r#"
Any word that is not a command below is dispatched as an event.

Available commands:
  help                 Show this help
  state                Show the current and previous state
  events               List events handled in the current state
  send <event>         Dispatch <event>, even one named like a command
  !<event>             Same as send <event>
  quit, exit           Exit the REPL
"#;

enum Reply {
    Output(String),
    Quit,
}

pub fn run(path: &Path) -> Result<(), CliError> {
    let mut session = Session::open(path)?;
    println!("{}", "statetab REPL".bold().cyan());
    println!("Loaded {}", path.display());
    println!("{}", session.start());

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".statetab_history"))
        .unwrap_or_else(|_| ".statetab_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!(
            "{} ",
            format!("{}>", session.dispatcher.current_state()).cyan()
        );
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match execute_line(&mut session, line) {
                    Reply::Output(output) => println!("{}\n", output),
                    Reply::Quit => break,
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);
    Ok(())
}

fn execute_line(session: &mut Session, line: &str) -> Reply {
    if let Some(event) = line.strip_prefix('!') {
        return send(session, event.trim());
    }

    let mut parts = line.split_whitespace();
    let word = parts.next().unwrap_or_default();
    match word {
        "send" => send(session, parts.next().unwrap_or_default()),
        "help" | "?" => Reply::Output(HELP_TEXT.trim().to_string()),
        "quit" | "exit" | "q" => Reply::Quit,
        "state" => {
            let previous = session
                .dispatcher
                .previous_state()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            Reply::Output(format!(
                "current: {}\nprevious: {}",
                session.dispatcher.current_state().as_str().cyan(),
                previous
            ))
        }
        "events" => {
            let table = session.dispatcher.table();
            let events = table.events_from(session.dispatcher.current_state());
            if events.is_empty() {
                Reply::Output("No events handled here".yellow().to_string())
            } else {
                Reply::Output(events.join(", "))
            }
        }
        event => Reply::Output(session.step(event)),
    }
}

fn send(session: &mut Session, event: &str) -> Reply {
    if event.is_empty() {
        return Reply::Output(format!("{}: send <event>", "Usage".yellow()));
    }
    Reply::Output(session.step(event))
}
