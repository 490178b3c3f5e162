//! Interactive prompt for `flinkwatch watch`

use crate::render;
use anyhow::Result;
use colored::*;
use flinkwatch_core::ResourceKey;
use flinkwatch_transport::{Detail, DetailClient, Phase, WatchSession};
use parking_lot::Mutex;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::runtime::Handle;

/// A parsed prompt line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// All deployments, optionally limited to one namespace and lifecycle state
    List {
        namespace: Option<String>,
        state: Option<String>,
    },
    /// Deployments whose job is not RUNNING
    Failing,
    Show(ResourceKey),
    Status,
    Retry,
    Detail(Detail, ResourceKey),
    Help,
    Clear,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".to_string());
        };
        if matches!(verb.to_lowercase().as_str(), "list" | "ls") {
            return parse_list(words);
        }

        let arg = words.next();
        if let Some(extra) = words.next() {
            return Err(format!("unexpected argument '{}'", extra));
        }

        let key = |arg: Option<&str>| -> Result<ResourceKey, String> {
            arg.ok_or_else(|| format!("usage: {} <namespace>/<name>", verb))?
                .parse::<ResourceKey>()
                .map_err(|e| e.to_string())
        };

        match verb.to_lowercase().as_str() {
            "failing" => Ok(Command::Failing),
            "show" => Ok(Command::Show(key(arg)?)),
            "status" => Ok(Command::Status),
            "retry" => Ok(Command::Retry),
            "help" => Ok(Command::Help),
            "clear" => Ok(Command::Clear),
            "quit" | "exit" => Ok(Command::Quit),
            other => match other.parse::<Detail>() {
                Ok(detail) => Ok(Command::Detail(detail, key(arg)?)),
                Err(_) => Err(format!("unknown command '{}', type 'help'", other)),
            },
        }
    }
}

/// `list [namespace] [--state <STATE>]`
fn parse_list<'a>(mut words: impl Iterator<Item = &'a str>) -> Result<Command, String> {
    let mut namespace = None;
    let mut state = None;

    while let Some(word) = words.next() {
        match word {
            "--state" | "-s" => {
                let value = words
                    .next()
                    .ok_or_else(|| "usage: list [namespace] [--state <STATE>]".to_string())?;
                state = Some(value.to_uppercase());
            }
            flag if flag.starts_with('-') => return Err(format!("unknown option '{}'", flag)),
            ns if namespace.is_none() => namespace = Some(ns.to_string()),
            extra => return Err(format!("unexpected argument '{}'", extra)),
        }
    }

    Ok(Command::List { namespace, state })
}

/// Run the prompt on the current (blocking) thread until `quit` or EOF
///
/// Detail requests are driven on `runtime`.
pub fn run(session: &WatchSession, details: &DetailClient, runtime: &Handle) -> Result<()> {
    let last_phase = Mutex::new(None);
    let _subscription = session.subscribe(move |state| {
        let mut last = last_phase.lock();
        if *last == Some(state.phase) {
            return;
        }
        *last = Some(state.phase);

        match state.phase {
            Phase::Streaming => println!("\r{}", render::status_line(state)),
            Phase::Backoff => {
                let error = state
                    .last_error()
                    .map(|e| format!(" ({})", e))
                    .unwrap_or_default();
                println!("\r{}{}", render::status_line(state), error.dimmed());
            }
            _ => {}
        }
    });

    let mut rl = DefaultEditor::new()?;
    let history_path = dirs::home_dir()
        .map(|p| p.join(".flinkwatch_history"))
        .unwrap_or_default();

    let _ = rl.load_history(&history_path);

    loop {
        let prompt = format!("{}> ", "flinkwatch".cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match Command::parse(line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => execute(command, session, details, runtime),
                    Err(e) => eprintln!("{} {}", "Error:".red(), e),
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
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);
    Ok(())
}

fn execute(command: Command, session: &WatchSession, details: &DetailClient, runtime: &Handle) {
    match command {
        Command::List { namespace, state } => {
            let resources: Vec<_> = session
                .resources()
                .into_iter()
                .filter(|r| namespace.as_deref().map_or(true, |ns| r.namespace() == ns))
                .filter(|r| state.as_deref().map_or(true, |s| render::in_lifecycle_state(r, s)))
                .collect();
            println!("{}", render::table(&resources));
        }
        Command::Failing => {
            let resources: Vec<_> = session
                .resources()
                .into_iter()
                .filter(|r| render::not_running(r))
                .collect();
            println!("{}", render::table(&resources));
        }
        Command::Show(key) => match session.find(&key.namespace, &key.name) {
            Some(resource) => println!("{}", render::json(&*resource)),
            None => println!("{}", format!("{} not found", key).dimmed()),
        },
        Command::Status => println!("{}", render::status(&session.state())),
        Command::Retry => {
            session.retry_now();
            println!("{}", "Reconnecting...".yellow());
        }
        Command::Detail(detail, key) => match runtime.block_on(details.fetch(detail, &key)) {
            Ok(value) => println!("{}", render::json(&value)),
            Err(e) => eprintln!("{} {}", "Error:".red(), e),
        },
        Command::Help => print_help(),
        Command::Clear => print!("\x1B[2J\x1B[1;1H"),
        Command::Quit => {}
    }
}

fn print_help() {
    println!(
        "{}",
        r#"
Deployments:
  list [namespace] [--state S] List deployments, optionally by lifecycle state
  failing                      List deployments whose job is not RUNNING
  show <ns>/<name>             Full resource as JSON

Details:
  events <ns>/<name>           Kubernetes events
  checkpoints <ns>/<name>      Checkpoint history
  storage <ns>/<name>          Checkpoints in checkpoint storage
  exceptions <ns>/<name>       Job exceptions

Connection:
  status                       Connection state and last error
  retry                        Reconnect now

Other:
  help                         Show this help
  clear                        Clear screen
  quit, exit                   Exit
"#
        .dimmed()
    );
}
