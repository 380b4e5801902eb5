//! Padron live view
//!
//! Draws the page in the terminal and keeps it in sync with the server.
//! Commands are read from stdin, one per line:
//!
//! - `refresh`
//! - `family <name>`
//! - `person nombre=Ana; edad=30; padres=101,102`
//! - `quit`

use anyhow::Context;
use clap::Parser;
use padron::live::{FamilyForm, LiveView, PersonForm, ViewOptions};
use padron::logging::init_logging;
use padron::view::{Surface, TerminalSurface};
use padron::{Config, HttpApi};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

#[derive(Parser)]
#[command(name = "padron")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live view of the population server")]
struct Args {
    /// Server URL (overrides config and PADRON_SERVER_URL)
    #[arg(long)]
    server: Option<String>,

    /// Config file (default: search the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Append frames instead of clearing the screen
    #[arg(long)]
    no_clear: bool,
}

enum Command {
    Refresh,
    Family(FamilyForm),
    Person(PersonForm),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let command = match verb {
        "refresh" | "r" => Command::Refresh,
        "family" | "f" => Command::Family(FamilyForm::new(rest)),
        "person" | "p" => {
            let mut form = PersonForm::default();
            for pair in rest.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("expected key=value, got '{}'", pair))?;
                form.set_field(key, value.trim()).map_err(|e| e.to_string())?;
            }
            Command::Person(form)
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command '{}', try 'help'", other)),
    };
    Ok(Some(command))
}

fn print_help() {
    eprintln!("Commands:");
    eprintln!("  refresh                         pull the full state");
    eprintln!("  family <name>                   create a family");
    eprintln!("  person key=value; key=value     create a person");
    eprintln!("      keys: {}", PersonForm::FIELDS.join(", "));
    eprintln!("  quit");
}

async fn run_command<S: Surface + 'static>(view: &LiveView<S>, command: Command) {
    let result = match command {
        Command::Refresh => {
            view.refresh().await;
            return;
        }
        Command::Family(form) => view.submit_family(form).await,
        Command::Person(form) => view.submit_person(form).await,
        Command::Help => {
            print_help();
            return;
        }
        Command::Quit => return,
    };

    // The answer or the error text is already on the page
    if let Err(e) = result {
        tracing::debug!(error = %e, "Submission did not reach the server");
    }
}

/// Run a command on its own task so a request that never returns only
/// stalls that command
fn spawn_command<S: Surface + 'static>(
    tasks: &mut JoinSet<()>,
    view: &Arc<LiveView<S>>,
    command: Command,
) {
    let view = Arc::clone(view);
    tasks.spawn(async move { run_command(&view, command).await });
}

/// Read stdin lines on a plain thread; the channel closes at end of input
fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin");
                    break;
                }
            }
        }
    });
    rx
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load_default(),
    };
    if let Some(server) = args.server {
        config.server.base_url = server;
    }

    init_logging(&config.logging);
    tracing::info!(
        server = %config.server.base_url,
        discard_stale = config.view.discard_stale,
        "Padron live view v{}",
        env!("CARGO_PKG_VERSION")
    );

    let api = Arc::new(HttpApi::new(&config.server)?);
    let view = Arc::new(LiveView::new(
        api.clone(),
        api,
        TerminalSurface::stdout(!args.no_clear),
        ViewOptions::from_config(&config),
    ));

    let mut tasks = JoinSet::new();
    {
        let view = Arc::clone(&view);
        tasks.spawn(async move { view.start().await });
    }

    let mut lines = stdin_lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.recv(), if stdin_open => match line {
                Some(line) => match parse_command(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(Command::Help)) => print_help(),
                    Ok(Some(command)) => spawn_command(&mut tasks, &view, command),
                    Ok(None) => {}
                    Err(message) => eprintln!("{}", message),
                },
                None => stdin_open = false,
            },
            Some(finished) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = finished {
                    tracing::error!(error = %e, "Command task failed");
                }
            }
        }
    }

    tracing::info!("Shutting down...");
    tasks.abort_all();
    while tasks.join_next().await.is_some() {}
    view.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use padron::view::{Document, Field};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const STATE: &str = r#"{"year": 1990, "counts": {"people": 0, "living": 0, "unions": 0, "families": 0}, "version": 1, "people": []}"#;

    /// Answers `GET /state` and never answers anything else
    async fn stalling_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    if buf[..n].starts_with(b"GET /state") {
                        let response = format!(
                            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                            STATE.len(),
                            STATE
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                });
            }
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_parse_commands() {
        assert!(matches!(parse_command("  "), Ok(None)));
        assert!(matches!(parse_command("refresh"), Ok(Some(Command::Refresh))));
        assert!(matches!(parse_command("q"), Ok(Some(Command::Quit))));

        match parse_command("family  Mora Soto") {
            Ok(Some(Command::Family(form))) => assert_eq!(form.name, " Mora Soto"),
            _ => panic!("expected a family command"),
        }
        match parse_command("person nombre=Ana; edad=30; padres=101,102") {
            Ok(Some(Command::Person(form))) => {
                assert_eq!(form.nombre, "Ana");
                assert_eq!(form.edad, "30");
                assert_eq!(form.padres, "101,102");
            }
            _ => panic!("expected a person command"),
        }

        assert!(parse_command("person nombre").is_err());
        assert!(parse_command("person apellido=Soto").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[tokio::test]
    async fn test_hung_submission_leaves_refresh_responsive() {
        let mut config = Config::default();
        config.server.base_url = stalling_server().await;
        let api = Arc::new(HttpApi::new(&config.server).unwrap());
        let view = Arc::new(LiveView::new(
            api.clone(),
            api,
            Document::new(),
            ViewOptions::from_config(&config),
        ));

        let mut tasks = JoinSet::new();
        spawn_command(&mut tasks, &view, Command::Family(FamilyForm::new("Mora")));
        spawn_command(&mut tasks, &view, Command::Refresh);

        let finished = tokio::time::timeout(Duration::from_secs(5), tasks.join_next())
            .await
            .expect("refresh waited on the stalled submission");
        assert!(matches!(finished, Some(Ok(()))));
        assert_eq!(tasks.len(), 1);
        view.renderer()
            .with_surface(|d| assert_eq!(d.text(Field::Year), Some("1990")))
            .await;

        tasks.abort_all();
    }
}
