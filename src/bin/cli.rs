//! Padron CLI
//!
//! One-shot commands against the population server:
//! - Print the current state
//! - Follow the push stream
//! - Create families and people
//! - Download the family tree

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use padron::live::{FamilyForm, LiveView, PersonForm, ViewOptions};
use padron::logging::init_logging;
use padron::view::{render_frame, Document, FormKind, TerminalSurface, ViewRenderer};
use padron::{generate_default_config, CacheBust, Config, HttpApi, ServerResponse, StateApi};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "padron-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Command-line client for the population server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Server URL (overrides config and PADRON_SERVER_URL)
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StateFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Genero {
    M,
    F,
}

impl Genero {
    fn as_str(self) -> &'static str {
        match self {
            Genero::M => "M",
            Genero::F => "F",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum EstadoCivil {
    Soltero,
    Casado,
    Divorciado,
    Viudo,
}

impl EstadoCivil {
    fn as_str(self) -> &'static str {
        match self {
            EstadoCivil::Soltero => "soltero",
            EstadoCivil::Casado => "casado",
            EstadoCivil::Divorciado => "divorciado",
            EstadoCivil::Viudo => "viudo",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pull and print the full state
    State {
        #[arg(short, long, value_enum, default_value = "table")]
        format: StateFormat,
    },

    /// Follow the live view until Ctrl-C
    Watch,

    /// Create a family
    Family {
        /// Family name
        name: String,
    },

    /// Create a person
    Person {
        #[arg(long)]
        nombre: String,
        /// Left blank to let the server assign one
        #[arg(long, default_value = "")]
        cedula: String,
        #[arg(long, default_value = "")]
        edad: String,
        #[arg(long, value_enum)]
        genero: Genero,
        /// Province code (SJ, AL, CA, HE, GU, PU, LI)
        #[arg(long)]
        provincia: String,
        #[arg(long, value_enum, default_value = "soltero")]
        estado_civil: EstadoCivil,
        /// Comma-separated interests
        #[arg(long, default_value = "")]
        intereses: String,
        /// Comma-separated parent cédulas
        #[arg(long, default_value = "")]
        padres: String,
        #[arg(long, default_value = "")]
        familia_id: String,
    },

    /// Download the family tree image
    Tree {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load_default(),
    };
    if let Some(server) = &cli.server {
        config.server.base_url = server.clone();
    }
    Ok(config)
}

/// Print what a submission left in the output area and fail on rejection
async fn report_submission(
    view: &LiveView<Document>,
    form: FormKind,
    response: Option<ServerResponse>,
) -> anyhow::Result<()> {
    let Some(response) = response else {
        bail!("nothing submitted: the {} form is incomplete", form.name());
    };

    let output = view
        .renderer()
        .with_surface(|d| d.output(form).map(str::to_string))
        .await
        .unwrap_or_else(|| response.render());
    println!("{}", output);

    if !response.is_success() {
        bail!("server rejected the {} ({})", form.name(), response.status);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, &content)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Config written to {}", path.display());
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let config = load_config(&cli)?;
    init_logging(&config.logging);
    let api = Arc::new(HttpApi::new(&config.server)?);
    let options = ViewOptions::from_config(&config);

    match cli.command {
        Commands::State { format } => {
            let snapshot = api.fetch_state().await?;
            match format {
                StateFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
                StateFormat::Table => {
                    let renderer = ViewRenderer::new(
                        Document::new(),
                        options.tree_endpoint,
                        options.discard_stale,
                    );
                    renderer.render_snapshot(&snapshot).await;
                    print!("{}", renderer.with_surface(render_frame).await);
                }
            }
        }

        Commands::Watch => {
            let view = LiveView::new(api.clone(), api, TerminalSurface::stdout(false), options);
            view.start().await;
            tokio::signal::ctrl_c().await?;
            view.shutdown().await;
        }

        Commands::Family { name } => {
            let view = LiveView::new(api.clone(), api, Document::new(), options);
            let response = view.submit_family(FamilyForm::new(name)).await?;
            report_submission(&view, FormKind::Family, response).await?;
        }

        Commands::Person {
            nombre,
            cedula,
            edad,
            genero,
            provincia,
            estado_civil,
            intereses,
            padres,
            familia_id,
        } => {
            let form = PersonForm {
                cedula,
                nombre,
                edad,
                genero: genero.as_str().to_string(),
                provincia,
                estado_civil: estado_civil.as_str().to_string(),
                intereses,
                padres,
                familia_id,
            };
            let view = LiveView::new(api.clone(), api, Document::new(), options);
            let response = view.submit_person(form).await?;
            report_submission(&view, FormKind::Person, response).await?;
        }

        Commands::Tree { output } => {
            let token = CacheBust::Timestamp(chrono::Utc::now().timestamp_millis());
            let svg = api.fetch_tree(&token).await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, svg)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Tree written to {}", path.display());
                }
                None => print!("{}", svg),
            }
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}
