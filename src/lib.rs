//! # Padron
//!
//! Live view client for a population and genealogy server. Keeps a page of
//! counters, a people table and a family tree image reconciled with the
//! server state.
//!
//! ## Features
//!
//! - **Snapshot pulls**: full state from `GET /state`, at startup, on demand
//!   and after every mutation
//! - **Live updates**: counters and tree from the `GET /stream` push stream,
//!   with reconnect backoff
//! - **Mutations**: family and person forms posted as-is, server answer echoed
//! - **Stale discard**: results older than what is on screen are dropped
//!
//! ## Modules
//!
//! - [`api`]: HTTP and event-stream transport
//! - [`model`]: snapshot, fragment and request types
//! - [`view`]: surfaces and the rendering routine
//! - [`live`]: loader, listener, submitter and the assembled [`LiveView`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use padron::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let api = Arc::new(HttpApi::new(&config.server)?);
//!
//!     let view = LiveView::new(
//!         api.clone(),
//!         api,
//!         TerminalSurface::stdout(true),
//!         ViewOptions::from_config(&config),
//!     );
//!     view.start().await;
//!
//!     view.submit_family(FamilyForm::new("Mora")).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     view.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod live;
pub mod logging;
pub mod model;
pub mod view;

pub use api::{EventSource, HttpApi, MessageStream, ResponseBody, ServerResponse, StateApi};

pub use config::{
    generate_default_config, Config, ConfigError, LoggingConfig, ServerConfig, StreamConfig,
    ViewConfig,
};

pub use error::{PadronError, PadronResult};

pub use live::{
    FamilyForm, ListenerState, LiveUpdateListener, LiveView, Mutation, MutationSubmitter,
    PersonForm, ReconnectPolicy, SnapshotLoader, ViewOptions,
};

pub use model::{
    Counts, FamilyCreateRequest, PersonCreateRequest, PersonSummary, StateFragment, StateSnapshot,
    Version,
};

pub use view::{CacheBust, Document, PullTicket, Surface, TerminalSurface, ViewRenderer};
