//! View
//!
//! The page and the routine that draws state onto it.
//!
//! - [`Surface`]: rendering target (counters, table, tree image, output areas)
//! - [`Document`]: in-memory surface
//! - [`TerminalSurface`]: surface that redraws a text frame per render
//! - [`ViewRenderer`]: projects snapshots and fragments onto a surface

mod document;
mod renderer;
mod surface;
mod terminal;

pub use document::Document;
pub use renderer::{
    CacheBust, PullTicket, RenderInput, RenderOutcome, VersionGuard, ViewRenderer,
};
pub use surface::{Field, FormKind, PersonRow, Surface, TABLE_HEADERS};
pub use terminal::{render_frame, TerminalSurface};
