//! View Renderer
//!
//! Projects a snapshot or fragment onto the [`Surface`]. Every render
//! recomputes its part of the page from the input alone: no client-side
//! model is kept besides the version of the last applied result.

use std::fmt;
use tokio::sync::Mutex;

use super::surface::{Field, FormKind, PersonRow, Surface};
use crate::model::{Counts, StateFragment, StateSnapshot, Version};

/// Value of the tree image `ts` query parameter
///
/// Pulls reload the image keyed by the snapshot version; pushes key it by
/// the client clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBust {
    Version(Version),
    /// Client time in milliseconds
    Timestamp(i64),
}

impl fmt::Display for CacheBust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheBust::Version(version) => write!(f, "{}", version),
            CacheBust::Timestamp(ms) => write!(f, "{}", ms),
        }
    }
}

/// Position of a pull among applied renders, taken when it was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullTicket(u64);

/// What to render
#[derive(Debug, Clone, Copy)]
pub enum RenderInput<'a> {
    /// Full pull: counters, table and tree
    Full {
        snapshot: &'a StateSnapshot,
        issued: PullTicket,
    },
    /// Push fragment: counters and tree only
    Partial {
        fragment: &'a StateFragment,
        timestamp_ms: i64,
    },
}

impl RenderInput<'_> {
    fn version(&self) -> Option<&Version> {
        match self {
            RenderInput::Full { snapshot, .. } => Some(&snapshot.version),
            RenderInput::Partial { fragment, .. } => fragment.version.as_ref(),
        }
    }

    fn issued(&self) -> Option<PullTicket> {
        match self {
            RenderInput::Full { issued, .. } => Some(*issued),
            RenderInput::Partial { .. } => None,
        }
    }
}

/// Whether a render reached the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Applied,
    /// Older than what is already displayed
    Discarded,
}

/// Tracks the last applied version to reject out-of-order results
#[derive(Debug, Clone)]
pub struct VersionGuard {
    enabled: bool,
    last: Option<Version>,
    /// Renders applied so far
    applied: u64,
    /// Value of `applied` when `last` was recorded
    last_at: u64,
}

impl VersionGuard {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            last: None,
            applied: 0,
            last_at: 0,
        }
    }

    pub fn last_applied(&self) -> Option<&Version> {
        self.last.as_ref()
    }

    /// Ticket for a pull issued now
    pub fn ticket(&self) -> PullTicket {
        PullTicket(self.applied)
    }

    /// Decide whether a result with `incoming` version may be applied
    ///
    /// A push is refused when its version is strictly older than the last
    /// applied one. A pull is refused only when a strictly newer version was
    /// applied after the pull was issued: a pull issued later is the
    /// server's current state even if its version went backwards, as it
    /// does when the server restarts. Equal versions pass, so a pull of the
    /// revision a push already announced still rebuilds the table.
    pub fn admit(&mut self, incoming: Option<&Version>, issued: Option<PullTicket>) -> bool {
        if let (true, Some(incoming), Some(last)) = (self.enabled, incoming, &self.last) {
            let superseded = match issued {
                Some(PullTicket(at)) => self.last_at > at,
                None => true,
            };
            if superseded && incoming.is_older_than(last) {
                return false;
            }
        }

        self.applied += 1;
        if let Some(incoming) = incoming {
            self.last = Some(incoming.clone());
            self.last_at = self.applied;
        }
        true
    }

    /// Forget the last applied version
    pub fn reset(&mut self) {
        self.last = None;
    }
}

struct RenderState<S> {
    surface: S,
    guard: VersionGuard,
}

/// Shared rendering routine for the loader, the listener and the submitter
pub struct ViewRenderer<S: Surface> {
    state: Mutex<RenderState<S>>,
    tree_endpoint: String,
}

impl<S: Surface> ViewRenderer<S> {
    /// Create a renderer drawing on `surface`
    ///
    /// `tree_endpoint` is the tree image URL without query string.
    pub fn new(surface: S, tree_endpoint: impl Into<String>, discard_stale: bool) -> Self {
        Self {
            state: Mutex::new(RenderState {
                surface,
                guard: VersionGuard::new(discard_stale),
            }),
            tree_endpoint: tree_endpoint.into(),
        }
    }

    /// Cache-busted tree image URL
    pub fn tree_url(&self, token: &CacheBust) -> String {
        format!(
            "{}?ts={}",
            self.tree_endpoint,
            urlencoding::encode(&token.to_string())
        )
    }

    /// Render one input as a single atomic step
    pub async fn render(&self, input: RenderInput<'_>) -> RenderOutcome {
        let mut state = self.state.lock().await;

        if !state.guard.admit(input.version(), input.issued()) {
            tracing::debug!(
                incoming = ?input.version(),
                last = ?state.guard.last_applied(),
                "Discarding stale result"
            );
            return RenderOutcome::Discarded;
        }

        let surface = &mut state.surface;
        match input {
            RenderInput::Full { snapshot, .. } => {
                write_counters(
                    surface,
                    snapshot.year,
                    &snapshot.counts,
                    &snapshot.version.to_string(),
                );
                surface.replace_rows(snapshot.people.iter().map(PersonRow::from).collect());
                surface.set_tree_src(&self.tree_url(&CacheBust::Version(snapshot.version.clone())));
            }
            RenderInput::Partial {
                fragment,
                timestamp_ms,
            } => {
                let version = fragment
                    .version
                    .as_ref()
                    .map(Version::to_string)
                    .unwrap_or_default();
                write_counters(surface, fragment.year, &fragment.counts, &version);
                surface.set_tree_src(&self.tree_url(&CacheBust::Timestamp(timestamp_ms)));
            }
        }
        surface.commit();

        RenderOutcome::Applied
    }

    /// Ticket to take before sending a pull
    pub async fn issue_pull(&self) -> PullTicket {
        self.state.lock().await.guard.ticket()
    }

    /// Render a full pull issued at `issued`
    pub async fn render_pull(&self, snapshot: &StateSnapshot, issued: PullTicket) -> RenderOutcome {
        self.render(RenderInput::Full { snapshot, issued }).await
    }

    /// Render a snapshot obtained just now
    pub async fn render_snapshot(&self, snapshot: &StateSnapshot) -> RenderOutcome {
        let issued = self.issue_pull().await;
        self.render_pull(snapshot, issued).await
    }

    /// Render a push fragment received at `timestamp_ms`
    pub async fn render_fragment(&self, fragment: &StateFragment, timestamp_ms: i64) -> RenderOutcome {
        self.render(RenderInput::Partial {
            fragment,
            timestamp_ms,
        })
        .await
    }

    /// Write a submission result into a form's output area
    pub async fn show_output(&self, form: FormKind, text: &str) {
        let mut state = self.state.lock().await;
        state.surface.set_output(form, text);
        state.surface.commit();
    }

    /// Clear a form after a completed submission
    pub async fn reset_form(&self, form: FormKind) {
        let mut state = self.state.lock().await;
        state.surface.reset_form(form);
        state.surface.commit();
    }

    /// Inspect the surface
    pub async fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let state = self.state.lock().await;
        f(&state.surface)
    }

    /// Forget the last applied version, so the next result of any version applies
    pub async fn reset_guard(&self) {
        self.state.lock().await.guard.reset();
        tracing::debug!("Stale guard reset");
    }

    /// Version of the last applied result
    pub async fn last_version(&self) -> Option<Version> {
        self.state.lock().await.guard.last_applied().cloned()
    }
}

fn write_counters<S: Surface>(surface: &mut S, year: i64, counts: &Counts, version: &str) {
    surface.set_text(Field::Year, &year.to_string());
    surface.set_text(Field::People, &counts.people.to_string());
    surface.set_text(Field::Living, &counts.living.to_string());
    surface.set_text(Field::Unions, &counts.unions.to_string());
    surface.set_text(Field::Families, &counts.families.to_string());
    surface.set_text(Field::Version, version);
}
