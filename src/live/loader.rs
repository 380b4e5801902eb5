//! Snapshot Loader
//!
//! Pulls the full state and hands it to the renderer. Used at startup, on
//! manual refresh and after every mutation.

use std::sync::Arc;

use crate::api::StateApi;
use crate::error::PadronResult;
use crate::model::StateSnapshot;
use crate::view::{Surface, ViewRenderer};

/// Pulls `GET /state` into the view
pub struct SnapshotLoader<S: Surface> {
    api: Arc<dyn StateApi>,
    renderer: Arc<ViewRenderer<S>>,
}

impl<S: Surface> Clone for SnapshotLoader<S> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            renderer: Arc::clone(&self.renderer),
        }
    }
}

impl<S: Surface> SnapshotLoader<S> {
    pub fn new(api: Arc<dyn StateApi>, renderer: Arc<ViewRenderer<S>>) -> Self {
        Self { api, renderer }
    }

    /// Pull and render a snapshot
    ///
    /// On failure nothing is rendered. There is no retry. The pull is
    /// ordered by when it was sent, so a newer push that lands while it is
    /// in flight wins over it.
    pub async fn load(&self) -> PadronResult<StateSnapshot> {
        let issued = self.renderer.issue_pull().await;
        let snapshot = self.api.fetch_state().await?;
        tracing::debug!(
            version = %snapshot.version,
            year = snapshot.year,
            people = snapshot.people.len(),
            "Snapshot pulled"
        );
        self.renderer.render_pull(&snapshot, issued).await;
        Ok(snapshot)
    }

    /// Pull and render, logging failures instead of returning them
    pub async fn refresh(&self) {
        if let Err(e) = self.load().await {
            tracing::warn!(error = %e, "Snapshot load failed; keeping previous view");
        }
    }
}
