//! Live View
//!
//! Wires the snapshot loader, the live update listener and the mutation
//! submitter to one shared renderer, the way the page does at load time.

use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::listener::{ListenerState, LiveUpdateListener, ReconnectPolicy};
use super::loader::SnapshotLoader;
use super::submitter::{FamilyForm, Mutation, MutationSubmitter, PersonForm};
use crate::api::{EventSource, ServerResponse, StateApi};
use crate::config::Config;
use crate::error::{PadronError, PadronResult};
use crate::view::{Surface, ViewRenderer};

/// Options for assembling a [`LiveView`]
#[derive(Debug, Clone)]
pub struct ViewOptions {
    /// Tree image URL without query string
    pub tree_endpoint: String,
    pub discard_stale: bool,
    pub reconnect: ReconnectPolicy,
}

impl ViewOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tree_endpoint: format!("{}/tree.svg", config.server.base_url.trim_end_matches('/')),
            discard_stale: config.view.discard_stale,
            reconnect: ReconnectPolicy::from(&config.stream),
        }
    }
}

/// The running page
pub struct LiveView<S: Surface> {
    renderer: Arc<ViewRenderer<S>>,
    loader: SnapshotLoader<S>,
    submitter: MutationSubmitter<S>,
    listener: Arc<LiveUpdateListener<S>>,
    shutdown: watch::Sender<bool>,
    listener_task: Mutex<Option<JoinHandle<()>>>,
}

impl<S: Surface + 'static> LiveView<S> {
    pub fn new(
        api: Arc<dyn StateApi>,
        source: Arc<dyn EventSource>,
        surface: S,
        options: ViewOptions,
    ) -> Self {
        let renderer = Arc::new(ViewRenderer::new(
            surface,
            options.tree_endpoint,
            options.discard_stale,
        ));
        let loader = SnapshotLoader::new(Arc::clone(&api), Arc::clone(&renderer));
        let submitter = MutationSubmitter::new(api, Arc::clone(&renderer), loader.clone());
        let listener = Arc::new(LiveUpdateListener::new(
            source,
            Arc::clone(&renderer),
            options.reconnect,
        ));
        let (shutdown, _) = watch::channel(false);

        Self {
            renderer,
            loader,
            submitter,
            listener,
            shutdown,
            listener_task: Mutex::new(None),
        }
    }

    /// Open the push subscription and pull the first snapshot
    ///
    /// A failed first pull is logged and leaves the page empty; the push
    /// subscription keeps running either way.
    pub async fn start(&self) {
        self.spawn_listener().await;
        self.loader.refresh().await;
    }

    async fn spawn_listener(&self) {
        let mut task = self.listener_task.lock().await;
        if task.is_some() {
            return;
        }

        let listener = Arc::clone(&self.listener);
        let mut stop = self.shutdown.subscribe();
        *task = Some(tokio::spawn(async move {
            listener
                .run(async move {
                    loop {
                        let stopped = *stop.borrow_and_update();
                        if stopped || stop.changed().await.is_err() {
                            break;
                        }
                    }
                })
                .await;
        }));
    }

    /// Manual refresh: full pull, failures only logged
    pub async fn refresh(&self) {
        self.loader.refresh().await;
    }

    /// Submit the family form
    ///
    /// A blank name is swallowed silently: `Ok(None)`, nothing sent.
    pub async fn submit_family(&self, form: FamilyForm) -> PadronResult<Option<ServerResponse>> {
        self.submit(Mutation::Family(form)).await
    }

    /// Submit the person form
    pub async fn submit_person(&self, form: PersonForm) -> PadronResult<Option<ServerResponse>> {
        self.submit(Mutation::Person(form)).await
    }

    async fn submit(&self, mutation: Mutation) -> PadronResult<Option<ServerResponse>> {
        match self.submitter.submit(&mutation).await {
            Ok(response) => Ok(Some(response)),
            Err(PadronError::Validation(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn renderer(&self) -> &Arc<ViewRenderer<S>> {
        &self.renderer
    }

    pub fn listener(&self) -> &Arc<LiveUpdateListener<S>> {
        &self.listener
    }

    pub fn listener_state(&self) -> ListenerState {
        self.listener.state()
    }

    /// Close the push subscription and wait for it to stop
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        if let Some(task) = self.listener_task.lock().await.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Push listener task failed");
            }
        }
        tracing::info!("Live view closed");
    }
}
