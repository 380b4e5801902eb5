//! Live Update Listener
//!
//! Keeps one push subscription open for the lifetime of the view and applies
//! every fragment it delivers. Fragments only touch the counters and the
//! tree image; the table is left to full pulls.
//!
//! ## Lifecycle
//!
//! `Connecting -> Open -> (stream ends) -> Reconnecting -> Connecting ...`,
//! and `Closed` once shut down or after the reconnect budget is exhausted.

use futures_util::StreamExt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::api::EventSource;
use crate::config::StreamConfig;
use crate::error::PadronResult;
use crate::model::StateFragment;
use crate::view::{RenderOutcome, Surface, ViewRenderer};

/// Client clock in milliseconds, used as the push cache-bust token
pub type Clock = fn() -> i64;

fn system_clock() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Exponential backoff between subscription attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Consecutive failed attempts before giving up; `None` retries forever
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&StreamConfig::default())
    }
}

impl From<&StreamConfig> for ReconnectPolicy {
    fn from(config: &StreamConfig) -> Self {
        Self {
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
            max_attempts: config.max_reconnect_attempts,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt number `attempt` (starting at 1)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1 << exponent)
            .min(self.max_backoff)
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(false, |max| attempt > max)
    }
}

/// Subscription state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerState {
    Connecting,
    Open,
    Reconnecting { attempt: u32, delay: Duration },
    Closed,
}

/// Counters for processed push messages
#[derive(Debug, Default)]
pub struct ListenerStats {
    applied: AtomicU64,
    discarded: AtomicU64,
    malformed: AtomicU64,
}

impl ListenerStats {
    /// Fragments that reached the view
    pub fn applied(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }

    /// Fragments refused as stale
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    /// Messages skipped because they did not parse
    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }
}

/// Applies server-push fragments to the view
pub struct LiveUpdateListener<S: Surface> {
    source: Arc<dyn EventSource>,
    renderer: Arc<ViewRenderer<S>>,
    policy: ReconnectPolicy,
    clock: Clock,
    state: watch::Sender<ListenerState>,
    stats: ListenerStats,
}

impl<S: Surface> LiveUpdateListener<S> {
    pub fn new(
        source: Arc<dyn EventSource>,
        renderer: Arc<ViewRenderer<S>>,
        policy: ReconnectPolicy,
    ) -> Self {
        let (state, _) = watch::channel(ListenerState::Connecting);
        Self {
            source,
            renderer,
            policy,
            clock: system_clock,
            state,
            stats: ListenerStats::default(),
        }
    }

    /// Builder method: replace the cache-bust clock
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Watch subscription state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ListenerState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ListenerState {
        self.state.borrow().clone()
    }

    pub fn stats(&self) -> &ListenerStats {
        &self.stats
    }

    fn set_state(&self, state: ListenerState) {
        self.state.send_replace(state);
    }

    /// Apply one push message
    ///
    /// A message that does not parse is reported and nothing is rendered.
    pub async fn handle_message(&self, message: &str) -> PadronResult<RenderOutcome> {
        let fragment = match StateFragment::parse(message) {
            Ok(fragment) => fragment,
            Err(e) => {
                self.stats.malformed.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        let outcome = self.renderer.render_fragment(&fragment, (self.clock)()).await;
        match outcome {
            RenderOutcome::Applied => self.stats.applied.fetch_add(1, Ordering::Relaxed),
            RenderOutcome::Discarded => self.stats.discarded.fetch_add(1, Ordering::Relaxed),
        };

        tracing::debug!(
            year = fragment.year,
            version = ?fragment.version,
            ?outcome,
            "Push fragment handled"
        );
        Ok(outcome)
    }

    /// Run until `shutdown` completes or the reconnect budget runs out
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = shutdown => {
                tracing::info!("Push subscription closed");
            }
            _ = self.run_subscription() => {}
        }
        self.set_state(ListenerState::Closed);
    }

    async fn run_subscription(&self) {
        let mut attempt = 0u32;

        loop {
            self.set_state(ListenerState::Connecting);

            match self.source.connect().await {
                Ok(mut messages) => {
                    // The server may have restarted and counts versions from zero again
                    if attempt > 0 {
                        self.renderer.reset_guard().await;
                    }
                    self.set_state(ListenerState::Open);
                    attempt = 0;
                    tracing::info!("Push subscription open");

                    while let Some(item) = messages.next().await {
                        match item {
                            Ok(message) => {
                                if let Err(e) = self.handle_message(&message).await {
                                    tracing::warn!(error = %e, "Skipping malformed push message");
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Push subscription dropped");
                                break;
                            }
                        }
                    }
                    tracing::info!("Push stream ended");
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "Push subscription failed");
                }
            }

            attempt += 1;
            if self.policy.exhausted(attempt) {
                tracing::error!(
                    attempts = attempt - 1,
                    "Giving up on push subscription; counters will only change on refresh"
                );
                return;
            }

            let delay = self.policy.delay_for(attempt);
            tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting push subscription");
            self.set_state(ListenerState::Reconnecting { attempt, delay });
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::testing::ScriptedSource;
    use crate::view::{Document, Field};

    const TREE: &str = "http://localhost:5001/tree.svg";

    fn push(year: i64, version: i64) -> String {
        format!(
            r#"{{"version": {}, "year": {}, "counts": {{"families": 1, "people": 4, "unions": 1, "living": 3}}}}"#,
            version, year
        )
    }

    fn quick_policy(max_attempts: Option<u32>) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            max_attempts,
        }
    }

    fn listener(
        source: ScriptedSource,
        policy: ReconnectPolicy,
    ) -> (LiveUpdateListener<Document>, Arc<ViewRenderer<Document>>) {
        let renderer = Arc::new(ViewRenderer::new(Document::new(), TREE, true));
        let listener = LiveUpdateListener::new(Arc::new(source), Arc::clone(&renderer), policy)
            .with_clock(|| 42);
        (listener, renderer)
    }

    #[test]
    fn test_backoff_doubles_up_to_ceiling() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(5), Duration::from_secs(16));
        assert_eq!(policy.delay_for(6), Duration::from_secs(30));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(30));
        assert!(!policy.exhausted(1_000));
        assert!(quick_policy(Some(2)).exhausted(3));
    }

    #[tokio::test]
    async fn test_malformed_message_does_not_close_subscription() {
        let source = ScriptedSource::new(vec![vec![
            push(1991, 1),
            "{\"year\": 1992, \"counts\": ".to_string(),
            push(1993, 3),
        ]]);
        let (listener, renderer) = listener(source, quick_policy(Some(0)));

        listener.run(std::future::pending()).await;

        assert_eq!(listener.stats().applied(), 2);
        assert_eq!(listener.stats().malformed(), 1);
        assert_eq!(listener.state(), ListenerState::Closed);
        renderer
            .with_surface(|d| {
                assert_eq!(d.text(Field::Year), Some("1993"));
                assert_eq!(d.text(Field::Version), Some("3"));
                assert_eq!(d.tree_loads(), 2);
                assert_eq!(d.tree_src(), Some("http://localhost:5001/tree.svg?ts=42"));
                assert!(d.rows().is_empty());
            })
            .await;
    }

    #[tokio::test]
    async fn test_reconnects_after_stream_ends() {
        let source = ScriptedSource::new(vec![vec![push(1991, 1)], vec![push(1992, 2)]]);
        let connects = source.connects();
        let (listener, renderer) = listener(source, quick_policy(Some(1)));

        listener.run(std::future::pending()).await;

        // Two scripted subscriptions, then one failed connect exhausts the budget
        assert_eq!(connects.load(std::sync::atomic::Ordering::SeqCst), 3);
        assert_eq!(listener.stats().applied(), 2);
        renderer
            .with_surface(|d| assert_eq!(d.text(Field::Year), Some("1992")))
            .await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_listener() {
        let source = ScriptedSource::hanging();
        let (listener, _renderer) = listener(source, quick_policy(None));
        let mut states = listener.subscribe_state();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let run = listener.run(async move {
            let _ = rx.await;
        });
        tokio::pin!(run);

        let opened = async {
            loop {
                let open = *states.borrow_and_update() == ListenerState::Open;
                if open {
                    break;
                }
                states.changed().await.unwrap();
            }
        };
        tokio::select! {
            _ = &mut run => panic!("listener stopped on its own"),
            _ = opened => {}
        }
        tx.send(()).unwrap();
        run.await;

        assert_eq!(listener.state(), ListenerState::Closed);
    }

    #[tokio::test]
    async fn test_reopened_subscription_accepts_lower_versions() {
        let source = ScriptedSource::new(vec![
            vec![push(1995, 500)],
            vec![push(1991, 1), push(1992, 2)],
        ]);
        let (listener, renderer) = listener(source, quick_policy(Some(1)));

        listener.run(std::future::pending()).await;

        assert_eq!(listener.stats().applied(), 3);
        assert_eq!(listener.stats().discarded(), 0);
        renderer
            .with_surface(|d| {
                assert_eq!(d.text(Field::Year), Some("1992"));
                assert_eq!(d.text(Field::Version), Some("2"));
            })
            .await;
    }

    #[tokio::test]
    async fn test_stale_fragment_counted() {
        let source = ScriptedSource::new(vec![vec![push(1995, 5), push(1994, 4)]]);
        let (listener, renderer) = listener(source, quick_policy(Some(0)));

        listener.run(std::future::pending()).await;

        assert_eq!(listener.stats().applied(), 1);
        assert_eq!(listener.stats().discarded(), 1);
        renderer
            .with_surface(|d| assert_eq!(d.text(Field::Year), Some("1995")))
            .await;
    }
}
