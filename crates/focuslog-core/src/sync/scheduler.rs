//! Sync scheduler.
//!
//! Funnels every trigger source through one entry point that enforces the
//! at-most-one-concurrent-cycle guarantee. Triggers arriving while a cycle
//! runs, while offline, while signed out, or inside a backoff window are
//! dropped, never queued; the periodic timer makes dropped work eventually
//! happen anyway.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;

use super::backoff::{Backoff, BackoffPolicy};
use super::connectivity::Connectivity;
use super::engine::{CycleReport, SyncEngine};
use crate::auth::TokenProvider;
use crate::db::Store;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// Periodic timer tick.
    Timer,
    /// Offline-to-online edge from the connectivity monitor.
    ConnectivityRestored,
    /// User-initiated. Bypasses backoff.
    Manual,
    /// Slow-cadence safety net so a cycle runs at least daily even when
    /// every other trigger was dropped.
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Offline,
    NotAuthenticated,
    AlreadyRunning,
    BackingOff,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Offline => "offline",
            Self::NotAuthenticated => "not signed in",
            Self::AlreadyRunning => "a cycle is already running",
            Self::BackingOff => "backing off after failures",
        };
        f.write_str(reason)
    }
}

#[derive(Debug)]
pub enum TriggerOutcome {
    Ran(CycleReport),
    Skipped(SkipReason),
}

/// Snapshot of scheduler state, observable through a watch channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncState {
    pub is_syncing: bool,
    pub is_online: bool,
    pub last_sync_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Timer trigger period.
    pub period: Duration,
    /// Safety-net trigger period.
    pub full_period: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(10),
            full_period: Duration::from_secs(24 * 60 * 60),
            backoff: BackoffPolicy::default(),
        }
    }
}

pub struct SyncScheduler {
    engine: SyncEngine,
    store: Store,
    auth: Arc<dyn TokenProvider>,
    connectivity: Arc<dyn Connectivity>,
    config: SchedulerConfig,
    in_flight: AtomicBool,
    backoff: Mutex<Backoff>,
    state: watch::Sender<SyncState>,
}

impl SyncScheduler {
    #[must_use]
    pub fn new(
        engine: SyncEngine,
        store: Store,
        auth: Arc<dyn TokenProvider>,
        connectivity: Arc<dyn Connectivity>,
        config: SchedulerConfig,
    ) -> Self {
        let (state, _) = watch::channel(SyncState {
            is_syncing: false,
            is_online: connectivity.is_online(),
            last_sync_at: None,
        });
        let backoff = Mutex::new(Backoff::new(config.backoff.clone()));
        Self {
            engine,
            store,
            auth,
            connectivity,
            config,
            in_flight: AtomicBool::new(false),
            backoff,
            state,
        }
    }

    /// Observe scheduler state changes.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Single entry point for every trigger source. At most one cycle runs
    /// at a time; surplus triggers are dropped, not queued.
    pub async fn trigger(&self, trigger: SyncTrigger) -> Result<TriggerOutcome> {
        if !self.connectivity.is_online() {
            tracing::debug!(?trigger, "sync skipped: offline");
            return Ok(TriggerOutcome::Skipped(SkipReason::Offline));
        }
        if self.auth.access_token().await.is_none() {
            tracing::debug!(?trigger, "sync skipped: not signed in");
            return Ok(TriggerOutcome::Skipped(SkipReason::NotAuthenticated));
        }
        if trigger != SyncTrigger::Manual && self.backoff.lock().await.is_blocked() {
            tracing::debug!(?trigger, "sync skipped: backing off");
            return Ok(TriggerOutcome::Skipped(SkipReason::BackingOff));
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!(?trigger, "sync skipped: already running");
            return Ok(TriggerOutcome::Skipped(SkipReason::AlreadyRunning));
        }
        let _guard = InFlightGuard(&self.in_flight);

        self.state.send_modify(|state| state.is_syncing = true);
        let result = self.engine.run_cycle().await;

        {
            let mut backoff = self.backoff.lock().await;
            match &result {
                Ok(report) if report.is_clean() => backoff.record_success(),
                _ => backoff.record_failure(),
            }
        }

        let last_sync_at = self.store.last_sync_at().await.ok().flatten();
        self.state.send_modify(|state| {
            state.is_syncing = false;
            state.last_sync_at = last_sync_at;
        });

        result.map(TriggerOutcome::Ran)
    }

    /// Drive the scheduler until the connectivity monitor goes away:
    /// periodic timer cycles, a slower safety-net cadence, and an immediate
    /// attempt on every offline-to-online edge.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut full_ticker = tokio::time::interval(self.config.full_period);
        full_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Consume the immediate first tick so the safety-net cadence waits
        // a whole period; the timer ticker fires right away instead.
        full_ticker.tick().await;

        let mut online = self.connectivity.subscribe();

        loop {
            let trigger = tokio::select! {
                _ = ticker.tick() => SyncTrigger::Timer,
                _ = full_ticker.tick() => SyncTrigger::Full,
                changed = online.changed() => {
                    if changed.is_err() {
                        tracing::info!("connectivity monitor dropped, stopping scheduler");
                        break;
                    }
                    let now_online = *online.borrow_and_update();
                    self.state.send_modify(|state| state.is_online = now_online);
                    if now_online {
                        SyncTrigger::ConnectivityRestored
                    } else {
                        continue;
                    }
                }
            };

            if let Err(error) = self.trigger(trigger).await {
                tracing::warn!(%error, ?trigger, "sync cycle aborted");
            }
        }
    }
}

/// Clears the in-flight flag on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering as AtomicOrdering;

    use pretty_assertions::assert_eq;

    use crate::auth::StaticTokens;
    use crate::db::Database;
    use crate::models::Project;
    use crate::sync::connectivity::ConnectivityMonitor;
    use crate::sync::testing::FakeRemote;

    async fn build(
        remote: Arc<FakeRemote>,
        online: bool,
        token: Option<&str>,
        config: SchedulerConfig,
    ) -> (Arc<SyncScheduler>, Store, Arc<ConnectivityMonitor>) {
        let db = Database::open_in_memory().await.unwrap();
        let store = Store::new(&db);
        let engine = SyncEngine::new(store.clone(), remote);
        let connectivity = Arc::new(ConnectivityMonitor::new(online));
        let auth: Arc<dyn TokenProvider> = match token {
            Some(token) => Arc::new(StaticTokens::new(token)),
            None => Arc::new(StaticTokens::signed_out()),
        };
        let scheduler = Arc::new(SyncScheduler::new(
            engine,
            store.clone(),
            auth,
            connectivity.clone(),
            config,
        ));
        (scheduler, store, connectivity)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_trigger_is_dropped_without_network_calls() {
        let remote = Arc::new(FakeRemote::new());
        let (scheduler, store, connectivity) =
            build(remote.clone(), false, Some("t"), SchedulerConfig::default()).await;

        let mut project = Project::new("P");
        store.save_project(&mut project).await.unwrap();

        let outcome = scheduler.trigger(SyncTrigger::Timer).await.unwrap();
        assert!(matches!(
            outcome,
            TriggerOutcome::Skipped(SkipReason::Offline)
        ));
        assert_eq!(remote.calls(), 0);

        connectivity.set_online(true);
        let outcome = scheduler.trigger(SyncTrigger::Timer).await.unwrap();
        assert!(matches!(outcome, TriggerOutcome::Ran(_)));
        assert!(remote.calls() > 0);

        let state = scheduler.state().borrow().clone();
        assert!(!state.is_syncing);
        assert!(state.last_sync_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn signed_out_trigger_is_dropped() {
        let remote = Arc::new(FakeRemote::new());
        let (scheduler, _store, _connectivity) =
            build(remote.clone(), true, None, SchedulerConfig::default()).await;

        let outcome = scheduler.trigger(SyncTrigger::Manual).await.unwrap();
        assert!(matches!(
            outcome,
            TriggerOutcome::Skipped(SkipReason::NotAuthenticated)
        ));
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_triggers_collapse_to_one_cycle() {
        let remote = Arc::new(FakeRemote::new());
        *remote.call_delay.lock().unwrap() = Some(Duration::from_millis(50));
        let (scheduler, _store, _connectivity) =
            build(remote.clone(), true, Some("t"), SchedulerConfig::default()).await;

        let (first, second) = tokio::join!(
            scheduler.trigger(SyncTrigger::Manual),
            scheduler.trigger(SyncTrigger::Timer),
        );

        let outcomes = [first.unwrap(), second.unwrap()];
        let ran = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, TriggerOutcome::Ran(_)))
            .count();
        let skipped = outcomes
            .iter()
            .filter(|outcome| {
                matches!(outcome, TriggerOutcome::Skipped(SkipReason::AlreadyRunning))
            })
            .count();
        assert_eq!((ran, skipped), (1, 1));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failures_enter_backoff_and_manual_bypasses_it() {
        let remote = Arc::new(FakeRemote::new());
        remote.fail_lists.store(true, AtomicOrdering::SeqCst);
        let (scheduler, store, _connectivity) =
            build(remote.clone(), true, Some("t"), SchedulerConfig::default()).await;

        let outcome = scheduler.trigger(SyncTrigger::Timer).await.unwrap();
        match outcome {
            TriggerOutcome::Ran(report) => assert!(report.failed() > 0),
            other => panic!("expected a ran cycle, got {other:?}"),
        }
        assert!(store.last_sync_at().await.unwrap().is_none());

        let outcome = scheduler.trigger(SyncTrigger::Timer).await.unwrap();
        assert!(matches!(
            outcome,
            TriggerOutcome::Skipped(SkipReason::BackingOff)
        ));

        let outcome = scheduler.trigger(SyncTrigger::Manual).await.unwrap();
        assert!(matches!(outcome, TriggerOutcome::Ran(_)));

        // A clean manual cycle resets the backoff for timer triggers.
        remote.fail_lists.store(false, AtomicOrdering::SeqCst);
        let outcome = scheduler.trigger(SyncTrigger::Manual).await.unwrap();
        assert!(matches!(outcome, TriggerOutcome::Ran(_)));
        let outcome = scheduler.trigger(SyncTrigger::Timer).await.unwrap();
        assert!(matches!(outcome, TriggerOutcome::Ran(_)));
        assert!(store.last_sync_at().await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_loop_ticks_periodically() {
        let remote = Arc::new(FakeRemote::new());
        let config = SchedulerConfig {
            period: Duration::from_millis(20),
            ..SchedulerConfig::default()
        };
        let (scheduler, _store, _connectivity) =
            build(remote.clone(), true, Some("t"), config).await;

        let handle = tokio::spawn(scheduler.run());
        tokio::time::sleep(Duration::from_millis(120)).await;
        handle.abort();

        assert!(remote.calls() > 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn connectivity_edge_triggers_a_cycle() {
        let remote = Arc::new(FakeRemote::new());
        let config = SchedulerConfig {
            period: Duration::from_secs(3600),
            ..SchedulerConfig::default()
        };
        let (scheduler, _store, connectivity) =
            build(remote.clone(), false, Some("t"), config).await;

        let handle = tokio::spawn(scheduler.clone().run());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(remote.calls(), 0);

        connectivity.set_online(true);
        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.abort();

        assert!(remote.calls() > 0);
        assert!(scheduler.state().borrow().is_online);
    }
}
