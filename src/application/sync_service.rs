//! Synchronization engine.
//!
//! Pulls candidate quotes from a [`QuoteSource`], merges them into the shared
//! [`QuoteStore`] under the local-wins policy and reports the outcome to a
//! [`NotificationSink`]. At most one cycle runs at a time; a trigger that
//! arrives while a cycle is in flight is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;

use crate::domain::{merge, Result, SyncConfig, SyncReport};
use crate::infrastructure::QuoteSource;

use super::notification::NotificationSink;
use super::quote_store::QuoteStore;

/// Store handle shared between the sync engine and user commands.
pub type SharedStore = Arc<Mutex<QuoteStore>>;

/// What a call to [`SyncEngine::run_cycle`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Candidates were merged and the store persisted.
    Completed(SyncReport),
    /// The pull failed; nothing was merged and no report was emitted.
    Abandoned,
    /// Another cycle was already in flight.
    Skipped,
}

/// Clears the in-flight flag when a cycle ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Reconciles remote candidates into the local store.
pub struct SyncEngine<S, N> {
    store: SharedStore,
    source: S,
    notifier: N,
    in_flight: AtomicBool,
}

impl<S: QuoteSource, N: NotificationSink> SyncEngine<S, N> {
    /// Create an engine over a shared store.
    pub const fn new(store: SharedStore, source: S, notifier: N) -> Self {
        Self {
            store,
            source,
            notifier,
            in_flight: AtomicBool::new(false),
        }
    }

    /// The shared store this engine writes to.
    pub const fn store(&self) -> &SharedStore {
        &self.store
    }

    /// The remote source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Whether a cycle is currently in flight.
    #[cfg(test)]
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one pull-merge-persist-notify cycle.
    ///
    /// The store lock is not held during the pull. The merge is computed
    /// against the collection as persisted when the pull returns, inside the
    /// database write lock, so quotes added while the fetch was pending are
    /// kept, even when another process added them.
    ///
    /// # Errors
    /// Returns error only when the merged collection or the sync bookkeeping
    /// cannot be persisted. Network failures yield `CycleOutcome::Abandoned`.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::debug!("Sync cycle already in flight, dropping trigger");
            return Ok(CycleOutcome::Skipped);
        };

        {
            let store = self.store.lock().await;
            let state = store.storage().get_sync_state()?.syncing();
            store.storage().update_sync_state(&state)?;
        }

        let start = Instant::now();

        let incoming = match self.source.pull().await {
            Ok(quotes) => quotes,
            Err(e) => {
                tracing::warn!(error = %e, network = e.is_network(), "Sync cycle abandoned");
                let store = self.store.lock().await;
                let state = store.storage().get_sync_state()?.with_error(e.to_string());
                store.storage().update_sync_state(&state)?;
                return Ok(CycleOutcome::Abandoned);
            }
        };

        let report = {
            let mut store = self.store.lock().await;
            let applied = store.update(|current| {
                let outcome = merge(current, &incoming);
                (outcome.merged, outcome.report)
            });

            let report = match applied {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to persist merged quotes");
                    let recorded = store.storage().get_sync_state().and_then(|state| {
                        store
                            .storage()
                            .update_sync_state(&state.with_error(e.to_string()))
                    });
                    if let Err(record_err) = recorded {
                        tracing::warn!(error = %record_err, "Failed to record sync error");
                    }
                    return Err(e);
                }
            };

            let state = store.storage().get_sync_state()?.completed(&report);
            store.storage().update_sync_state(&state)?;
            report
        };

        tracing::info!(
            fetched = incoming.len(),
            added = report.added_count,
            conflicts = report.conflicted_texts.len(),
            duration_ms = start.elapsed().as_millis(),
            "Sync completed"
        );

        self.notifier.notify(&report.message());

        Ok(CycleOutcome::Completed(report))
    }

    /// Run cycles on a fixed interval until `shutdown` fires or is dropped.
    ///
    /// The first cycle runs immediately when `sync_on_startup` is set.
    /// Ticks missed while a cycle was running are skipped, not replayed.
    pub async fn run(&self, config: &SyncConfig, mut shutdown: mpsc::Receiver<()>) {
        let period = config.interval();
        tracing::info!(interval_secs = period.as_secs(), "Sync daemon starting");

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if !config.sync_on_startup {
            // The first tick completes immediately
            ticker.tick().await;
        }

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        tracing::error!(error = %e, "Sync cycle failed to persist");
                    }
                }

                _ = shutdown.recv() => {
                    tracing::info!("Sync daemon shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use tempfile::{tempdir, TempDir};
    use tokio::sync::Notify;

    use super::*;
    use crate::domain::{default_quotes, AppError, Quote};
    use crate::infrastructure::LocalStorage;

    /// Returns queued responses in order, then empty batches.
    #[derive(Default)]
    struct ScriptedSource {
        responses: std::sync::Mutex<VecDeque<Result<Vec<Quote>>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn with(responses: Vec<Result<Vec<Quote>>>) -> Self {
            Self {
                responses: std::sync::Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl QuoteSource for ScriptedSource {
        async fn pull(&self) -> Result<Vec<Quote>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    /// Blocks every pull until the gate is opened.
    struct GatedSource {
        gate: Notify,
        batch: Vec<Quote>,
    }

    impl QuoteSource for GatedSource {
        async fn pull(&self) -> Result<Vec<Quote>> {
            self.gate.notified().await;
            Ok(self.batch.clone())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        messages: std::sync::Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl NotificationSink for RecordingSink {
        fn notify(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    fn shared_store(dir: &TempDir, quotes: Vec<Quote>) -> SharedStore {
        let storage = LocalStorage::open(&dir.path().join("sync.db")).unwrap();
        let mut store = QuoteStore::load(storage).unwrap();
        store.replace_all(quotes).unwrap();
        Arc::new(Mutex::new(store))
    }

    fn q(text: &str, category: &str) -> Quote {
        Quote::new(text, category)
    }

    #[tokio::test]
    async fn test_cycle_merges_and_notifies() {
        let dir = tempdir().unwrap();
        let store = shared_store(&dir, vec![q("Life is short", "Life")]);
        let source = ScriptedSource::with(vec![Ok(vec![
            q("Life is short", "General"),
            q("Be kind", "General"),
        ])]);
        let engine = SyncEngine::new(store, source, RecordingSink::default());

        let outcome = engine.run_cycle().await.unwrap();

        let expected = SyncReport {
            added_count: 1,
            conflicted_texts: vec!["Life is short".into()],
        };
        assert_eq!(outcome, CycleOutcome::Completed(expected.clone()));
        assert_eq!(
            engine.store().lock().await.snapshot(),
            vec![q("Life is short", "Life"), q("Be kind", "General")]
        );
        assert_eq!(engine.notifier.messages(), vec![expected.message()]);
        assert!(!engine.is_syncing());
    }

    #[tokio::test]
    async fn test_merged_result_is_persisted() {
        let dir = tempdir().unwrap();
        let store = shared_store(&dir, Vec::new());
        let source = ScriptedSource::with(vec![Ok(vec![q("Be kind", "General")])]);
        let engine = SyncEngine::new(store, source, RecordingSink::default());

        engine.run_cycle().await.unwrap();
        drop(engine);

        let storage = LocalStorage::open(&dir.path().join("sync.db")).unwrap();
        let state = storage.get_sync_state().unwrap();
        let reloaded = QuoteStore::load(storage).unwrap();

        assert_eq!(reloaded.snapshot(), vec![q("Be kind", "General")]);
        assert_eq!(state.total_cycles, 1);
        assert_eq!(state.last_added, 1);
        assert!(!state.is_syncing);
    }

    #[tokio::test]
    async fn test_network_failure_abandons_cycle() {
        let dir = tempdir().unwrap();
        let store = shared_store(&dir, default_quotes());
        let source = ScriptedSource::with(vec![Err(AppError::network_message("status 503"))]);
        let engine = SyncEngine::new(store, source, RecordingSink::default());

        let outcome = engine.run_cycle().await.unwrap();

        assert_eq!(outcome, CycleOutcome::Abandoned);
        assert_eq!(engine.store().lock().await.snapshot(), default_quotes());
        assert!(engine.notifier.messages().is_empty());

        let state = engine
            .store()
            .lock()
            .await
            .storage()
            .get_sync_state()
            .unwrap();
        assert!(state.last_error.unwrap().contains("status 503"));
        assert!(!state.is_syncing);
        assert!(!engine.is_syncing());
    }

    #[tokio::test]
    async fn test_next_cycle_retries_after_failure() {
        let dir = tempdir().unwrap();
        let store = shared_store(&dir, Vec::new());
        let source = ScriptedSource::with(vec![
            Err(AppError::network_message("timeout")),
            Ok(vec![q("Be kind", "General")]),
        ]);
        let engine = SyncEngine::new(store, source, RecordingSink::default());

        assert_eq!(engine.run_cycle().await.unwrap(), CycleOutcome::Abandoned);
        assert!(matches!(
            engine.run_cycle().await.unwrap(),
            CycleOutcome::Completed(_)
        ));
        assert_eq!(engine.store().lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_batch_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = shared_store(&dir, Vec::new());
        let batch = vec![q("A", "General"), q("B", "General")];
        let source = ScriptedSource::with(vec![Ok(batch.clone()), Ok(batch)]);
        let engine = SyncEngine::new(store, source, RecordingSink::default());

        engine.run_cycle().await.unwrap();
        let second = engine.run_cycle().await.unwrap();

        assert_eq!(
            second,
            CycleOutcome::Completed(SyncReport {
                added_count: 0,
                conflicted_texts: vec!["A".into(), "B".into()],
            })
        );
        assert_eq!(engine.store().lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_overlapping_trigger_is_skipped() {
        let dir = tempdir().unwrap();
        let store = shared_store(&dir, Vec::new());
        let source = GatedSource {
            gate: Notify::new(),
            batch: vec![q("Remote", "General")],
        };
        let engine = SyncEngine::new(store, source, RecordingSink::default());

        let (first, second) = tokio::join!(engine.run_cycle(), async {
            while !engine.is_syncing() {
                tokio::task::yield_now().await;
            }
            let second = engine.run_cycle().await.unwrap();
            engine.source().gate.notify_one();
            second
        });

        assert_eq!(second, CycleOutcome::Skipped);
        assert!(matches!(first.unwrap(), CycleOutcome::Completed(_)));
        assert_eq!(engine.notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_add_during_pull_is_kept() {
        let dir = tempdir().unwrap();
        let store = shared_store(&dir, vec![q("Old", "Life")]);
        let source = GatedSource {
            gate: Notify::new(),
            batch: vec![q("Typed during fetch", "General"), q("Remote", "General")],
        };
        let engine = SyncEngine::new(store, source, RecordingSink::default());

        let (outcome, ()) = tokio::join!(engine.run_cycle(), async {
            while !engine.is_syncing() {
                tokio::task::yield_now().await;
            }
            engine
                .store()
                .lock()
                .await
                .add(q("Typed during fetch", "Life"))
                .unwrap();
            engine.source().gate.notify_one();
        });

        assert_eq!(
            outcome.unwrap(),
            CycleOutcome::Completed(SyncReport {
                added_count: 1,
                conflicted_texts: vec!["Typed during fetch".into()],
            })
        );
        assert_eq!(
            engine.store().lock().await.snapshot(),
            vec![
                q("Old", "Life"),
                q("Typed during fetch", "Life"),
                q("Remote", "General"),
            ]
        );
    }

    #[tokio::test]
    async fn test_add_from_another_handle_survives_cycle() {
        let dir = tempdir().unwrap();
        let store = shared_store(&dir, default_quotes());
        let source = ScriptedSource::with(vec![Ok(vec![q("Remote", "General")])]);
        let engine = SyncEngine::new(store, source, RecordingSink::default());

        // A separate command process writing to the same file
        let cli_storage = LocalStorage::open(&dir.path().join("sync.db")).unwrap();
        let mut cli_store = QuoteStore::load(cli_storage).unwrap();
        cli_store.add(q("Typed by user", "Life")).unwrap();

        engine.run_cycle().await.unwrap();

        let mut expected = default_quotes();
        expected.push(q("Typed by user", "Life"));
        expected.push(q("Remote", "General"));

        assert_eq!(engine.store().lock().await.snapshot(), expected);
        let on_disk =
            QuoteStore::load(LocalStorage::open(&dir.path().join("sync.db")).unwrap()).unwrap();
        assert_eq!(on_disk.snapshot(), expected);
    }

    #[tokio::test]
    async fn test_persistence_failure_is_recorded() {
        let dir = tempdir().unwrap();
        let store = shared_store(&dir, vec![q("Old", "Life")]);
        let source = ScriptedSource::with(vec![Ok(vec![q("Remote", "General")])]);
        let engine = SyncEngine::new(store, source, RecordingSink::default());

        rusqlite::Connection::open(dir.path().join("sync.db"))
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_quotes BEFORE INSERT ON kv WHEN NEW.key = 'quotes'
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )
            .unwrap();

        let err = engine.run_cycle().await.unwrap_err();
        assert!(matches!(err, AppError::Persistence { .. }));
        assert!(engine.notifier.messages().is_empty());

        let store = engine.store().lock().await;
        assert_eq!(
            store.snapshot(),
            vec![q("Old", "Life"), q("Remote", "General")]
        );

        let state = store.storage().get_sync_state().unwrap();
        assert!(!state.is_syncing);
        assert!(state.last_error.is_some());
        assert_eq!(state.total_cycles, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_daemon_runs_on_interval() {
        let dir = tempdir().unwrap();
        let store = shared_store(&dir, Vec::new());
        let engine = SyncEngine::new(store, ScriptedSource::default(), RecordingSink::default());
        let config = SyncConfig {
            interval_secs: 30,
            sync_on_startup: true,
            ..Default::default()
        };
        let (tx, rx) = mpsc::channel(1);

        tokio::join!(engine.run(&config, rx), async {
            tokio::time::sleep(Duration::from_secs(95)).await;
            tx.send(()).await.unwrap();
        });

        // Ticks at 0s, 30s, 60s and 90s
        assert_eq!(engine.source().calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_daemon_without_startup_cycle() {
        let dir = tempdir().unwrap();
        let store = shared_store(&dir, Vec::new());
        let engine = SyncEngine::new(store, ScriptedSource::default(), RecordingSink::default());
        let config = SyncConfig {
            interval_secs: 30,
            sync_on_startup: false,
            ..Default::default()
        };
        let (tx, rx) = mpsc::channel(1);

        tokio::join!(engine.run(&config, rx), async {
            tokio::time::sleep(Duration::from_secs(95)).await;
            drop(tx);
        });

        assert_eq!(engine.source().calls(), 3);
    }
}
