//! # Sync bridge
//! Wraps a [`Store`] so that every dispatched action is applied locally right away,
//! and a subset of actions is mirrored to a remote backend in the background.
//!
//! Remote calls run as independent tasks on a [`LocalSet`] owned by the bridge. Spawning onto it
//! works from anywhere on the owning thread, but the calls only make progress while the set is
//! driven (see [`SyncBridge::driver`]). They are not ordered relative to each other: two quick edits to the same row can reach
//! the remote out of order, so the remote copy may end up older than the local one.
//! Nothing here reconciles that.

use std::{
    cell::{Ref, RefCell},
    collections::VecDeque,
    future::Future,
    rc::Rc,
};

use chrono::{DateTime, Utc};
use tokio::task::{JoinHandle, LocalSet};

use crate::{Action as _, AppState, Outcome, Store};

/// How many failed calls are kept around for inspection.
pub const FAILED_SYNC_CAPACITY: usize = 32;

/// One write against a remote table.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "verb")]
pub enum RemoteCall {
    Create {
        table: &'static str,
        row: serde_json::Value,
    },
    Update {
        table: &'static str,
        id: String,
        row: serde_json::Value,
    },
    Delete {
        table: &'static str,
        id: String,
    },
    Upsert {
        table: &'static str,
        row: serde_json::Value,
    },
}

impl RemoteCall {
    pub fn table(&self) -> &'static str {
        match self {
            RemoteCall::Create { table, .. }
            | RemoteCall::Update { table, .. }
            | RemoteCall::Delete { table, .. }
            | RemoteCall::Upsert { table, .. } => table,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            RemoteCall::Create { .. } => "create",
            RemoteCall::Update { .. } => "update",
            RemoteCall::Delete { .. } => "delete",
            RemoteCall::Upsert { .. } => "upsert",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("remote answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("remote rejected the call: {0}")]
    Rejected(String),
}

/// A remote persistence service reachable through typed per-row writes.
pub trait RemoteStore: 'static {
    fn execute(&self, call: &RemoteCall) -> impl Future<Output = Result<(), RemoteError>>;
}

/// Placeholder remote for bridges that never have a backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRemote;

impl RemoteStore for NoRemote {
    async fn execute(&self, _call: &RemoteCall) -> Result<(), RemoteError> {
        Err(RemoteError::Rejected("no remote configured".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    Syncing,
    Offline,
    Error,
}

#[derive(Debug, Clone)]
pub struct FailedSync {
    pub tag: &'static str,
    pub call: RemoteCall,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// Observability only: nothing reads this to decide correctness or retries.
#[derive(Debug)]
pub struct SyncTracker {
    status: SyncStatus,
    pending: usize,
    mirrored: u64,
    last_error: Option<String>,
    failed: VecDeque<FailedSync>,
}

impl SyncTracker {
    fn new(online: bool) -> Self {
        Self {
            status: if online {
                SyncStatus::Synced
            } else {
                SyncStatus::Offline
            },
            pending: 0,
            mirrored: 0,
            last_error: None,
            failed: VecDeque::new(),
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// Calls started but not yet finished. A call that never resolves keeps this raised forever.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Calls that reached the remote successfully, retries included.
    pub fn mirrored(&self) -> u64 {
        self.mirrored
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn failed(&self) -> impl Iterator<Item = &FailedSync> {
        self.failed.iter()
    }

    fn mark_sync_started(&mut self) {
        self.pending += 1;
        self.status = SyncStatus::Syncing;
    }

    fn mark_sync_finished(&mut self, failure: Option<FailedSync>) {
        self.pending = self.pending.saturating_sub(1);
        match failure {
            Some(failure) => {
                self.status = SyncStatus::Error;
                self.last_error = Some(failure.error.clone());
                if self.failed.len() == FAILED_SYNC_CAPACITY {
                    self.failed.pop_front();
                }
                self.failed.push_back(failure);
            }
            None => {
                self.mirrored += 1;
                if self.pending == 0 {
                    self.status = SyncStatus::Synced;
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No remote is configured.
    Offline,
    /// The action has no remote counterpart, or it changed nothing locally.
    Skipped,
    Mirrored,
    Failed(String),
}

/// Handle on the remote half of a dispatch.
/// Dropping it leaves the call running; awaiting [`SyncTask::outcome`] observes how it went,
/// as long as the bridge's [`LocalSet`] is being driven at the same time.
#[derive(Debug)]
pub struct SyncTask {
    inner: TaskInner,
}

#[derive(Debug)]
enum TaskInner {
    Ready(SyncOutcome),
    Spawned(JoinHandle<SyncOutcome>),
}

impl SyncTask {
    fn ready(outcome: SyncOutcome) -> Self {
        Self {
            inner: TaskInner::Ready(outcome),
        }
    }

    pub fn is_spawned(&self) -> bool {
        matches!(self.inner, TaskInner::Spawned(_))
    }

    pub async fn outcome(self) -> SyncOutcome {
        match self.inner {
            TaskInner::Ready(outcome) => outcome,
            TaskInner::Spawned(handle) => handle
                .await
                .unwrap_or_else(|e| SyncOutcome::Failed(format!("sync task did not finish: {e}"))),
        }
    }
}

/// The result of [`SyncBridge::dispatch`].
#[derive(Debug)]
pub struct Dispatched {
    pub outcome: Outcome,
    pub sync: SyncTask,
}

pub struct SyncBridge<S: AppState, R: RemoteStore = NoRemote> {
    store: Store<S>,
    remote: Option<Rc<R>>,
    tracker: Rc<RefCell<SyncTracker>>,
    tasks: Rc<LocalSet>,
}

impl<S: AppState> SyncBridge<S, NoRemote> {
    pub fn offline(store: Store<S>) -> Self {
        Self::new(store, None)
    }
}

impl<S: AppState, R: RemoteStore> SyncBridge<S, R> {
    pub fn new(store: Store<S>, remote: Option<R>) -> Self {
        let tracker = SyncTracker::new(remote.is_some());
        Self {
            store,
            remote: remote.map(Rc::new),
            tracker: Rc::new(RefCell::new(tracker)),
            tasks: Rc::new(LocalSet::new()),
        }
    }

    pub fn is_online(&self) -> bool {
        self.remote.is_some()
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    pub fn state(&self) -> &S {
        self.store.state()
    }

    pub fn status(&self) -> SyncStatus {
        self.tracker.borrow().status()
    }

    pub fn tracker(&self) -> Ref<'_, SyncTracker> {
        self.tracker.borrow()
    }

    /// The set remote calls are spawned on. Run futures with
    /// `driver.run_until(..)` on a tokio runtime to let the calls make progress.
    pub fn driver(&self) -> Rc<LocalSet> {
        Rc::clone(&self.tasks)
    }

    /// Apply `action` locally, then start mirroring it without waiting.
    /// Only actions that changed local state reach the remote.
    pub fn dispatch(&mut self, action: S::Action) -> Dispatched {
        let outcome = self.store.dispatch(&action);

        let Some(remote) = &self.remote else {
            return Dispatched {
                outcome,
                sync: SyncTask::ready(SyncOutcome::Offline),
            };
        };

        if !outcome.is_applied() {
            log::debug!("Not mirroring {}: {outcome:?}", action.tag());
            return Dispatched {
                outcome,
                sync: SyncTask::ready(SyncOutcome::Skipped),
            };
        }

        let sync = match self.store.state().mirror(&action) {
            Some(call) => spawn_call(
                &self.tasks,
                Rc::clone(remote),
                Rc::clone(&self.tracker),
                action.tag(),
                call,
            ),
            None => SyncTask::ready(SyncOutcome::Skipped),
        };

        Dispatched { outcome, sync }
    }

    /// Take the recorded failures out of the tracker.
    pub fn drain_failed(&self) -> Vec<FailedSync> {
        self.tracker.borrow_mut().failed.drain(..).collect()
    }

    /// Re-issue every recorded failed call. Nothing is retried unless this is called.
    pub fn retry_failed(&self) -> Vec<SyncTask> {
        let Some(remote) = &self.remote else {
            return Vec::new();
        };
        let failed = self.drain_failed();
        if !failed.is_empty() {
            log::info!("Retrying {} failed remote call(s)", failed.len());
        }
        failed
            .into_iter()
            .map(|failed| {
                spawn_call(
                    &self.tasks,
                    Rc::clone(remote),
                    Rc::clone(&self.tracker),
                    failed.tag,
                    failed.call,
                )
            })
            .collect()
    }

    pub fn into_store(self) -> Store<S> {
        self.store
    }
}

fn spawn_call<R: RemoteStore>(
    tasks: &LocalSet,
    remote: Rc<R>,
    tracker: Rc<RefCell<SyncTracker>>,
    tag: &'static str,
    call: RemoteCall,
) -> SyncTask {
    tracker.borrow_mut().mark_sync_started();

    // never hold the tracker borrow across the .await
    let handle = tasks.spawn_local(async move {
        let result = remote.execute(&call).await;
        match result {
            Ok(()) => {
                log::debug!("Mirrored {tag} as {} on {}", call.verb(), call.table());
                tracker.borrow_mut().mark_sync_finished(None);
                SyncOutcome::Mirrored
            }
            Err(e) => {
                let error = e.to_string();
                log::error!(
                    "Failed to mirror {tag} as {} on {}: {error}",
                    call.verb(),
                    call.table()
                );
                tracker.borrow_mut().mark_sync_finished(Some(FailedSync {
                    tag,
                    call,
                    error: error.clone(),
                    failed_at: Utc::now(),
                }));
                SyncOutcome::Failed(error)
            }
        }
    });

    SyncTask {
        inner: TaskInner::Spawned(handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Applied;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Names {
        names: Vec<String>,
    }

    #[derive(Clone, Debug)]
    enum NamesAction {
        Add(String),
        Clear,
    }

    impl crate::Action for NamesAction {
        fn tag(&self) -> &'static str {
            match self {
                NamesAction::Add(_) => "ADD_NAME",
                NamesAction::Clear => "CLEAR",
            }
        }
    }

    impl AppState for Names {
        type Action = NamesAction;

        fn apply(mut self, action: &NamesAction) -> Applied<Self> {
            match action {
                NamesAction::Add(name) if self.names.contains(name) => {
                    return Applied::rejected(self, "name already taken");
                }
                NamesAction::Add(name) => self.names.push(name.clone()),
                NamesAction::Clear => self.names.clear(),
            }
            Applied::changed(self)
        }

        fn mirror(&self, action: &NamesAction) -> Option<RemoteCall> {
            match action {
                NamesAction::Add(name) => Some(RemoteCall::Create {
                    table: "names",
                    row: serde_json::json!({ "name": name }),
                }),
                NamesAction::Clear => None,
            }
        }
    }

    #[derive(Default)]
    struct Recording {
        calls: RefCell<Vec<RemoteCall>>,
        reject: bool,
    }

    impl RemoteStore for Rc<Recording> {
        async fn execute(&self, call: &RemoteCall) -> Result<(), RemoteError> {
            tokio::task::yield_now().await;
            if self.reject {
                return Err(RemoteError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            self.calls.borrow_mut().push(call.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_offline_bridge_applies_locally() {
        let mut bridge = SyncBridge::offline(Store::new(Names::default()));
        let dispatched = bridge.dispatch(NamesAction::Add("ada".to_string()));
        assert_eq!(dispatched.outcome, Outcome::Applied);
        assert!(!dispatched.sync.is_spawned());
        assert_eq!(dispatched.sync.outcome().await, SyncOutcome::Offline);
        assert_eq!(bridge.status(), SyncStatus::Offline);
        assert_eq!(bridge.state().names, vec!["ada".to_string()]);
    }

    #[tokio::test]
    async fn test_mirrors_and_skips() {
        let remote = Rc::new(Recording::default());
        let mut bridge = SyncBridge::new(Store::new(Names::default()), Some(Rc::clone(&remote)));
        let driver = bridge.driver();
        driver
            .run_until(async {
                let added = bridge.dispatch(NamesAction::Add("ada".to_string()));
                assert!(added.sync.is_spawned());
                assert_eq!(bridge.status(), SyncStatus::Syncing);
                assert_eq!(bridge.tracker().pending(), 1);

                let cleared = bridge.dispatch(NamesAction::Clear);
                assert_eq!(cleared.sync.outcome().await, SyncOutcome::Skipped);

                assert_eq!(added.sync.outcome().await, SyncOutcome::Mirrored);
                assert_eq!(bridge.status(), SyncStatus::Synced);
                assert_eq!(bridge.tracker().pending(), 0);
                assert_eq!(bridge.tracker().mirrored(), 1);
            })
            .await;
        assert_eq!(remote.calls.borrow().len(), 1);
        assert_eq!(remote.calls.borrow()[0].table(), "names");
    }

    #[tokio::test]
    async fn test_refused_actions_stay_local() {
        let remote = Rc::new(Recording::default());
        let mut bridge = SyncBridge::new(Store::new(Names::default()), Some(Rc::clone(&remote)));
        let driver = bridge.driver();
        driver
            .run_until(async {
                let first = bridge.dispatch(NamesAction::Add("ada".to_string()));
                let again = bridge.dispatch(NamesAction::Add("ada".to_string()));
                assert!(matches!(again.outcome, Outcome::Rejected(_)));
                assert!(!again.sync.is_spawned());
                assert_eq!(again.sync.outcome().await, SyncOutcome::Skipped);
                assert_eq!(first.sync.outcome().await, SyncOutcome::Mirrored);
            })
            .await;
        assert_eq!(remote.calls.borrow().len(), 1);
        assert_eq!(bridge.tracker().mirrored(), 1);
    }

    #[test]
    fn test_dispatch_outside_a_runtime_does_not_panic() {
        let remote = Rc::new(Recording::default());
        let mut bridge = SyncBridge::new(Store::new(Names::default()), Some(Rc::clone(&remote)));

        // no runtime and no LocalSet context here
        let dispatched = bridge.dispatch(NamesAction::Add("ada".to_string()));
        assert_eq!(dispatched.outcome, Outcome::Applied);
        assert!(dispatched.sync.is_spawned());
        assert_eq!(bridge.state().names, vec!["ada".to_string()]);
        assert_eq!(bridge.tracker().pending(), 1);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let outcome = runtime.block_on(bridge.driver().run_until(dispatched.sync.outcome()));
        assert_eq!(outcome, SyncOutcome::Mirrored);
        assert_eq!(bridge.tracker().pending(), 0);
        assert_eq!(remote.calls.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_recorded_not_propagated() {
        let remote = Rc::new(Recording {
            reject: true,
            ..Default::default()
        });
        let mut bridge = SyncBridge::new(Store::new(Names::default()), Some(remote));
        let driver = bridge.driver();
        driver
            .run_until(async {
                let dispatched = bridge.dispatch(NamesAction::Add("ada".to_string()));
                assert_eq!(dispatched.outcome, Outcome::Applied);
                assert!(matches!(
                    dispatched.sync.outcome().await,
                    SyncOutcome::Failed(_)
                ));
            })
            .await;

        assert_eq!(bridge.state().names, vec!["ada".to_string()]);
        assert_eq!(bridge.status(), SyncStatus::Error);
        assert_eq!(bridge.tracker().failed().count(), 1);
        assert_eq!(bridge.tracker().mirrored(), 0);
        assert!(bridge.tracker().last_error().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_retry_reissues_failed_calls() {
        let remote = Rc::new(Recording {
            reject: true,
            ..Default::default()
        });
        let mut bridge = SyncBridge::new(Store::new(Names::default()), Some(remote));
        let driver = bridge.driver();
        driver
            .run_until(async {
                bridge
                    .dispatch(NamesAction::Add("ada".to_string()))
                    .sync
                    .outcome()
                    .await;

                let retries = bridge.retry_failed();
                assert_eq!(retries.len(), 1);
                for retry in retries {
                    assert!(matches!(retry.outcome().await, SyncOutcome::Failed(_)));
                }
            })
            .await;
        // the retry failed again and was recorded again
        assert_eq!(bridge.tracker().failed().count(), 1);
    }

    #[test]
    fn test_failed_ring_is_bounded() {
        let mut tracker = SyncTracker::new(true);
        for i in 0..FAILED_SYNC_CAPACITY + 5 {
            tracker.mark_sync_started();
            tracker.mark_sync_finished(Some(FailedSync {
                tag: "ADD_NAME",
                call: RemoteCall::Delete {
                    table: "names",
                    id: i.to_string(),
                },
                error: format!("failure {i}"),
                failed_at: Utc::now(),
            }));
        }
        assert_eq!(tracker.failed().count(), FAILED_SYNC_CAPACITY);
        assert_eq!(tracker.last_error(), Some("failure 36"));
        assert_eq!(tracker.pending(), 0);
    }
}
