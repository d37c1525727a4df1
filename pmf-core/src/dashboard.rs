use std::cell::Ref;
use std::rc::Rc;

use tether::snapshot::{FileStorage, LocalSnapshot, SnapshotError};
use tether::supabase::SupabaseRemote;
use tether::sync::{Dispatched, NoRemote, RemoteStore, SyncBridge, SyncStatus, SyncTask, SyncTracker};
use tether::{ListenerKey, Store};
use tokio::task::LocalSet;

use crate::action::Action;
use crate::config::DashboardConfig;
use crate::model::{ContentQueueItem, Experiment, Lead, LeadStage};
use crate::state::PmfState;
use crate::{export, seed};

/// The composition root: one store, its snapshot writer and its sync bridge.
///
/// Dispatching never blocks and works without a runtime. Remote calls queue up on the
/// bridge's [`LocalSet`] and only make progress while [`Dashboard::driver`] is being run.
pub struct Dashboard<R: RemoteStore = SupabaseRemote> {
    bridge: SyncBridge<PmfState, R>,
    snapshot: LocalSnapshot,
    writer: ListenerKey,
}

impl Dashboard<SupabaseRemote> {
    /// Restore from the configured data directory, or start from the demo data.
    /// Syncs to Supabase when the config has credentials.
    pub fn open(config: &DashboardConfig) -> Result<Self, SnapshotError> {
        crate::init_logging();

        let storage = FileStorage::new(&config.data_dir)?;
        let snapshot = LocalSnapshot::new(storage, config.storage_key.clone());
        let remote = config.supabase.as_ref().map(SupabaseRemote::new);
        Ok(Self::open_with(snapshot, remote, seed::demo_state()))
    }
}

impl Dashboard<NoRemote> {
    pub fn offline(snapshot: LocalSnapshot, seed: PmfState) -> Self {
        Self::open_with(snapshot, None, seed)
    }
}

impl<R: RemoteStore> Dashboard<R> {
    /// `seed` is used only when `snapshot` has nothing readable.
    pub fn open_with(snapshot: LocalSnapshot, remote: Option<R>, seed: PmfState) -> Self {
        let mut store = Store::new(seed);
        if let Some(restored) = snapshot.restore::<PmfState>() {
            store.dispatch(&Action::LoadState(Box::new(restored)));
        }
        // subscribed after the restore so rehydrating doesn't rewrite the snapshot it came from
        let writer = store.subscribe(snapshot.writer());

        let bridge = SyncBridge::new(store, remote);
        log::info!(
            "Dashboard opened with {} leads ({})",
            bridge.state().leads.len(),
            if bridge.is_online() { "online" } else { "offline" }
        );
        Self {
            bridge,
            snapshot,
            writer,
        }
    }

    pub fn dispatch(&mut self, action: Action) -> Dispatched {
        self.bridge.dispatch(action)
    }

    pub fn state(&self) -> &PmfState {
        self.bridge.state()
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.bridge.status()
    }

    pub fn tracker(&self) -> Ref<'_, SyncTracker> {
        self.bridge.tracker()
    }

    /// Run futures with `driver.run_until(..)` to let queued remote calls make progress.
    pub fn driver(&self) -> Rc<LocalSet> {
        self.bridge.driver()
    }

    /// Re-issue remote calls that failed earlier.
    pub fn retry_failed(&self) -> Vec<SyncTask> {
        self.bridge.retry_failed()
    }

    pub fn lead(&self, id: &str) -> Option<&Lead> {
        self.state().lead(id)
    }

    pub fn experiment(&self, id: &str) -> Option<&Experiment> {
        self.state().experiment(id)
    }

    pub fn leads_in_stage(&self, stage: LeadStage) -> impl Iterator<Item = &Lead> {
        self.state().leads_in_stage(stage)
    }

    pub fn queue_for_plan<'a>(&'a self, plan_id: &'a str) -> impl Iterator<Item = &'a ContentQueueItem> {
        self.state().queue_for_plan(plan_id)
    }

    pub fn leads_csv(&self) -> String {
        export::leads_csv(self.state())
    }

    /// Stop persisting, write one final snapshot and hand back the state.
    /// Remote calls still in flight keep running only if a [`Dashboard::driver`] handle outlives this.
    pub fn close(self) -> PmfState {
        let mut store = self.bridge.into_store();
        store.unsubscribe(self.writer);
        let state = store.teardown();
        self.snapshot.persist(&state);
        log::info!("Dashboard closed");
        state
    }
}
