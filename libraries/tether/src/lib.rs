//! This is a library for local-first application state.
//! It was created for the PMF dashboard, so it doesn't include much that was not needed for that project.
//!
//! Strategy:
//! 1. All application state lives in a single [`Store`]. The only way to change it is to dispatch an action,
//!    which is applied by a pure reducer ([`AppState::apply`]).
//! 2. After every change the whole state is written to local storage as a snapshot ([`snapshot`]).
//!    On startup the snapshot is read back; if it is missing or unreadable the app starts from its seed data.
//! 3. If a remote backend is configured, the [`sync::SyncBridge`] mirrors a subset of actions to it in the background.
//!    Remote calls never block dispatch, are never retried automatically, and never roll back local state.
//!
//! Local state always wins. The remote copy is advisory and can silently drift from it.

pub mod snapshot;
pub mod store;
pub mod sync;

#[cfg(feature = "supabase")]
pub mod supabase;

pub use store::{ListenerKey, Outcome, Store};
pub use sync::RemoteCall;

/// An action that can be dispatched to a [`Store`].
pub trait Action: Clone + 'static {
    /// A stable name for the action, used in logs and sync bookkeeping.
    fn tag(&self) -> &'static str;
}

/// Core trait for reducer-driven state.
pub trait AppState: Sized + Clone + 'static {
    type Action: Action;

    /// Apply an action, producing the next state.
    /// Must be pure: the result depends only on `self` and `action`.
    fn apply(self, action: &Self::Action) -> Applied<Self>;

    /// Translate an action that has just been applied into at most one remote call.
    /// `self` is the state *after* the action was applied, so rows can carry derived fields.
    /// Not consulted for actions whose outcome was not [`Outcome::Applied`].
    fn mirror(&self, _action: &Self::Action) -> Option<RemoteCall> {
        None
    }
}

/// The result of applying one action.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied<S> {
    pub state: S,
    pub outcome: Outcome,
}

impl<S> Applied<S> {
    pub fn changed(state: S) -> Self {
        Self {
            state,
            outcome: Outcome::Applied,
        }
    }

    pub fn no_match(state: S) -> Self {
        Self {
            state,
            outcome: Outcome::NoMatch,
        }
    }

    pub fn rejected(state: S, reason: &'static str) -> Self {
        Self {
            state,
            outcome: Outcome::Rejected(reason),
        }
    }
}
