//! # Store
//! A single-writer state container. The store owns the only copy of the state;
//! consumers get read-only references and change it by dispatching actions.

use slotmap::SlotMap;

use crate::{Action as _, AppState};

slotmap::new_key_type! {
    /// Handle returned by [`Store::subscribe`], used to unsubscribe.
    pub struct ListenerKey;
}

type Listener<S> = Box<dyn FnMut(&S)>;

/// What a dispatch did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The state changed.
    Applied,
    /// The action referred to an entity that does not exist. The state is unchanged.
    NoMatch,
    /// The action would have broken an invariant. The state is unchanged.
    Rejected(&'static str),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

pub struct Store<S: AppState> {
    state: S,
    listeners: SlotMap<ListenerKey, Listener<S>>,
    applied_count: u64,
}

impl<S: AppState> Store<S> {
    pub fn new(initial_state: S) -> Self {
        Self {
            state: initial_state,
            listeners: SlotMap::with_key(),
            applied_count: 0,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// A clone of the current state.
    pub fn snapshot(&self) -> S {
        self.state.clone()
    }

    /// Number of dispatches that changed the state since construction.
    pub fn applied_count(&self) -> u64 {
        self.applied_count
    }

    /// Apply an action synchronously. Listeners run before this returns, and only if the state changed.
    pub fn dispatch(&mut self, action: &S::Action) -> Outcome {
        let applied = self.state.clone().apply(action);

        match applied.outcome {
            Outcome::Applied => {
                self.state = applied.state;
                self.applied_count += 1;
                for listener in self.listeners.values_mut() {
                    listener(&self.state);
                }
            }
            Outcome::NoMatch => {
                log::debug!("{} matched nothing, state unchanged", action.tag());
            }
            Outcome::Rejected(reason) => {
                log::warn!("{} rejected: {reason}", action.tag());
            }
        }

        applied.outcome
    }

    /// Register a listener that is called with the new state after every applied dispatch.
    /// Listeners must not dispatch to the store they are registered on.
    pub fn subscribe(&mut self, listener: impl FnMut(&S) + 'static) -> ListenerKey {
        self.listeners.insert(Box::new(listener))
    }

    pub fn unsubscribe(&mut self, key: ListenerKey) {
        if self.listeners.remove(key).is_none() {
            log::warn!("Tried to unsubscribe a listener that was not registered");
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Drop every listener and hand back the final state.
    pub fn teardown(mut self) -> S {
        self.listeners.clear();
        self.state
    }
}
