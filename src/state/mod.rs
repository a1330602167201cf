// State management module
//
// This module provides the SettingsStore which owns the current SettingsState,
// runs every mutation through the reducer, persists the result and emits
// change events for the view layer.

pub mod reducer;

pub use reducer::{
    SettingField, SettingUpdate, SettingsAction, SettingsError, ToggleField, reduce,
};

use crate::metrics::Metrics;
use crate::models::{Section, SettingsState};
use crate::persistence::SettingsPersistence;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when settings are modified
#[derive(Clone, Debug, PartialEq)]
pub enum SettingsChange {
    /// A section was replaced by a reducer step
    SectionChanged(Section),

    /// The whole tree was replaced
    Hydrated,

    /// Settings were reset to defaults and the persisted blob removed
    Reset,
}

/// Shared settings store with persistence and event emission
///
/// Create one at startup, clone the handle into whatever needs settings, and
/// mutate only through [`dispatch()`](Self::dispatch). Lifecycle:
/// - construction loads the persisted snapshot, or the defaults if there is none
/// - every dispatch persists the new state before events go out
/// - [`reset()`](Self::reset) clears the persisted blob
/// - there is no teardown
///
/// Clones share the same state, persistence and channel.
pub struct SettingsStore {
    /// Current tree; replaced wholesale on each dispatch
    state: Arc<RwLock<SettingsState>>,

    /// Broadcast channel for emitting change events
    change_tx: broadcast::Sender<SettingsChange>,

    persistence: SettingsPersistence,

    metrics: Arc<Metrics>,
}

impl SettingsStore {
    /// Create a store, hydrating from `persistence` when it holds a snapshot
    ///
    /// # Returns
    /// A new SettingsStore with a broadcast channel buffer of 100 events
    pub fn new(persistence: SettingsPersistence) -> Self {
        Self::with_metrics(persistence, Arc::new(Metrics::new()))
    }

    pub fn with_metrics(persistence: SettingsPersistence, metrics: Arc<Metrics>) -> Self {
        let initial = match persistence.load() {
            Some(stored) => {
                tracing::info!("Loaded persisted settings from storage key {}", persistence.key());
                stored
            }
            None => {
                tracing::debug!("No persisted settings, using defaults");
                SettingsState::default()
            }
        };

        let (change_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(initial)),
            change_tx,
            persistence,
            metrics,
        }
    }

    /// Get a snapshot of the current state
    ///
    /// Sections are shared, so this is a few reference count bumps.
    pub fn snapshot(&self) -> SettingsState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let muted = !store.read(|s| s.sounds.enabled);
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SettingsState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Apply an action, persist the result and emit change events
    ///
    /// # Returns
    /// The events that were emitted
    pub fn dispatch(&self, action: SettingsAction) -> Vec<SettingsChange> {
        let hydrate = matches!(action, SettingsAction::Hydrate(_));
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let next = reduce(&state, action);
        let changes = if hydrate {
            vec![SettingsChange::Hydrated]
        } else {
            next.changed_sections(&state)
                .into_iter()
                .map(SettingsChange::SectionChanged)
                .collect()
        };

        *state = next;
        self.metrics.record_settings_update();

        // Persist while still holding the lock so writes land in dispatch order
        if !self.persistence.persist(&state) && self.persistence.is_available() {
            self.metrics.record_persist_failure();
        }
        drop(state);

        for change in &changes {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.change_tx.send(change.clone());
        }

        changes
    }

    // Convenience methods for common actions

    pub fn toggle(&self, field: ToggleField) -> Vec<SettingsChange> {
        self.dispatch(SettingsAction::Toggle(field))
    }

    pub fn set(&self, update: SettingUpdate) -> Vec<SettingsChange> {
        self.dispatch(SettingsAction::Set(update))
    }

    pub fn hydrate(&self, state: SettingsState) -> Vec<SettingsChange> {
        self.dispatch(SettingsAction::Hydrate(state))
    }

    /// Clear the persisted blob and return to defaults
    ///
    /// The defaults are not written back; storage stays empty until the next
    /// dispatch.
    pub fn reset(&self) -> Vec<SettingsChange> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        self.persistence.reset();
        *state = SettingsState::default();
        drop(state);

        tracing::info!("Settings reset to defaults");
        let _ = self.change_tx.send(SettingsChange::Reset);
        vec![SettingsChange::Reset]
    }

    /// Subscribe to change events
    ///
    /// Returns a receiver that will get notified of all future changes.
    pub fn subscribe(&self) -> broadcast::Receiver<SettingsChange> {
        self.change_tx.subscribe()
    }

    pub fn persistence(&self) -> &SettingsPersistence {
        &self.persistence
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

// Make SettingsStore cloneable for sharing across components
impl Clone for SettingsStore {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            change_tx: self.change_tx.clone(),
            persistence: self.persistence.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}
