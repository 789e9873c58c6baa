//! Application state shared across request handlers.
//!
//! All records live in typed in-memory stores keyed by UUID. A store hands
//! out clones; mutation goes through [`Store::update`] or
//! [`Store::try_update`], which run the closure under the write lock so a
//! read-validate-mutate sequence on one record is atomic with respect to
//! every other request touching it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tribunal_calendar::{RescheduleRequest, ScheduleRule};
use tribunal_hearing::policy::{GRACE_WINDOW_DEFAULT_SECONDS, GRACE_WINDOW_MAX_SECONDS};
use tribunal_hearing::{Hearing, Question, Statement};

use crate::events::EventBus;

// ── Store ──────────────────────────────────────────────────────────────

/// A thread-safe, in-memory store of records keyed by UUID.
#[derive(Debug)]
pub struct Store<T> {
    inner: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace the record under `id`.
    pub fn insert(&self, id: Uuid, value: T) {
        self.inner.write().insert(id, value);
    }

    /// Fetch a clone of the record under `id`.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.inner.read().get(id).cloned()
    }

    /// Clones of all records, in arbitrary order.
    pub fn list(&self) -> Vec<T> {
        self.inner.read().values().cloned().collect()
    }

    /// Clones of the records matching a predicate.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.inner
            .read()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// Run a mutation under the write lock, returning the closure's value.
    ///
    /// Returns `None` when no record exists under `id`.
    pub fn update<R>(&self, id: &Uuid, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.inner.write().get_mut(id).map(f)
    }

    /// Run a fallible mutation under the write lock.
    ///
    /// The outer `Option` distinguishes a missing record from a closure
    /// failure, so handlers can map them to different HTTP statuses.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.inner.write().get_mut(id).map(f)
    }

    /// Remove and return the record under `id`.
    pub fn remove(&self, id: &Uuid) -> Option<T> {
        self.inner.write().remove(id)
    }

    /// Whether a record exists under `id`.
    pub fn contains(&self, id: &Uuid) -> bool {
        self.inner.read().contains_key(id)
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

// ── Configuration ──────────────────────────────────────────────────────

fn default_bind_addr() -> SocketAddr {
    "127.0.0.1:8080".parse().unwrap()
}

fn default_grace_seconds() -> u64 {
    GRACE_WINDOW_DEFAULT_SECONDS
}

/// Server configuration, loaded from a YAML file by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Grace window opened on every floor-setting change, in seconds.
    /// Values above the allowed maximum are clamped at startup.
    pub grace_seconds: u64,
    /// Scheduling rules for availability search and negotiation.
    pub schedule_rule: ScheduleRule,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            grace_seconds: default_grace_seconds(),
            schedule_rule: ScheduleRule::default(),
        }
    }
}

impl AppConfig {
    /// Clamp out-of-range values into their supported ranges.
    pub fn normalized(mut self) -> Self {
        self.grace_seconds = self.grace_seconds.min(GRACE_WINDOW_MAX_SECONDS);
        self
    }
}

// ── State ──────────────────────────────────────────────────────────────

/// Shared application state, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<AppConfig>,
    /// All hearings, keyed by hearing UUID.
    pub hearings: Store<Hearing>,
    /// Transcript statements, keyed by statement UUID.
    pub statements: Store<Statement>,
    /// Posed questions, keyed by question UUID.
    pub questions: Store<Question>,
    /// Reschedule requests, keyed by request UUID.
    pub reschedules: Store<RescheduleRequest>,
    /// Per-hearing session event channels.
    pub events: Arc<EventBus>,
}

impl AppState {
    /// Build fresh state from configuration.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config.normalized()),
            hearings: Store::new(),
            statements: Store::new(),
            questions: Store::new(),
            reschedules: Store::new(),
            events: Arc::new(EventBus::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_insert_get_remove() {
        let store: Store<String> = Store::new();
        let id = Uuid::new_v4();
        assert!(store.is_empty());
        store.insert(id, "hello".to_string());
        assert_eq!(store.get(&id).as_deref(), Some("hello"));
        assert!(store.contains(&id));
        assert_eq!(store.len(), 1);
        assert_eq!(store.remove(&id).as_deref(), Some("hello"));
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn update_mutates_in_place() {
        let store: Store<u32> = Store::new();
        let id = Uuid::new_v4();
        store.insert(id, 1);
        let result = store.update(&id, |v| {
            *v += 1;
            *v
        });
        assert_eq!(result, Some(2));
        assert_eq!(store.get(&id), Some(2));
        assert_eq!(store.update(&Uuid::new_v4(), |v| *v), None);
    }

    #[test]
    fn try_update_separates_missing_from_failed() {
        let store: Store<u32> = Store::new();
        let id = Uuid::new_v4();
        store.insert(id, 1);

        let ok: Option<Result<u32, String>> = store.try_update(&id, |v| {
            *v += 1;
            Ok(*v)
        });
        assert_eq!(ok, Some(Ok(2)));

        let failed: Option<Result<u32, String>> =
            store.try_update(&id, |_| Err("nope".to_string()));
        assert_eq!(failed, Some(Err("nope".to_string())));
        // The failed closure left the value untouched.
        assert_eq!(store.get(&id), Some(2));

        let missing: Option<Result<u32, String>> =
            store.try_update(&Uuid::new_v4(), |_| Ok(0));
        assert!(missing.is_none());
    }

    #[test]
    fn default_store_starts_empty() {
        let store: Store<u32> = Store::default();
        assert!(store.is_empty());
    }

    #[test]
    fn filter_selects_matching_records() {
        let store: Store<u32> = Store::new();
        for v in 0..10 {
            store.insert(Uuid::new_v4(), v);
        }
        let even = store.filter(|v| v % 2 == 0);
        assert_eq!(even.len(), 5);
    }

    #[test]
    fn config_normalization_clamps_grace() {
        let config = AppConfig {
            grace_seconds: 30,
            ..AppConfig::default()
        }
        .normalized();
        assert_eq!(config.grace_seconds, GRACE_WINDOW_MAX_SECONDS);

        let config = AppConfig::default().normalized();
        assert_eq!(config.grace_seconds, GRACE_WINDOW_DEFAULT_SECONDS);
    }

    #[test]
    fn default_config_is_sane() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.grace_seconds, GRACE_WINDOW_DEFAULT_SECONDS);
        assert!(config.schedule_rule.validate().is_ok());
    }
}
