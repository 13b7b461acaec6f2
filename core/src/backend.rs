//! The persistence collaborator seam.
//!
//! The backend owns durable state and has the final say on every
//! reservation. The ledger mirrors it and calls through this trait while
//! holding the per-specialization lock, so a `false` from
//! `persist_reservation` means someone else got the slot first.
//!
//! Errors are `anyhow` so any transport can plug in; the ledger passes
//! them to its caller unchanged.

use crate::{
    event::{EventLogEntry, LedgerEvent},
    specialization::{Specialization, SpecializationKey},
    store::DeskStore,
};
use anyhow::Result;
use parking_lot::Mutex;
use std::collections::BTreeMap;

pub trait WorkloadBackend: Send + Sync {
    fn fetch_specializations(&self, category_id: &str) -> Result<Vec<Specialization>>;

    /// Claim one unit of capacity. `Ok(false)` = lost race or refused.
    fn persist_reservation(&self, counselor_id: &str, category_id: &str) -> Result<bool>;

    /// Administrator assignment that ignores capacity.
    fn persist_manual_reservation(&self, counselor_id: &str, category_id: &str) -> Result<bool>;

    fn persist_release(&self, counselor_id: &str, category_id: &str) -> Result<bool>;

    fn persist_reset(&self) -> Result<()>;

    /// Insert a new specialization or overwrite the settings of an existing one.
    fn persist_specialization(&self, spec: &Specialization, is_new: bool) -> Result<()>;

    fn persist_removal(&self, counselor_id: &str, category_id: &str) -> Result<()>;

    fn record_event(&self, _event: &LedgerEvent) -> Result<()> {
        Ok(())
    }
}

// ── In-memory backend ──────────────────────────────────────────────

#[derive(Default)]
struct MemoryState {
    specs: BTreeMap<SpecializationKey, Specialization>,
    reject_next: u32,
    failure: Option<String>,
    reservations_persisted: u64,
    releases_persisted: u64,
}

/// Backend that keeps everything in a map. Tests can make it refuse the
/// next N reservations (a simulated lost race) or fail every call.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_specializations(specs: impl IntoIterator<Item = Specialization>) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.state.lock();
            for spec in specs {
                state.specs.insert(spec.key(), spec);
            }
        }
        backend
    }

    pub fn reject_next_reservations(&self, n: u32) {
        self.state.lock().reject_next = n;
    }

    /// Every subsequent call fails with `message` until `clear_failure`.
    pub fn fail_with(&self, message: &str) {
        self.state.lock().failure = Some(message.to_string());
    }

    pub fn clear_failure(&self) {
        self.state.lock().failure = None;
    }

    pub fn reservations_persisted(&self) -> u64 {
        self.state.lock().reservations_persisted
    }

    pub fn releases_persisted(&self) -> u64 {
        self.state.lock().releases_persisted
    }

    pub fn stored(&self, counselor_id: &str, category_id: &str) -> Option<Specialization> {
        self.state
            .lock()
            .specs
            .get(&SpecializationKey::new(counselor_id, category_id))
            .cloned()
    }
}

fn check_failure(state: &MemoryState) -> Result<()> {
    match &state.failure {
        Some(msg) => Err(anyhow::anyhow!("{msg}")),
        None => Ok(()),
    }
}

impl WorkloadBackend for MemoryBackend {
    fn fetch_specializations(&self, category_id: &str) -> Result<Vec<Specialization>> {
        let state = self.state.lock();
        check_failure(&state)?;
        Ok(state
            .specs
            .values()
            .filter(|s| s.category_id == category_id)
            .cloned()
            .collect())
    }

    fn persist_reservation(&self, counselor_id: &str, category_id: &str) -> Result<bool> {
        let mut state = self.state.lock();
        check_failure(&state)?;
        if state.reject_next > 0 {
            state.reject_next -= 1;
            return Ok(false);
        }
        let key = SpecializationKey::new(counselor_id, category_id);
        if let Some(spec) = state.specs.get_mut(&key) {
            spec.current_workload += 1;
        }
        state.reservations_persisted += 1;
        Ok(true)
    }

    fn persist_manual_reservation(&self, counselor_id: &str, category_id: &str) -> Result<bool> {
        let mut state = self.state.lock();
        check_failure(&state)?;
        let key = SpecializationKey::new(counselor_id, category_id);
        if let Some(spec) = state.specs.get_mut(&key) {
            spec.current_workload += 1;
        }
        state.reservations_persisted += 1;
        Ok(true)
    }

    fn persist_release(&self, counselor_id: &str, category_id: &str) -> Result<bool> {
        let mut state = self.state.lock();
        check_failure(&state)?;
        let key = SpecializationKey::new(counselor_id, category_id);
        if let Some(spec) = state.specs.get_mut(&key) {
            spec.current_workload = spec.current_workload.saturating_sub(1);
        }
        state.releases_persisted += 1;
        Ok(true)
    }

    fn persist_reset(&self) -> Result<()> {
        let mut state = self.state.lock();
        check_failure(&state)?;
        for spec in state.specs.values_mut() {
            spec.current_workload = 0;
        }
        Ok(())
    }

    fn persist_specialization(&self, spec: &Specialization, _is_new: bool) -> Result<()> {
        let mut state = self.state.lock();
        check_failure(&state)?;
        let workload = state
            .specs
            .get(&spec.key())
            .map(|s| s.current_workload)
            .unwrap_or(spec.current_workload);
        let mut stored = spec.clone();
        stored.current_workload = workload;
        state.specs.insert(spec.key(), stored);
        Ok(())
    }

    fn persist_removal(&self, counselor_id: &str, category_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        check_failure(&state)?;
        state
            .specs
            .remove(&SpecializationKey::new(counselor_id, category_id));
        Ok(())
    }
}

// ── SQLite backend ─────────────────────────────────────────────────

/// Backend over a DeskStore. The connection is serialized behind a mutex;
/// the reservation itself is a conditional UPDATE, so two processes
/// sharing the file still cannot both take the last slot.
pub struct SqliteBackend {
    store: Mutex<DeskStore>,
}

impl SqliteBackend {
    pub fn new(store: DeskStore) -> Self {
        Self { store: Mutex::new(store) }
    }

    /// Run `f` against the underlying store (reporting, seeding).
    pub fn with_store<T>(&self, f: impl FnOnce(&DeskStore) -> T) -> T {
        f(&self.store.lock())
    }
}

impl WorkloadBackend for SqliteBackend {
    fn fetch_specializations(&self, category_id: &str) -> Result<Vec<Specialization>> {
        Ok(self.store.lock().specializations_for_category(category_id)?)
    }

    fn persist_reservation(&self, counselor_id: &str, category_id: &str) -> Result<bool> {
        Ok(self.store.lock().try_increment_workload(counselor_id, category_id)?)
    }

    fn persist_manual_reservation(&self, counselor_id: &str, category_id: &str) -> Result<bool> {
        Ok(self.store.lock().force_increment_workload(counselor_id, category_id)?)
    }

    fn persist_release(&self, counselor_id: &str, category_id: &str) -> Result<bool> {
        Ok(self.store.lock().decrement_workload(counselor_id, category_id)?)
    }

    fn persist_reset(&self) -> Result<()> {
        self.store.lock().reset_all_workloads()?;
        Ok(())
    }

    fn persist_specialization(&self, spec: &Specialization, is_new: bool) -> Result<()> {
        let store = self.store.lock();
        if is_new {
            store.insert_specialization(spec)?;
        } else {
            store.update_specialization_settings(spec)?;
        }
        Ok(())
    }

    fn persist_removal(&self, counselor_id: &str, category_id: &str) -> Result<()> {
        self.store.lock().delete_specialization(counselor_id, category_id)?;
        Ok(())
    }

    fn record_event(&self, event: &LedgerEvent) -> Result<()> {
        let entry = EventLogEntry::from_event(event)?;
        self.store.lock().append_event(&entry)?;
        Ok(())
    }
}
