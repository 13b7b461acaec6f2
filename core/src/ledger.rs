//! Workload Ledger: the single owner of specialization state.
//!
//! RULES:
//!   - Only reserve/release/reset and administrator edits mutate a
//!     specialization. Everything else reads snapshots.
//!   - Each (counselor, category) pair has its own lock. The capacity
//!     check, the backend write and the local increment happen under it,
//!     so one unit of capacity is handed out at most once.
//!   - The backend is called before the local mirror changes. A backend
//!     error leaves the mirror untouched and is returned as-is.

use crate::{
    backend::WorkloadBackend,
    clock::Clock,
    error::{DeskError, DeskResult},
    event::LedgerEvent,
    reporting::{self, CategoryCoverage, CounselorWorkload},
    scoring::can_take_ticket,
    specialization::{Specialization, SpecializationKey},
    validation::{SpecializationDraft, SpecializationUpdate},
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};

/// Result of a capacity claim. Only `Reserved` changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReserveOutcome {
    Reserved { current_workload: u32 },
    /// The counselor switched themselves off for this category.
    Unavailable,
    AtCapacity,
    /// The backend refused; another writer took the slot first.
    Rejected,
}

impl ReserveOutcome {
    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::Reserved { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReleaseOutcome {
    Released { current_workload: u32 },
    /// Workload was already zero; nothing was decremented.
    Underflow,
}

struct Slot {
    spec: Specialization,
    /// Set when the specialization is removed while another caller still
    /// holds the slot handle.
    retired: bool,
}

type SlotHandle = Arc<Mutex<Slot>>;

pub struct WorkloadLedger {
    slots:   RwLock<BTreeMap<SpecializationKey, SlotHandle>>,
    backend: Arc<dyn WorkloadBackend>,
    clock:   Arc<dyn Clock>,
    events:  Mutex<Vec<LedgerEvent>>,
}

impl WorkloadLedger {
    pub fn new(backend: Arc<dyn WorkloadBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: RwLock::new(BTreeMap::new()),
            backend,
            clock,
            events: Mutex::new(Vec::new()),
        }
    }

    // ── Loading ────────────────────────────────────────────────

    /// Replace the local mirror of one category with the backend's view.
    /// Returns the number of specializations now held for the category.
    ///
    /// The category's slots stay locked across the fetch, so a reservation
    /// in flight on this ledger is either fully in the fetched rows or
    /// not started.
    pub fn load_category(&self, category_id: &str) -> DeskResult<usize> {
        let mut slots = self.slots.write();
        let held: Vec<(SpecializationKey, SlotHandle)> = slots
            .iter()
            .filter(|(k, _)| k.category_id == category_id)
            .map(|(k, h)| (k.clone(), Arc::clone(h)))
            .collect();
        let mut guards: Vec<_> = held.iter().map(|(k, h)| (k, h.lock())).collect();

        let fresh: Vec<Specialization> = self
            .backend
            .fetch_specializations(category_id)?
            .into_iter()
            .filter(|s| s.category_id == category_id)
            .collect();

        for (key, slot) in guards.iter_mut() {
            match fresh.iter().find(|s| &s.key() == *key) {
                Some(spec) => slot.spec = spec.clone(),
                None => {
                    slot.retired = true;
                    slots.remove(*key);
                }
            }
        }
        drop(guards);

        let count = fresh.len();
        for spec in fresh {
            if !slots.contains_key(&spec.key()) {
                slots.insert(spec.key(), new_slot(spec));
            }
        }
        log::debug!("loaded {count} specializations for category {category_id}");
        Ok(count)
    }

    // ── Reads ──────────────────────────────────────────────────

    pub fn get(&self, counselor_id: &str, category_id: &str) -> Option<Specialization> {
        let handle = self.handle(counselor_id, category_id)?;
        let slot = handle.lock();
        Some(slot.spec.clone())
    }

    /// Point-in-time copy of every specialization in a category,
    /// ordered by counselor id.
    pub fn snapshot(&self, category_id: &str) -> Vec<Specialization> {
        let handles: Vec<SlotHandle> = self
            .slots
            .read()
            .iter()
            .filter(|(k, _)| k.category_id == category_id)
            .map(|(_, h)| Arc::clone(h))
            .collect();
        handles.iter().map(|h| h.lock().spec.clone()).collect()
    }

    pub fn snapshot_all(&self) -> Vec<Specialization> {
        let handles: Vec<SlotHandle> = self.slots.read().values().cloned().collect();
        handles.iter().map(|h| h.lock().spec.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().clone()
    }

    pub fn workload_overview(&self) -> Vec<CounselorWorkload> {
        reporting::workload_overview(&self.snapshot_all())
    }

    pub fn category_coverage(&self, category_id: &str) -> CategoryCoverage {
        reporting::category_coverage(category_id, &self.snapshot(category_id))
    }

    // ── Administration ─────────────────────────────────────────

    pub fn add_specialization(&self, draft: &SpecializationDraft) -> DeskResult<Specialization> {
        let spec = draft.validate().map_err(DeskError::Validation)?;
        let mut slots = self.slots.write();
        if slots.contains_key(&spec.key()) {
            return Err(DeskError::DuplicateSpecialization {
                counselor_id: spec.counselor_id,
                category_id: spec.category_id,
            });
        }
        self.backend.persist_specialization(&spec, true)?;
        slots.insert(spec.key(), new_slot(spec.clone()));
        drop(slots);

        self.record(LedgerEvent::SpecializationAdded {
            at: self.clock.now(),
            counselor_id: spec.counselor_id.clone(),
            category_id: spec.category_id.clone(),
            priority_level: spec.priority_level,
            max_workload: spec.max_workload,
        });
        Ok(spec)
    }

    pub fn update_specialization(
        &self,
        counselor_id: &str,
        category_id: &str,
        update: &SpecializationUpdate,
    ) -> DeskResult<Specialization> {
        let handle = self.require(counselor_id, category_id)?;
        let mut slot = handle.lock();
        ensure_live(&slot, counselor_id, category_id)?;

        let next = update.apply_to(&slot.spec).map_err(DeskError::Validation)?;
        if update.is_empty() {
            return Ok(next);
        }
        self.backend.persist_specialization(&next, false)?;
        slot.spec = next.clone();
        drop(slot);

        self.record(LedgerEvent::SpecializationUpdated {
            at: self.clock.now(),
            counselor_id: counselor_id.to_string(),
            category_id: category_id.to_string(),
        });
        Ok(next)
    }

    /// Remove a counselor from a category. Open tickets are not touched;
    /// their eventual release will find no specialization.
    pub fn remove_specialization(&self, counselor_id: &str, category_id: &str) -> DeskResult<Specialization> {
        let key = SpecializationKey::new(counselor_id, category_id);
        let mut slots = self.slots.write();
        let handle = slots.get(&key).cloned().ok_or_else(|| not_found(counselor_id, category_id))?;
        let mut slot = handle.lock();

        self.backend.persist_removal(counselor_id, category_id)?;
        slots.remove(&key);
        slot.retired = true;
        let removed = slot.spec.clone();
        drop(slot);
        drop(slots);

        if removed.current_workload > 0 {
            log::info!(
                "removed {counselor_id} from {category_id} with {} open tickets",
                removed.current_workload
            );
        }
        self.record(LedgerEvent::SpecializationRemoved {
            at: self.clock.now(),
            counselor_id: counselor_id.to_string(),
            category_id: category_id.to_string(),
            open_workload: removed.current_workload,
        });
        Ok(removed)
    }

    // ── Workload ───────────────────────────────────────────────

    /// Claim one unit of capacity, re-validating availability at call time.
    pub fn reserve(&self, counselor_id: &str, category_id: &str) -> DeskResult<ReserveOutcome> {
        let handle = self.require(counselor_id, category_id)?;
        let mut slot = handle.lock();
        ensure_live(&slot, counselor_id, category_id)?;

        if !slot.spec.is_available {
            return Ok(ReserveOutcome::Unavailable);
        }
        if !can_take_ticket(&slot.spec) {
            return Ok(ReserveOutcome::AtCapacity);
        }
        if !self.backend.persist_reservation(counselor_id, category_id)? {
            drop(slot);
            log::debug!("reservation for {counselor_id}/{category_id} refused by backend");
            self.record(LedgerEvent::ReservationRejected {
                at: self.clock.now(),
                counselor_id: counselor_id.to_string(),
                category_id: category_id.to_string(),
            });
            return Ok(ReserveOutcome::Rejected);
        }

        slot.spec.current_workload += 1;
        let current_workload = slot.spec.current_workload;
        drop(slot);

        log::debug!("reserved {counselor_id}/{category_id} -> {current_workload}");
        self.record(LedgerEvent::WorkloadReserved {
            at: self.clock.now(),
            counselor_id: counselor_id.to_string(),
            category_id: category_id.to_string(),
            current_workload,
        });
        Ok(ReserveOutcome::Reserved { current_workload })
    }

    /// Administrator assignment. Skips the capacity check; going over
    /// capacity is allowed but logged.
    pub fn reserve_manual(&self, counselor_id: &str, category_id: &str) -> DeskResult<u32> {
        let handle = self.require(counselor_id, category_id)?;
        let mut slot = handle.lock();
        ensure_live(&slot, counselor_id, category_id)?;

        if !self.backend.persist_manual_reservation(counselor_id, category_id)? {
            return Err(not_found(counselor_id, category_id));
        }
        slot.spec.current_workload += 1;
        let (current_workload, max_workload) = (slot.spec.current_workload, slot.spec.max_workload);
        drop(slot);

        let at = self.clock.now();
        self.record(LedgerEvent::WorkloadReserved {
            at,
            counselor_id: counselor_id.to_string(),
            category_id: category_id.to_string(),
            current_workload,
        });
        if current_workload > max_workload {
            log::warn!(
                "manual assignment puts {counselor_id}/{category_id} over capacity ({current_workload}/{max_workload})"
            );
            self.record(LedgerEvent::ManualOverCapacity {
                at,
                counselor_id: counselor_id.to_string(),
                category_id: category_id.to_string(),
                current_workload,
                max_workload,
            });
        }
        Ok(current_workload)
    }

    /// Give back one unit of capacity. Never goes below zero.
    pub fn release(&self, counselor_id: &str, category_id: &str) -> DeskResult<ReleaseOutcome> {
        let handle = self.require(counselor_id, category_id)?;
        let mut slot = handle.lock();
        ensure_live(&slot, counselor_id, category_id)?;

        if slot.spec.current_workload == 0 {
            drop(slot);
            log::warn!(
                "release of {counselor_id}/{category_id} with zero workload; double release or missed reservation upstream"
            );
            self.record(LedgerEvent::ReleaseUnderflow {
                at: self.clock.now(),
                counselor_id: counselor_id.to_string(),
                category_id: category_id.to_string(),
            });
            return Ok(ReleaseOutcome::Underflow);
        }

        if !self.backend.persist_release(counselor_id, category_id)? {
            log::warn!("backend has no row for {counselor_id}/{category_id} on release");
        }
        slot.spec.current_workload -= 1;
        let current_workload = slot.spec.current_workload;
        drop(slot);

        log::debug!("released {counselor_id}/{category_id} -> {current_workload}");
        self.record(LedgerEvent::WorkloadReleased {
            at: self.clock.now(),
            counselor_id: counselor_id.to_string(),
            category_id: category_id.to_string(),
            current_workload,
        });
        Ok(ReleaseOutcome::Released { current_workload })
    }

    /// Zero every workload. Recalibration only, not part of assignment.
    pub fn reset_all(&self) -> DeskResult<usize> {
        let slots = self.slots.read();
        let mut guards: Vec<_> = slots.values().map(|h| h.lock()).collect();

        self.backend.persist_reset()?;
        for slot in guards.iter_mut() {
            slot.spec.current_workload = 0;
        }
        let count = guards.len();
        drop(guards);
        drop(slots);

        log::info!("workload reset across {count} specializations");
        self.record(LedgerEvent::WorkloadReset {
            at: self.clock.now(),
            specializations: count,
        });
        Ok(count)
    }

    // ── Internals ──────────────────────────────────────────────

    fn handle(&self, counselor_id: &str, category_id: &str) -> Option<SlotHandle> {
        self.slots
            .read()
            .get(&SpecializationKey::new(counselor_id, category_id))
            .cloned()
    }

    fn require(&self, counselor_id: &str, category_id: &str) -> DeskResult<SlotHandle> {
        self.handle(counselor_id, category_id)
            .ok_or_else(|| not_found(counselor_id, category_id))
    }

    fn record(&self, event: LedgerEvent) {
        if let Err(e) = self.backend.record_event(&event) {
            log::error!("failed to persist {} event: {e:#}", event.type_name());
        }
        self.events.lock().push(event);
    }
}

fn new_slot(spec: Specialization) -> SlotHandle {
    Arc::new(Mutex::new(Slot { spec, retired: false }))
}

fn ensure_live(slot: &Slot, counselor_id: &str, category_id: &str) -> DeskResult<()> {
    if slot.retired {
        Err(not_found(counselor_id, category_id))
    } else {
        Ok(())
    }
}

fn not_found(counselor_id: &str, category_id: &str) -> DeskError {
    DeskError::SpecializationNotFound {
        counselor_id: counselor_id.to_string(),
        category_id: category_id.to_string(),
    }
}
