//! The desk wires backend, clock, ledger and allocator together.
//!
//! Build with `Desk::build_sqlite` for a real store or `Desk::build_test`
//! for the fixed in-memory desk used by the test suite.

use crate::{
    allocation::{AssignmentResult, Allocator},
    backend::{MemoryBackend, SqliteBackend, WorkloadBackend},
    clock::{Clock, ManualClock},
    config::DeskConfig,
    error::{DeskError, DeskResult},
    ledger::WorkloadLedger,
    specialization::Category,
    store::DeskStore,
    ticket::TicketAssignment,
    types::CategoryId,
};
use std::{collections::BTreeMap, sync::Arc};

pub struct Desk {
    pub ledger:    Arc<WorkloadLedger>,
    pub allocator: Allocator,
    categories:    BTreeMap<CategoryId, Category>,
}

impl Desk {
    pub fn new(
        backend: Arc<dyn WorkloadBackend>,
        clock: Arc<dyn Clock>,
        categories: Vec<Category>,
    ) -> Self {
        let ledger = Arc::new(WorkloadLedger::new(backend, clock));
        Self {
            allocator: Allocator::new(Arc::clone(&ledger)),
            ledger,
            categories: categories
                .into_iter()
                .map(|c| (c.category_id.clone(), c))
                .collect(),
        }
    }

    /// Desk over a migrated SQLite store. An empty store is seeded from
    /// `config`; a populated one is loaded as-is.
    pub fn build_sqlite(store: DeskStore, config: &DeskConfig, clock: Arc<dyn Clock>) -> DeskResult<Self> {
        for category in &config.categories {
            store.upsert_category(category)?;
        }
        let categories = store.list_categories()?;
        let already_seeded = !store.all_specializations()?.is_empty();

        let backend = Arc::new(SqliteBackend::new(store));
        let desk = Self::new(backend, clock, categories);
        if already_seeded {
            let loaded = desk.load_all()?;
            log::info!("loaded {loaded} specializations from store");
        } else {
            config.seed_ledger(&desk.ledger)?;
        }
        Ok(desk)
    }

    /// In-memory desk seeded from `DeskConfig::default_test()`, on a
    /// manual clock starting at 2024-01-01.
    pub fn build_test() -> DeskResult<Self> {
        Self::build_test_with(Arc::new(MemoryBackend::new()))
    }

    /// Like `build_test`, but over a caller-held backend so tests can
    /// script it.
    pub fn build_test_with(backend: Arc<MemoryBackend>) -> DeskResult<Self> {
        let config = DeskConfig::default_test();
        let desk = Self::new(backend, Arc::new(ManualClock::epoch()), config.categories.clone());
        config.seed_ledger(&desk.ledger)?;
        Ok(desk)
    }

    /// Refresh every known category from the backend.
    pub fn load_all(&self) -> DeskResult<usize> {
        let mut total = 0;
        for category_id in self.categories.keys() {
            total += self.ledger.load_category(category_id)?;
        }
        Ok(total)
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn category(&self, category_id: &str) -> DeskResult<&Category> {
        self.categories
            .get(category_id)
            .ok_or_else(|| DeskError::CategoryNotFound {
                category_id: category_id.to_string(),
            })
    }

    /// Create a ticket in `category_id` and run auto-assignment on it.
    pub fn open_ticket(&self, category_id: &str) -> DeskResult<(TicketAssignment, AssignmentResult)> {
        let category = self.category(category_id)?;
        let mut ticket = TicketAssignment::open(category_id);
        let result = ticket.auto_assign(&self.allocator, category)?;
        Ok((ticket, result))
    }
}
