//! Counselor assignment and workload allocation for the help desk.
//!
//! Leaf first:
//!   specialization / validation records and administrator input
//!   scoring                     availability filter and assignment score
//!   ranker                      deterministic candidate ordering
//!   ledger                      per-specialization workload, the only writer
//!   allocation                  rank, reserve, retry once, else manual
//!   ticket                      per-ticket assignment lifecycle
//!
//! Persistence sits behind `backend::WorkloadBackend`; `store` is the
//! SQLite implementation.

pub mod allocation;
pub mod backend;
pub mod clock;
pub mod config;
pub mod desk;
pub mod error;
pub mod event;
pub mod ledger;
pub mod ranker;
pub mod reporting;
pub mod rng;
pub mod scoring;
pub mod simulation;
pub mod specialization;
pub mod store;
pub mod ticket;
pub mod types;
pub mod validation;
