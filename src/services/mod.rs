//! Domain services used by the HTTP routes and the sync task.
//!
//! ARCHITECTURE
//! ============
//! Pure record logic (`beds`, `movements`, `handoff`, `stats`, `cudyr`,
//! `report`) operates on a `DailyRecord` in memory. `census` and
//! `optimistic` wrap those edits with persistence and audit; `repository`,
//! `store`, `local_cache` and `sync` own storage.

pub mod audit;
pub mod auth;
pub mod beds;
pub mod census;
pub mod cudyr;
pub mod email;
pub mod handoff;
pub mod local_cache;
pub mod movements;
pub mod optimistic;
pub mod report;
pub mod repository;
pub mod stats;
pub mod store;
pub mod sync;
