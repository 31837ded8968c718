//! Profile store facade for Lobbyforge.
//!
//! The backing key-value store is an external collaborator — this crate
//! owns only its contract:
//!
//! 1. **[`ProfileStore`]** — the raw async `get/set` over named tables.
//! 2. **[`ProfileStoreExt`]** — typed, named queries (player name, stats,
//!    inventories, settings, locations, rankings, …). Blanket-implemented;
//!    the rest of the lobby never spells a table name.
//! 3. **[`MemoryStore`]** — an in-memory implementation with per-table
//!    failure injection, used by tests and the demo.
//!
//! # How it fits in the stack
//!
//! ```text
//! Session / Hydration / Rankings (above)  ← issue typed queries
//!     ↕
//! Store facade (this crate)               ← tables, keys, outcomes
//!     ↕
//! Backing store client (external)         ← durability, timeouts, retries
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod facade;
mod memory;

pub use error::StoreError;
pub use facade::{ProfileStore, ProfileStoreExt, tables};
pub use memory::MemoryStore;
