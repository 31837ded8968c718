//! Live-session tier for Lobbyforge: who is logged in, where their data
//! is pushed, and how their profiles get filled.
//!
//! - [`SessionManager`] — dual-indexed (account and peer) session
//!   bookkeeping with last-writer-wins displacement.
//! - [`Hydrator`] — per-field profile fan-out from the store to a peer.
//! - [`ChatChannel`] — named broadcast groups (global, announcements,
//!   per-instance).
//! - [`Wire`] — the fire-and-forget push contract the transport
//!   implements; [`RecordingWire`] is the test double.
//! - [`NameCache`] — process-wide display-name cache.

mod channel;
mod error;
mod hydration;
mod manager;
mod names;
mod session;
mod wire;

pub use channel::{ChatChannel, SYSTEM_SENDER};
pub use error::SessionError;
pub use hydration::Hydrator;
pub use manager::SessionManager;
pub use names::NameCache;
pub use session::PlayerSession;
pub use wire::{RecordingWire, Wire};
