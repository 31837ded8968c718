//! Wire-level vocabulary for the Lobbyforge lobby tier.
//!
//! This crate defines what clients and the lobby say to each other:
//!
//! - **Identity and profile types** ([`AccountId`], [`PeerId`],
//!   [`PlayerStats`], [`SkillBuild`], …) — the account-level data model.
//! - **RPC messages** ([`ClientRpc`], [`ServerRpc`]) — the named calls of
//!   the lobby's exposed surface.
//! - **Codec** ([`Codec`], [`JsonCodec`]) — how messages become bytes.
//!
//! It knows nothing about connections, sessions, or instances — those
//! layers sit above and import this vocabulary.

mod codec;
mod error;
mod rpc;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use rpc::{ClientRpc, ServerRpc};
pub use types::{
    AccessLevel, Account, AccountActivity, AccountId, ArtifactInventory, ArtifactTree,
    CharacterCustomization, CharacterStats, FollowerList, FriendsList, InputSettings,
    InstanceAddress, InstanceId, ItemInventory, ItemSlot, OnlineStatus, PeerId,
    PlayerExperience, PlayerLocation, PlayerStats, RankingEntry, RankingPage,
    RankingSubject, RequestId, ServerKind, SkillBuild,
};
