//! Core identity and profile types for the lobby tier.
//!
//! Everything here either travels on the wire (inside an RPC message) or
//! serves as a key into the session/instance indices. The lobby never
//! interprets gameplay data — these types are the *account-level* view of
//! a player: who they are, what they own, where they should be placed.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable account identifier — the backing store's primary key.
///
/// Newtype over `String` so an account id can never be confused with a
/// player name or a map name in a function signature. Cloning is cheap
/// enough for the rates a lobby sees (logins, not per-frame traffic).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One live transport connection, independent of authentication state.
///
/// The transport layer hands these out; the lobby only compares and
/// indexes them. A returning player gets a *new* peer id — peers are
/// never reused across connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Identifies one outstanding instance-provisioning request.
///
/// Allocated by the instance registry *before* the provisioning call is
/// issued, so a request can be indexed before the provisioner ever sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Identifier of a live, externally-provisioned game-world server process.
///
/// Assigned by the provisioner only once the instance is confirmed
/// running — a registry record in any earlier state has no `InstanceId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the transport layer delivers on account login/logout/registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// The login name (an e-mail address) — used for logging and as the
    /// reply-to of feedback mail, never shown to other players.
    pub email: String,
}

// ---------------------------------------------------------------------------
// Session-facing enums
// ---------------------------------------------------------------------------

/// Whether an account currently has a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OnlineStatus {
    #[default]
    Offline,
    Online,
}

/// Ordered privilege levels. Authorization checks are comparisons
/// (`access_level > AccessLevel::Player`), so the variant order *is* the
/// privilege order — append new levels in rank position, never at the end
/// out of order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum AccessLevel {
    #[default]
    Player,
    Vip,
    CommunityManager,
    GameMaster,
    Admin,
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Player => "Player",
            Self::Vip => "VIP",
            Self::CommunityManager => "CommunityManager",
            Self::GameMaster => "GameMaster",
            Self::Admin => "Admin",
        };
        write!(f, "{s}")
    }
}

/// The kind of game-world server an instance hosts.
///
/// A tag, not a type hierarchy: kind-specific behavior is selected by
/// matching on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerKind {
    /// A persistent hub map. Players fall back here on crash recovery.
    Town,
    /// An open-world map.
    World,
    /// A match arena.
    Arena,
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Town => "Town",
            Self::World => "World",
            Self::Arena => "Arena",
        };
        write!(f, "{s}")
    }
}

/// Where a player is (or should be) placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLocation {
    pub map_name: String,
    pub kind: ServerKind,
}

impl PlayerLocation {
    pub fn town(map_name: impl Into<String>) -> Self {
        Self {
            map_name: map_name.into(),
            kind: ServerKind::Town,
        }
    }

    /// True if this location is a hub — the safe fallback during crash
    /// recovery.
    pub fn is_town(&self) -> bool {
        self.kind == ServerKind::Town
    }
}

/// Network address of a running instance, as reported by the provisioner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceAddress {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for InstanceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// Profile data model
// ---------------------------------------------------------------------------
//
// Each of these corresponds to one independent backing-store table and one
// hydration fetch. A missing row never means "broken" — every type has a
// defined default (or a starter value) that stands in for absence.

/// Win/loss record used by both the ranked and FFA queues.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerStats {
    pub wins: u32,
    pub losses: u32,
    pub kills: u32,
    pub deaths: u32,
    pub ranking: f64,
}

/// Point-buy character attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharacterStats {
    pub attack: u16,
    pub defense: u16,
    pub energy: u16,
    pub cooldown_reduction: u16,
    pub attack_speed: u16,
}

/// The player's selected skills, one slot per attunement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SkillBuild {
    pub skills: Vec<u32>,
}

impl SkillBuild {
    /// The build every fresh account starts with.
    pub fn starter() -> Self {
        Self {
            skills: vec![1, 2, 3, 4, 5],
        }
    }
}

/// Artifacts the player owns but has not socketed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArtifactInventory {
    pub artifacts: Vec<u32>,
}

/// Socketed artifacts, one optional slot per tree level.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArtifactTree {
    pub slots: Vec<Option<u32>>,
}

impl ArtifactTree {
    /// An empty tree with the starter number of unlocked levels.
    pub fn starter() -> Self {
        Self {
            slots: vec![None; 3],
        }
    }
}

/// One stack of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSlot {
    pub item_id: u32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemInventory {
    pub items: Vec<ItemSlot>,
}

/// Cosmetic character appearance. Absent until the player has gone
/// through character creation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharacterCustomization {
    pub hair_style: u8,
    pub hair_color: u8,
    pub skin_color: u8,
    pub eye_color: u8,
}

/// Accumulated account experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerExperience {
    pub total: u64,
}

/// Client-side key bindings, persisted server-side so they roam.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputSettings {
    pub bindings: HashMap<String, String>,
}

/// Accounts this player follows (their friends list).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FriendsList {
    pub friends: Vec<AccountId>,
}

/// Accounts following this player.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FollowerList {
    pub followers: Vec<AccountId>,
}

// ---------------------------------------------------------------------------
// Rankings
// ---------------------------------------------------------------------------

/// Which leaderboard a ranking page belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankingSubject {
    Player,
    Team,
    Ffa,
}

impl fmt::Display for RankingSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Player => "Player",
            Self::Team => "Team",
            Self::Ffa => "FFA",
        };
        write!(f, "{s}")
    }
}

/// One row of a leaderboard page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub account_id: AccountId,
    pub name: String,
    pub value: f64,
}

/// One page of a leaderboard, as fetched from the backing store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RankingPage {
    pub entries: Vec<RankingEntry>,
}

/// An entry of the staff-only recent-activity lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountActivity {
    pub account_id: AccountId,
    pub email: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Serde-shape tests: the client SDK parses these exact JSON forms,
    //! so the transparent/tagged attributes are part of the contract.

    use super::*;

    #[test]
    fn test_account_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&AccountId::new("acc-42")).unwrap();
        assert_eq!(json, "\"acc-42\"");
    }

    #[test]
    fn test_peer_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PeerId(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn test_peer_id_display() {
        assert_eq!(PeerId(3).to_string(), "peer-3");
    }

    #[test]
    fn test_request_id_display() {
        assert_eq!(RequestId(12).to_string(), "req-12");
    }

    #[test]
    fn test_access_level_ordering_matches_privilege() {
        // Authorization is comparison-based; this ordering is load-bearing.
        assert!(AccessLevel::Player < AccessLevel::Vip);
        assert!(AccessLevel::Vip < AccessLevel::CommunityManager);
        assert!(AccessLevel::CommunityManager < AccessLevel::GameMaster);
        assert!(AccessLevel::GameMaster < AccessLevel::Admin);
    }

    #[test]
    fn test_access_level_default_is_player() {
        assert_eq!(AccessLevel::default(), AccessLevel::Player);
    }

    #[test]
    fn test_player_location_is_town() {
        assert!(PlayerLocation::town("Oaktown").is_town());
        let world = PlayerLocation {
            map_name: "Highlands".into(),
            kind: ServerKind::World,
        };
        assert!(!world.is_town());
    }

    #[test]
    fn test_skill_build_starter_is_not_empty() {
        assert!(!SkillBuild::starter().skills.is_empty());
    }

    #[test]
    fn test_artifact_tree_starter_has_unlocked_empty_slots() {
        let tree = ArtifactTree::starter();
        assert!(!tree.slots.is_empty());
        assert!(tree.slots.iter().all(|s| s.is_none()));
    }

    #[test]
    fn test_default_inventories_are_empty() {
        assert!(ItemInventory::default().items.is_empty());
        assert!(ArtifactInventory::default().artifacts.is_empty());
    }

    #[test]
    fn test_player_experience_default_is_zero() {
        assert_eq!(PlayerExperience::default().total, 0);
    }

    #[test]
    fn test_instance_address_display() {
        let addr = InstanceAddress {
            host: "10.0.0.5".into(),
            port: 7777,
        };
        assert_eq!(addr.to_string(), "10.0.0.5:7777");
    }

    #[test]
    fn test_player_stats_round_trip() {
        let stats = PlayerStats {
            wins: 10,
            losses: 4,
            kills: 55,
            deaths: 30,
            ranking: 1532.5,
        };
        let bytes = serde_json::to_vec(&stats).unwrap();
        let decoded: PlayerStats = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(stats, decoded);
    }
}
