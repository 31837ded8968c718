//! Session types: the in-memory record of one logged-in player.

use lobbyforge_protocol::{
    AccessLevel, Account, AccountId, ArtifactInventory, ArtifactTree,
    CharacterCustomization, CharacterStats, FollowerList, FriendsList, InputSettings,
    ItemInventory, OnlineStatus, PeerId, PlayerExperience, PlayerLocation, PlayerStats,
    RequestId, SkillBuild,
};

/// The live, in-memory representation of one connected, authenticated
/// player.
///
/// Created by the session manager on successful login, destroyed on
/// logout or peer disconnect — whichever comes first. Everything below
/// the identity fields is a *cache*: each hydrated field stays `None`
/// until its backing query resolves, and the client is expected to render
/// a partial profile in the meantime.
///
/// The `instance` field is a plain lookup key into the instance registry,
/// never a reference — a terminated instance must not be kept alive by
/// the sessions that were on it.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    /// Stable identity — the backing store's primary key. Immutable.
    pub account_id: AccountId,
    /// Login name (e-mail). Used in logs and feedback mail only.
    pub email: String,
    /// The transport connection this session is bound to.
    pub peer: PeerId,

    /// Cached display name; `None` until hydrated (or never chosen).
    pub name: Option<String>,
    pub online_status: OnlineStatus,
    pub access_level: AccessLevel,
    /// Current intended placement.
    pub location: PlayerLocation,
    /// Key of the game instance this session is a member of, if any.
    pub instance: Option<RequestId>,

    // -- Hydrated caches, each independently nullable --
    pub stats: Option<PlayerStats>,
    pub ffa_stats: Option<PlayerStats>,
    pub character_stats: Option<CharacterStats>,
    pub skill_build: Option<SkillBuild>,
    pub artifact_inventory: Option<ArtifactInventory>,
    pub artifact_tree: Option<ArtifactTree>,
    pub item_inventory: Option<ItemInventory>,
    pub customization: Option<CharacterCustomization>,
    pub experience: Option<PlayerExperience>,
    pub input_settings: Option<InputSettings>,
    pub friends: Option<FriendsList>,
    pub followers: Option<FollowerList>,
}

impl PlayerSession {
    /// A fresh, un-hydrated session bound to `peer`.
    pub fn new(account: &Account, peer: PeerId, location: PlayerLocation) -> Self {
        Self {
            account_id: account.id.clone(),
            email: account.email.clone(),
            peer,
            name: None,
            online_status: OnlineStatus::Offline,
            access_level: AccessLevel::Player,
            location,
            instance: None,
            stats: None,
            ffa_stats: None,
            character_stats: None,
            skill_build: None,
            artifact_inventory: None,
            artifact_tree: None,
            item_inventory: None,
            customization: None,
            experience: None,
            input_settings: None,
            friends: None,
            followers: None,
        }
    }

    /// True if the player's intended placement is a town hub — the safe
    /// fallback location during crash recovery.
    pub fn in_town(&self) -> bool {
        self.location.is_town()
    }

    /// Display name for logging: the chosen name if known, otherwise the
    /// account id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.account_id.as_str())
    }
}
