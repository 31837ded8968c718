//! The RPC surface between lobby clients and this server.
//!
//! Two internally tagged enums: [`ClientRpc`] (what authenticated clients
//! may call) and [`ServerRpc`] (what the lobby pushes back, either to one
//! peer or broadcast through a chat channel). Only the *names and payload
//! shapes* live here — dispatch and authorization are the server's job.

use serde::{Deserialize, Serialize};

use crate::types::{
    AccountActivity, AccountId, ArtifactInventory, ArtifactTree, CharacterCustomization,
    CharacterStats, InputSettings, InstanceAddress, InstanceId, ItemInventory,
    PlayerExperience, PlayerStats, RankingPage, RankingSubject, ServerKind, SkillBuild,
};

/// Calls a client may issue after logging in.
///
/// Every variant is handled by a live-session lookup first; an RPC from a
/// peer with no session is dropped with a warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRpc {
    /// Post-login readiness signal: place me in the world and subscribe me
    /// to the default channels.
    Ready,

    /// Request to change the caller's display name.
    PlayerNameChange { new_name: String },

    /// Ask whether a display name is still free (pre-validation for the
    /// name-entry dialog).
    PlayerNameExists { name: String },

    /// Change the caller's password.
    ChangePassword { new_password: String },

    /// View another player's profile — triggers a full hydration fan-out
    /// toward the caller.
    ViewProfile { player_name: String },

    /// Cached-first display-name lookup for an arbitrary account.
    RequestPlayerName { account_id: AccountId },

    /// Where is my current game instance?
    RequestGameServerInfo,

    /// Provisioner-originated: the named instance finished booting.
    GameServerReady { instance_id: InstanceId },

    /// Relay feedback text to the operators' mailbox.
    MailFeedback { text: String },

    /// Staff-only bulk admin data. Refused for `AccessLevel::Player`.
    StaffInfoRequest,

    /// Record a pending map transition and re-place the caller.
    ActivatePortal {
        map_name: String,
        target_map_name: String,
        kind: ServerKind,
    },

    /// Serve a leaderboard page from the ranking cache.
    RankingListRequest { subject: RankingSubject, page: u8 },
}

/// Pushes from the lobby to clients.
///
/// Hydration sends one dedicated variant per profile field so a partial
/// profile renders as fields arrive — there is no aggregate profile
/// message on purpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerRpc {
    /// Version handshake, sent on peer connect.
    VersionNumber { version: u32 },

    /// A system line in a chat channel (MOTD, announcements).
    Chat {
        channel: String,
        sender: String,
        text: String,
    },

    // -- Hydration fields --
    ReceivePlayerName {
        account_id: AccountId,
        name: String,
    },
    /// Self-view only: the account has no name yet, prompt for one.
    AskPlayerName,
    ReceiveCharacterCustomization {
        account_id: AccountId,
        customization: CharacterCustomization,
    },
    /// Self-view only: no customization saved yet, open character creation.
    CustomizeCharacter { account_id: AccountId },
    ReceiveSkillBuild {
        account_id: AccountId,
        build: SkillBuild,
    },
    ReceivePlayerStats {
        account_id: AccountId,
        stats: PlayerStats,
    },
    ReceiveFfaStats {
        account_id: AccountId,
        stats: PlayerStats,
    },
    ReceiveCharacterStats {
        account_id: AccountId,
        stats: CharacterStats,
    },
    ReceiveArtifactInventory {
        account_id: AccountId,
        inventory: ArtifactInventory,
    },
    ReceiveArtifactTree {
        account_id: AccountId,
        tree: ArtifactTree,
    },
    ReceiveItemInventory {
        account_id: AccountId,
        inventory: ItemInventory,
    },
    ReceiveExperience {
        account_id: AccountId,
        experience: PlayerExperience,
    },
    ReceiveInputSettings { settings: InputSettings },

    /// "A profile view for this account is now streaming to you."
    ViewProfile { account_id: AccountId },
    /// The requested player name resolved to no account.
    ViewProfileError { player_name: String },

    // -- Name validation --
    PlayerNameAlreadyExists { name: String },
    PlayerNameFree { name: String },

    // -- Placement --
    ReceiveGameServerInfo {
        map_name: String,
        address: InstanceAddress,
    },

    // -- Staff --
    ReceiveLastLogins { logins: Vec<AccountActivity> },
    ReceiveLastRegistrations { registrations: Vec<AccountActivity> },

    // -- Rankings --
    ReceiveRankingList {
        subject: RankingSubject,
        page: u8,
        ranks: RankingPage,
    },
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_rpc_ready_json_format() {
        // Internally tagged: { "type": "Ready" }.
        let json: serde_json::Value = serde_json::to_value(ClientRpc::Ready).unwrap();
        assert_eq!(json["type"], "Ready");
    }

    #[test]
    fn test_client_rpc_name_change_json_format() {
        let msg = ClientRpc::PlayerNameChange {
            new_name: "Arwic".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "PlayerNameChange");
        assert_eq!(json["new_name"], "Arwic");
    }

    #[test]
    fn test_client_rpc_portal_round_trip() {
        let msg = ClientRpc::ActivatePortal {
            map_name: "Oaktown".into(),
            target_map_name: "Highlands".into(),
            kind: ServerKind::World,
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: ClientRpc = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_server_rpc_receive_player_name_round_trip() {
        let msg = ServerRpc::ReceivePlayerName {
            account_id: AccountId::new("acc-1"),
            name: "Arwic".into(),
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: ServerRpc = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_server_rpc_ranking_list_round_trip() {
        let msg = ServerRpc::ReceiveRankingList {
            subject: RankingSubject::Player,
            page: 2,
            ranks: RankingPage::default(),
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: ServerRpc = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_decode_unknown_rpc_type_returns_error() {
        let unknown = r#"{"type": "FlyToMoon", "speed": 9000}"#;
        let result: Result<ClientRpc, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }
}
