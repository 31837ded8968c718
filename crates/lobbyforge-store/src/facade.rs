//! The profile store facade: one asynchronous key→value contract over
//! many independent logical tables.
//!
//! The lobby does not implement storage — that is the backing store
//! client's job. This module defines the [`ProfileStore`] trait the lobby
//! calls through, plus a typed extension layer ([`ProfileStoreExt`]) with
//! one named helper per query the lobby actually issues. The helpers keep
//! table names and key shapes in exactly one place.
//!
//! # Outcome model
//!
//! Every read resolves to one of three terminal outcomes, delivered
//! exactly once: `Ok(Some(v))` (row exists), `Ok(None)` (confirmed
//! absence — for profile data this means "use the default"), or
//! `Err(StoreError)` (the call failed; the caller logs and moves on).

use std::future::Future;

use serde::{Serialize, de::DeserializeOwned};

use lobbyforge_protocol::{
    AccessLevel, AccountActivity, AccountId, ArtifactInventory, ArtifactTree,
    CharacterCustomization, CharacterStats, FollowerList, FriendsList, InputSettings,
    ItemInventory, OnlineStatus, PlayerExperience, PlayerLocation, PlayerStats,
    RankingPage, RankingSubject, SkillBuild,
};

use crate::StoreError;

/// Logical table names. One constant per table so a typo is a compile
/// error at the single definition site, not a silent empty read.
pub mod tables {
    pub const ACCOUNT_TO_NAME: &str = "AccountToName";
    pub const NAME_TO_ACCOUNT: &str = "NameToAccount";
    pub const ACCOUNT_TO_STATS: &str = "AccountToStats";
    pub const ACCOUNT_TO_FFA_STATS: &str = "AccountToFfaStats";
    pub const ACCOUNT_TO_CHARACTER_STATS: &str = "AccountToCharacterStats";
    pub const ACCOUNT_TO_SKILL_BUILD: &str = "AccountToSkillBuild";
    pub const ACCOUNT_TO_ARTIFACT_INVENTORY: &str = "AccountToArtifactInventory";
    pub const ACCOUNT_TO_ARTIFACT_TREE: &str = "AccountToArtifactTree";
    pub const ACCOUNT_TO_ITEM_INVENTORY: &str = "AccountToItemInventory";
    pub const ACCOUNT_TO_CUSTOMIZATION: &str = "AccountToCustomization";
    pub const ACCOUNT_TO_EXPERIENCE: &str = "AccountToExperience";
    pub const ACCOUNT_TO_INPUT_SETTINGS: &str = "AccountToInputSettings";
    pub const ACCOUNT_TO_ACCESS_LEVEL: &str = "AccountToAccessLevel";
    pub const ACCOUNT_TO_FRIENDS: &str = "AccountToFriends";
    pub const ACCOUNT_TO_FOLLOWERS: &str = "AccountToFollowers";
    pub const ACCOUNT_TO_LOCATION: &str = "AccountToLocation";
    pub const ACCOUNT_TO_PASSWORD: &str = "AccountToPassword";
    pub const ACCOUNT_TO_ONLINE_STATUS: &str = "AccountToOnlineStatus";
    pub const ACCOUNT_TO_LAST_LOGIN: &str = "AccountToLastLogin";
    pub const ACCOUNT_TO_REGISTRATION: &str = "AccountToRegistration";
    pub const ACCOUNT_TO_COUNTRY: &str = "AccountToCountry";
    pub const IP_TO_ACCOUNTS: &str = "IpToAccounts";
    pub const IP_TO_COUNTRY: &str = "IpToCountry";
    pub const RANKINGS: &str = "Rankings";
    pub const LAST_LOGINS: &str = "LastLogins";
    pub const LAST_REGISTRATIONS: &str = "LastRegistrations";
}

/// Key under which the recent-activity lists are stored.
const ACTIVITY_KEY: &str = "latest";

/// The asynchronous contract every backing store client implements.
///
/// Only two raw operations — everything typed is layered on top in
/// [`ProfileStoreExt`]. Futures are `Send` because completions run on
/// whichever runtime worker picks them up.
pub trait ProfileStore: Send + Sync + 'static {
    /// Reads one row. `Ok(None)` is a confirmed absence, not an error.
    fn get_raw(
        &self,
        table: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, StoreError>> + Send;

    /// Writes one row, replacing any previous value.
    fn set_raw(
        &self,
        table: &str,
        key: &str,
        value: serde_json::Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Typed queries over [`ProfileStore`], blanket-implemented for every
/// store. These are the only call sites that know table names.
pub trait ProfileStoreExt: ProfileStore {
    /// Typed read: decodes the stored JSON row into `T`.
    fn get<T>(
        &self,
        table: &'static str,
        key: &str,
    ) -> impl Future<Output = Result<Option<T>, StoreError>> + Send
    where
        T: DeserializeOwned + Send,
    {
        let key = key.to_owned();
        async move {
            match self.get_raw(table, &key).await? {
                Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                    StoreError::Corrupt {
                        table: table.to_owned(),
                        key,
                        source: e,
                    }
                }),
                None => Ok(None),
            }
        }
    }

    /// Typed write: encodes `value` and stores it.
    fn set<T>(
        &self,
        table: &'static str,
        key: &str,
        value: &T,
    ) -> impl Future<Output = Result<(), StoreError>> + Send
    where
        T: Serialize + Sync,
    {
        let key = key.to_owned();
        let encoded = serde_json::to_value(value).map_err(|e| StoreError::Encode {
            table: table.to_owned(),
            source: e,
        });
        async move {
            let encoded = encoded?;
            self.set_raw(table, &key, encoded).await
        }
    }

    // -- Names ------------------------------------------------------------

    fn get_player_name(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send {
        self.get(tables::ACCOUNT_TO_NAME, account.as_str())
    }

    fn get_account_id_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<AccountId>, StoreError>> + Send {
        self.get(tables::NAME_TO_ACCOUNT, name)
    }

    /// Writes the name and the reverse (uniqueness) index together.
    fn set_player_name(
        &self,
        account: &AccountId,
        name: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let account = account.clone();
        let name = name.to_owned();
        async move {
            self.set(tables::ACCOUNT_TO_NAME, account.as_str(), &name)
                .await?;
            self.set(tables::NAME_TO_ACCOUNT, &name, &account).await
        }
    }

    // -- Hydration battery -------------------------------------------------

    fn get_player_stats(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Option<PlayerStats>, StoreError>> + Send {
        self.get(tables::ACCOUNT_TO_STATS, account.as_str())
    }

    fn get_ffa_stats(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Option<PlayerStats>, StoreError>> + Send {
        self.get(tables::ACCOUNT_TO_FFA_STATS, account.as_str())
    }

    fn get_character_stats(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Option<CharacterStats>, StoreError>> + Send {
        self.get(tables::ACCOUNT_TO_CHARACTER_STATS, account.as_str())
    }

    fn get_skill_build(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Option<SkillBuild>, StoreError>> + Send {
        self.get(tables::ACCOUNT_TO_SKILL_BUILD, account.as_str())
    }

    fn get_artifact_inventory(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Option<ArtifactInventory>, StoreError>> + Send {
        self.get(tables::ACCOUNT_TO_ARTIFACT_INVENTORY, account.as_str())
    }

    fn get_artifact_tree(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Option<ArtifactTree>, StoreError>> + Send {
        self.get(tables::ACCOUNT_TO_ARTIFACT_TREE, account.as_str())
    }

    fn get_item_inventory(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Option<ItemInventory>, StoreError>> + Send {
        self.get(tables::ACCOUNT_TO_ITEM_INVENTORY, account.as_str())
    }

    fn get_customization(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Option<CharacterCustomization>, StoreError>> + Send
    {
        self.get(tables::ACCOUNT_TO_CUSTOMIZATION, account.as_str())
    }

    fn get_experience(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Option<PlayerExperience>, StoreError>> + Send {
        self.get(tables::ACCOUNT_TO_EXPERIENCE, account.as_str())
    }

    // -- Auxiliary login fetches -------------------------------------------

    fn get_input_settings(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Option<InputSettings>, StoreError>> + Send {
        self.get(tables::ACCOUNT_TO_INPUT_SETTINGS, account.as_str())
    }

    fn set_input_settings(
        &self,
        account: &AccountId,
        settings: &InputSettings,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.set(tables::ACCOUNT_TO_INPUT_SETTINGS, account.as_str(), settings)
    }

    fn get_access_level(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Option<AccessLevel>, StoreError>> + Send {
        self.get(tables::ACCOUNT_TO_ACCESS_LEVEL, account.as_str())
    }

    fn get_friends(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Option<FriendsList>, StoreError>> + Send {
        self.get(tables::ACCOUNT_TO_FRIENDS, account.as_str())
    }

    fn get_followers(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Option<FollowerList>, StoreError>> + Send {
        self.get(tables::ACCOUNT_TO_FOLLOWERS, account.as_str())
    }

    // -- Location, account flags -------------------------------------------

    fn get_location(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Option<PlayerLocation>, StoreError>> + Send {
        self.get(tables::ACCOUNT_TO_LOCATION, account.as_str())
    }

    fn set_location(
        &self,
        account: &AccountId,
        location: &PlayerLocation,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.set(tables::ACCOUNT_TO_LOCATION, account.as_str(), location)
    }

    fn set_password(
        &self,
        account: &AccountId,
        password: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let account = account.clone();
        let password = password.to_owned();
        async move {
            self.set(tables::ACCOUNT_TO_PASSWORD, account.as_str(), &password)
                .await
        }
    }

    fn set_online_status(
        &self,
        account: &AccountId,
        status: OnlineStatus,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let account = account.clone();
        async move {
            self.set(tables::ACCOUNT_TO_ONLINE_STATUS, account.as_str(), &status)
                .await
        }
    }

    fn set_last_login(
        &self,
        account: &AccountId,
        timestamp_ms: u64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let account = account.clone();
        async move {
            self.set(tables::ACCOUNT_TO_LAST_LOGIN, account.as_str(), &timestamp_ms)
                .await
        }
    }

    fn set_registration_date(
        &self,
        account: &AccountId,
        timestamp_ms: u64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let account = account.clone();
        async move {
            self.set(
                tables::ACCOUNT_TO_REGISTRATION,
                account.as_str(),
                &timestamp_ms,
            )
            .await
        }
    }

    // -- IP bookkeeping ----------------------------------------------------

    fn get_accounts_for_ip(
        &self,
        ip: &str,
    ) -> impl Future<Output = Result<Option<Vec<AccountId>>, StoreError>> + Send {
        self.get(tables::IP_TO_ACCOUNTS, ip)
    }

    fn set_accounts_for_ip(
        &self,
        ip: &str,
        accounts: &[AccountId],
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let ip = ip.to_owned();
        let accounts = accounts.to_vec();
        async move { self.set(tables::IP_TO_ACCOUNTS, &ip, &accounts).await }
    }

    fn set_country(
        &self,
        account: &AccountId,
        country: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let account = account.clone();
        let country = country.to_owned();
        async move {
            self.set(tables::ACCOUNT_TO_COUNTRY, account.as_str(), &country)
                .await
        }
    }

    fn set_ip_country(
        &self,
        ip: &str,
        country: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let ip = ip.to_owned();
        let country = country.to_owned();
        async move { self.set(tables::IP_TO_COUNTRY, &ip, &country).await }
    }

    // -- Rankings and staff lists -------------------------------------------

    /// Fetches one leaderboard page, keyed `(subject, page)` and capped
    /// at `count` rows.
    fn get_top_ranks(
        &self,
        subject: RankingSubject,
        page: u8,
        count: u32,
    ) -> impl Future<Output = Result<Option<RankingPage>, StoreError>> + Send {
        let key = format!("{subject}:{page}");
        async move {
            let page: Option<RankingPage> = self.get(tables::RANKINGS, &key).await?;
            Ok(page.map(|mut p| {
                p.entries.truncate(count as usize);
                p
            }))
        }
    }

    /// Prepends one entry to the recent-logins list, capped at `cap`.
    fn push_login_activity(
        &self,
        activity: &AccountActivity,
        cap: usize,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let activity = activity.clone();
        async move {
            let mut rows: Vec<AccountActivity> = self
                .get(tables::LAST_LOGINS, ACTIVITY_KEY)
                .await?
                .unwrap_or_default();
            rows.insert(0, activity);
            rows.truncate(cap);
            self.set(tables::LAST_LOGINS, ACTIVITY_KEY, &rows).await
        }
    }

    /// Prepends one entry to the recent-registrations list, capped at `cap`.
    fn push_registration_activity(
        &self,
        activity: &AccountActivity,
        cap: usize,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let activity = activity.clone();
        async move {
            let mut rows: Vec<AccountActivity> = self
                .get(tables::LAST_REGISTRATIONS, ACTIVITY_KEY)
                .await?
                .unwrap_or_default();
            rows.insert(0, activity);
            rows.truncate(cap);
            self.set(tables::LAST_REGISTRATIONS, ACTIVITY_KEY, &rows).await
        }
    }

    fn get_last_logins(
        &self,
        count: usize,
    ) -> impl Future<Output = Result<Option<Vec<AccountActivity>>, StoreError>> + Send
    {
        async move {
            let rows: Option<Vec<AccountActivity>> =
                self.get(tables::LAST_LOGINS, ACTIVITY_KEY).await?;
            Ok(rows.map(|mut v| {
                v.truncate(count);
                v
            }))
        }
    }

    fn get_last_registrations(
        &self,
        count: usize,
    ) -> impl Future<Output = Result<Option<Vec<AccountActivity>>, StoreError>> + Send
    {
        async move {
            let rows: Option<Vec<AccountActivity>> =
                self.get(tables::LAST_REGISTRATIONS, ACTIVITY_KEY).await?;
            Ok(rows.map(|mut v| {
                v.truncate(count);
                v
            }))
        }
    }
}

impl<S: ProfileStore + ?Sized> ProfileStoreExt for S {}
