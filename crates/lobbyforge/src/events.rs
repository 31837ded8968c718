//! Transport-driven lifecycle events: peer connect/disconnect and
//! account login/logout/registration.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use lobbyforge_instance::Provisioner;
use lobbyforge_protocol::{
    AccessLevel, Account, AccountActivity, AccountId, InputSettings, OnlineStatus, PeerId,
    PlayerLocation, ServerRpc,
};
use lobbyforge_session::Wire;
use lobbyforge_store::{ProfileStore, ProfileStoreExt};

use crate::geo::IpGeo;
use crate::mail::Mailer;
use crate::server::LobbyServer;

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl<S, W, P, M, G> LobbyServer<S, W, P, M, G>
where
    S: ProfileStore,
    W: Wire,
    P: Provisioner,
    M: Mailer,
    G: IpGeo,
{
    /// A peer connected: send the version handshake and kick off the
    /// country lookup for its address. Nothing else happens until the
    /// transport reports a successful login for this peer.
    pub fn on_peer_connected(&self, peer: PeerId, ip: &str) {
        debug!(%peer, %ip, "peer connected");
        self.wire.send(
            peer,
            ServerRpc::VersionNumber {
                version: self.config.version,
            },
        );
        let geo = Arc::clone(&self.geo);
        let store = Arc::clone(&self.store);
        let ip = ip.to_owned();
        tokio::spawn(async move {
            let Some(country) = geo.country_for(&ip).await else {
                debug!(%ip, "no country known for address");
                return;
            };
            if let Err(error) = store.set_ip_country(&ip, &country).await {
                warn!(%ip, %error, "failed to persist ip country");
            }
        });
    }

    /// The transport authenticated `account` on `peer`.
    ///
    /// The session is constructed and indexed before anything awaits, so
    /// a disconnect landing during the location fetch finds it and tears
    /// it down like any other session. The authentication round-trip to
    /// the backing store can outlast the connection, so liveness is
    /// re-checked after construction and again after the fetch; an
    /// aborted login starts no hydration and no bookkeeping.
    pub async fn on_account_logged_in(&self, account: &Account, peer: PeerId, ip: &str) {
        {
            let mut sessions = self.sessions.lock().await;
            let session = sessions.create(
                account,
                peer,
                PlayerLocation::town(&self.config.starting_map),
            );
            session.online_status = OnlineStatus::Online;
        }

        if !self.wire.is_connected(peer) {
            info!(account = %account.id, %peer, "login race: peer gone, aborting login");
            self.cleanup_peer(peer).await;
            return;
        }

        let location = match self.store.get_location(&account.id).await {
            Ok(Some(location)) => location,
            Ok(None) => PlayerLocation::town(&self.config.starting_map),
            Err(error) => {
                warn!(account = %account.id, %error, "location fetch failed, using starting town");
                PlayerLocation::town(&self.config.starting_map)
            }
        };

        {
            let mut sessions = self.sessions.lock().await;
            // The session may have been torn down (disconnect) or rebound
            // (another login on this peer) while the fetch was in flight.
            let Some(session) = sessions.get_by_peer_mut(peer) else {
                info!(account = %account.id, %peer, "session ended during login, aborting");
                return;
            };
            if session.account_id != account.id {
                info!(account = %account.id, %peer, "peer rebound during login, aborting");
                return;
            }
            session.location = location;
        }
        info!(account = %account.id, %peer, "account logged in");

        if let Err(error) = self
            .store
            .set_online_status(&account.id, OnlineStatus::Online)
            .await
        {
            warn!(account = %account.id, %error, "failed to persist online status");
        }

        self.hydrator.hydrate(&account.id, peer);
        self.spawn_login_aux(account.id.clone(), peer);
        self.spawn_login_bookkeeping(account.clone(), ip.to_owned());
    }

    /// The transport reports an explicit logout for `account`.
    pub async fn on_account_logged_out(&self, account: &AccountId) {
        if !self.sessions.lock().await.contains(account) {
            warn!(%account, "logout for account with no session");
            return;
        }
        if let Err(error) = self
            .store
            .set_online_status(account, OnlineStatus::Offline)
            .await
        {
            warn!(%account, %error, "failed to persist offline status");
        }
        self.cleanup_session(account).await;
        info!(%account, "account logged out");
    }

    /// A peer vanished. The durable logout write is best-effort; the
    /// in-memory cleanup below it is unconditional, so a store outage can
    /// never orphan a session. Safe to call for peers without sessions,
    /// and keyed by peer throughout: if the account has already logged
    /// back in on another connection while the offline write was in
    /// flight, the stale disconnect touches nothing.
    pub async fn on_peer_disconnected(&self, peer: PeerId) {
        let account = self.sessions.lock().await.account_for_peer(peer).cloned();
        let Some(account) = account else {
            debug!(%peer, "disconnect for peer with no session");
            return;
        };
        if let Err(error) = self
            .store
            .set_online_status(&account, OnlineStatus::Offline)
            .await
        {
            warn!(%account, %error, "failed to persist offline status");
        }
        self.cleanup_peer(peer).await;
        info!(%account, %peer, "peer disconnected, session ended");
    }

    /// A brand-new account: record when it registered.
    pub async fn on_account_registered(&self, account: &Account) {
        let timestamp_ms = now_ms();
        info!(account = %account.id, "account registered");
        if let Err(error) = self
            .store
            .set_registration_date(&account.id, timestamp_ms)
            .await
        {
            warn!(account = %account.id, %error, "failed to persist registration date");
        }
        let activity = AccountActivity {
            account_id: account.id.clone(),
            email: account.email.clone(),
            timestamp_ms,
        };
        if let Err(error) = self
            .store
            .push_registration_activity(&activity, self.config.activity_cap)
            .await
        {
            warn!(account = %account.id, %error, "failed to record registration activity");
        }
    }

    /// Account-keyed teardown, for explicit logout.
    async fn cleanup_session(&self, account: &AccountId) {
        let mut sessions = self.sessions.lock().await;
        let mut instances = self.instances.lock().await;
        instances.leave(&mut sessions, account);
        sessions.remove_by_account(account);
        let mut channels = self.channels.lock().await;
        channels.global.unsubscribe(account);
        channels.announce.unsubscribe(account);
    }

    /// Peer-keyed teardown, for disconnects and aborted logins. Only the
    /// session still bound to `peer` is touched, and channel membership
    /// is released only while it still points at this peer, so a
    /// displacing session the same account opened on another connection
    /// survives untouched.
    async fn cleanup_peer(&self, peer: PeerId) {
        let mut sessions = self.sessions.lock().await;
        let mut instances = self.instances.lock().await;
        if let Some(account) = sessions.account_for_peer(peer).cloned() {
            instances.leave(&mut sessions, &account);
        }
        let Some(session) = sessions.remove_by_peer(peer) else {
            return;
        };
        let mut channels = self.channels.lock().await;
        channels.global.unsubscribe_peer(&session.account_id, peer);
        channels.announce.unsubscribe_peer(&session.account_id, peer);
    }

    /// Login-time fetches that do not belong to the profile fan-out:
    /// input settings (pushed to the client), access level, friends and
    /// followers (cached on the session). One task, each fetch failing
    /// independently.
    fn spawn_login_aux(&self, account: AccountId, peer: PeerId) {
        let store = Arc::clone(&self.store);
        let wire = Arc::clone(&self.wire);
        let sessions = Arc::clone(self.sessions());
        tokio::spawn(async move {
            match store.get_input_settings(&account).await {
                Ok(row) => {
                    let settings = row.unwrap_or_else(InputSettings::default);
                    if let Some(session) = sessions.lock().await.get_mut(&account) {
                        session.input_settings = Some(settings.clone());
                    }
                    if wire.is_connected(peer) {
                        wire.send(peer, ServerRpc::ReceiveInputSettings { settings });
                    }
                }
                Err(error) => {
                    warn!(%account, %error, "input settings fetch failed");
                }
            }

            match store.get_access_level(&account).await {
                Ok(row) => {
                    let level = row.unwrap_or(AccessLevel::Player);
                    if let Some(session) = sessions.lock().await.get_mut(&account) {
                        session.access_level = level;
                    }
                }
                Err(error) => {
                    warn!(%account, %error, "access level fetch failed");
                }
            }

            match store.get_friends(&account).await {
                Ok(row) => {
                    if let Some(session) = sessions.lock().await.get_mut(&account) {
                        session.friends = Some(row.unwrap_or_default());
                    }
                }
                Err(error) => {
                    warn!(%account, %error, "friends fetch failed");
                }
            }

            match store.get_followers(&account).await {
                Ok(row) => {
                    if let Some(session) = sessions.lock().await.get_mut(&account) {
                        session.followers = Some(row.unwrap_or_default());
                    }
                }
                Err(error) => {
                    warn!(%account, %error, "followers fetch failed");
                }
            }
        });
    }

    /// Durable login bookkeeping: last-login timestamp and activity list,
    /// the IP → accounts map (append-if-absent), and geolocation.
    fn spawn_login_bookkeeping(&self, account: Account, ip: String) {
        let store = Arc::clone(&self.store);
        let geo = Arc::clone(&self.geo);
        let cap = self.config.activity_cap;
        tokio::spawn(async move {
            let timestamp_ms = now_ms();
            if let Err(error) = store.set_last_login(&account.id, timestamp_ms).await {
                warn!(account = %account.id, %error, "failed to persist last login");
            }
            let activity = AccountActivity {
                account_id: account.id.clone(),
                email: account.email.clone(),
                timestamp_ms,
            };
            if let Err(error) = store.push_login_activity(&activity, cap).await {
                warn!(account = %account.id, %error, "failed to record login activity");
            }

            match store.get_accounts_for_ip(&ip).await {
                Ok(row) => {
                    let mut accounts = row.unwrap_or_default();
                    if !accounts.contains(&account.id) {
                        accounts.push(account.id.clone());
                        if let Err(error) = store.set_accounts_for_ip(&ip, &accounts).await {
                            warn!(account = %account.id, ip = %ip, %error, "failed to update ip account map");
                        }
                    }
                }
                Err(error) => {
                    warn!(ip = %ip, %error, "ip account map fetch failed");
                }
            }

            if let Some(country) = geo.country_for(&ip).await {
                if let Err(error) = store.set_country(&account.id, &country).await {
                    warn!(account = %account.id, %error, "failed to persist account country");
                }
            }
        });
    }
}
