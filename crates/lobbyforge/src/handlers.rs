//! Client RPC dispatch.
//!
//! Every handler resolves the calling peer's live session before doing
//! anything else; an RPC from a peer with no session sends nothing and
//! is reported back to the transport as an authentication error.
//! Authorization failures are logged and answered with silence,
//! validation failures with the dedicated negative RPC.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use lobbyforge_instance::Provisioner;
use lobbyforge_protocol::{
    AccessLevel, AccountId, ClientRpc, InstanceId, PeerId, PlayerLocation, RankingSubject,
    ServerKind, ServerRpc,
};
use lobbyforge_session::{SessionError, Wire};
use lobbyforge_store::{ProfileStore, ProfileStoreExt};

use crate::error::LobbyError;
use crate::geo::IpGeo;
use crate::mail::Mailer;
use crate::server::LobbyServer;

/// Snapshot of the calling session taken at dispatch time.
struct Caller {
    account: AccountId,
    email: String,
    name: Option<String>,
    access: AccessLevel,
}

/// Display names are 3–16 ASCII alphanumerics.
pub fn player_name_is_valid(name: &str) -> bool {
    (3..=16).contains(&name.len()) && name.bytes().all(|b| b.is_ascii_alphanumeric())
}

impl<S, W, P, M, G> LobbyServer<S, W, P, M, G>
where
    S: ProfileStore,
    W: Wire,
    P: Provisioner,
    M: Mailer,
    G: IpGeo,
{
    pub async fn handle_rpc(&self, peer: PeerId, rpc: ClientRpc) -> Result<(), LobbyError> {
        let caller = {
            let sessions = self.sessions.lock().await;
            match sessions.get_by_peer(peer) {
                Some(session) => Caller {
                    account: session.account_id.clone(),
                    email: session.email.clone(),
                    name: session.name.clone(),
                    access: session.access_level,
                },
                None => {
                    warn!(%peer, ?rpc, "rpc from peer with no session");
                    return Err(SessionError::NotAuthenticated(peer).into());
                }
            }
        };

        match rpc {
            ClientRpc::Ready => self.ready(&caller, peer).await,
            ClientRpc::PlayerNameChange { new_name } => {
                self.change_player_name(&caller, peer, new_name).await
            }
            ClientRpc::PlayerNameExists { name } => {
                self.check_player_name(&caller, peer, name).await
            }
            ClientRpc::ChangePassword { new_password } => {
                self.change_password(&caller, new_password).await
            }
            ClientRpc::ViewProfile { player_name } => {
                self.view_profile(&caller, peer, player_name).await
            }
            ClientRpc::RequestPlayerName { account_id } => {
                self.request_player_name(peer, account_id).await
            }
            ClientRpc::RequestGameServerInfo => {
                self.request_game_server_info(&caller, peer).await
            }
            ClientRpc::GameServerReady { instance_id } => {
                self.game_server_ready(instance_id).await
            }
            ClientRpc::MailFeedback { text } => self.mail_feedback(&caller, text),
            ClientRpc::StaffInfoRequest => self.staff_info(&caller, peer).await,
            ClientRpc::ActivatePortal {
                map_name,
                target_map_name,
                kind,
            } => {
                self.activate_portal(&caller, map_name, target_map_name, kind)
                    .await
            }
            ClientRpc::RankingListRequest { subject, page } => {
                self.ranking_list(&caller, peer, subject, page).await
            }
        }
        Ok(())
    }

    /// Post-login readiness: subscribe the lobby channels, whisper the
    /// message of the day, and place the player on their current map.
    async fn ready(&self, caller: &Caller, peer: PeerId) {
        let location = {
            let sessions = self.sessions.lock().await;
            match sessions.get(&caller.account) {
                Some(session) => session.location.clone(),
                None => return,
            }
        };
        {
            let mut channels = self.channels.lock().await;
            channels.global.subscribe(&caller.account, peer);
            channels.announce.subscribe(&caller.account, peer);
            for line in &self.config.motd {
                channels
                    .announce
                    .whisper_system(self.wire.as_ref(), peer, line);
            }
        }
        info!(account = %caller.account, map = %location.map_name, "player ready");
        self.place_session(&caller.account, &location.map_name, location.kind)
            .await;
    }

    async fn change_player_name(&self, caller: &Caller, peer: PeerId, new_name: String) {
        if !player_name_is_valid(&new_name) {
            debug!(account = %caller.account, name = %new_name, "rejected invalid player name");
            self.wire
                .send(peer, ServerRpc::PlayerNameAlreadyExists { name: new_name });
            return;
        }
        match self.store.get_account_id_by_name(&new_name).await {
            Ok(Some(holder)) if holder != caller.account => {
                self.wire
                    .send(peer, ServerRpc::PlayerNameAlreadyExists { name: new_name });
            }
            Ok(_) => {
                if let Err(error) = self.store.set_player_name(&caller.account, &new_name).await
                {
                    warn!(account = %caller.account, %error, "player name write failed");
                    return;
                }
                self.hydrator.names().insert(&caller.account, &new_name);
                if let Some(session) =
                    self.sessions.lock().await.get_mut(&caller.account)
                {
                    session.name = Some(new_name.clone());
                }
                info!(account = %caller.account, name = %new_name, "player name changed");
                self.wire.send(
                    peer,
                    ServerRpc::ReceivePlayerName {
                        account_id: caller.account.clone(),
                        name: new_name,
                    },
                );
            }
            Err(error) => {
                warn!(account = %caller.account, %error, "name uniqueness check failed");
            }
        }
    }

    async fn check_player_name(&self, caller: &Caller, peer: PeerId, name: String) {
        if !player_name_is_valid(&name) {
            self.wire
                .send(peer, ServerRpc::PlayerNameAlreadyExists { name });
            return;
        }
        match self.store.get_account_id_by_name(&name).await {
            Ok(Some(_)) => self
                .wire
                .send(peer, ServerRpc::PlayerNameAlreadyExists { name }),
            Ok(None) => self.wire.send(peer, ServerRpc::PlayerNameFree { name }),
            Err(error) => {
                warn!(account = %caller.account, %error, "name lookup failed");
            }
        }
    }

    async fn change_password(&self, caller: &Caller, new_password: String) {
        match self.store.set_password(&caller.account, &new_password).await {
            Ok(()) => info!(account = %caller.account, "password changed"),
            Err(error) => {
                warn!(account = %caller.account, %error, "password write failed");
            }
        }
    }

    /// Profile view by display name: resolve the name, then run the full
    /// hydration fan-out toward the requester.
    async fn view_profile(&self, caller: &Caller, peer: PeerId, player_name: String) {
        match self.store.get_account_id_by_name(&player_name).await {
            Ok(Some(subject)) => self.hydrator.hydrate(&subject, peer),
            Ok(None) => {
                self.wire
                    .send(peer, ServerRpc::ViewProfileError { player_name });
            }
            Err(error) => {
                warn!(account = %caller.account, name = %player_name, %error, "profile lookup failed");
            }
        }
    }

    async fn request_player_name(&self, peer: PeerId, account_id: AccountId) {
        match self.hydrator.resolve_name(&account_id).await {
            Ok(Some(name)) => self.wire.send(
                peer,
                ServerRpc::ReceivePlayerName { account_id, name },
            ),
            Ok(None) => debug!(account = %account_id, "name request for unnamed account"),
            Err(error) => warn!(account = %account_id, %error, "name resolution failed"),
        }
    }

    async fn request_game_server_info(&self, caller: &Caller, peer: PeerId) {
        let info = {
            let sessions = self.sessions.lock().await;
            let instances = self.instances.lock().await;
            sessions
                .get(&caller.account)
                .and_then(|s| s.instance)
                .and_then(|request| instances.get(request))
                .and_then(|i| i.address.clone().map(|a| (i.map_name.clone(), a)))
        };
        match info {
            Some((map_name, address)) => {
                self.wire
                    .send(peer, ServerRpc::ReceiveGameServerInfo { map_name, address });
            }
            None => debug!(account = %caller.account, "no live instance to report"),
        }
    }

    async fn game_server_ready(&self, instance_id: InstanceId) {
        let instances = self.instances.lock().await;
        match instances.get_by_instance_id(&instance_id) {
            Some(instance) => {
                info!(
                    %instance_id,
                    request = %instance.request,
                    map = %instance.map_name,
                    "game server confirmed ready"
                );
            }
            None => error!(%instance_id, "readiness confirmation for unknown instance"),
        }
    }

    /// Relays feedback to the operators' mailbox, reply-to set to the
    /// player's login address.
    fn mail_feedback(&self, caller: &Caller, text: String) {
        let mailer = Arc::clone(&self.mailer);
        let to = self.config.feedback_address.clone();
        let subject = format!(
            "Feedback from {}",
            caller.name.as_deref().unwrap_or(caller.account.as_str())
        );
        let reply_to = caller.email.clone();
        let account = caller.account.clone();
        tokio::spawn(async move {
            if let Err(error) = mailer.send(&to, &subject, &text, &reply_to).await {
                warn!(%account, %error, "feedback mail failed");
            }
        });
    }

    /// Staff-only recent-activity lists. Refusal is silent toward the
    /// client and loud in the logs.
    async fn staff_info(&self, caller: &Caller, peer: PeerId) {
        if caller.access <= AccessLevel::Player {
            warn!(
                account = %caller.account,
                access = ?caller.access,
                "staff info refused for insufficient access level"
            );
            return;
        }
        let count = self.config.staff_activity_count;
        match self.store.get_last_logins(count).await {
            Ok(rows) => self.wire.send(
                peer,
                ServerRpc::ReceiveLastLogins {
                    logins: rows.unwrap_or_default(),
                },
            ),
            Err(error) => warn!(account = %caller.account, %error, "last logins fetch failed"),
        }
        match self.store.get_last_registrations(count).await {
            Ok(rows) => self.wire.send(
                peer,
                ServerRpc::ReceiveLastRegistrations {
                    registrations: rows.unwrap_or_default(),
                },
            ),
            Err(error) => {
                warn!(account = %caller.account, %error, "last registrations fetch failed");
            }
        }
    }

    /// Records the pending map transition and re-places the player.
    async fn activate_portal(
        &self,
        caller: &Caller,
        map_name: String,
        target_map_name: String,
        kind: ServerKind,
    ) {
        let location = PlayerLocation {
            map_name: target_map_name.clone(),
            kind,
        };
        {
            let mut sessions = self.sessions.lock().await;
            let mut instances = self.instances.lock().await;
            instances.leave(&mut sessions, &caller.account);
            if let Some(session) = sessions.get_mut(&caller.account) {
                session.location = location.clone();
            }
        }
        if let Err(error) = self.store.set_location(&caller.account, &location).await {
            warn!(account = %caller.account, %error, "failed to persist portal location");
        }
        info!(
            account = %caller.account,
            from = %map_name,
            to = %target_map_name,
            "portal activated"
        );
        self.place_session(&caller.account, &target_map_name, kind)
            .await;
    }

    async fn ranking_list(
        &self,
        caller: &Caller,
        peer: PeerId,
        subject: RankingSubject,
        page: u8,
    ) {
        match self.rankings.get_page(subject, page).await {
            Ok(ranks) => self.wire.send(
                peer,
                ServerRpc::ReceiveRankingList {
                    subject,
                    page,
                    ranks,
                },
            ),
            Err(error) => {
                warn!(account = %caller.account, %subject, page, %error, "ranking page fetch failed");
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_name_length_bounds() {
        assert!(!player_name_is_valid("ab"));
        assert!(player_name_is_valid("abc"));
        assert!(player_name_is_valid("a234567890123456"));
        assert!(!player_name_is_valid("a2345678901234567"));
    }

    #[test]
    fn test_player_name_rejects_non_alphanumerics() {
        assert!(!player_name_is_valid("has space"));
        assert!(!player_name_is_valid("semi;colon"));
        assert!(!player_name_is_valid("ünïcode"));
        assert!(player_name_is_valid("Arwic42"));
    }
}
