//! The lobby server: composition root over sessions, instances,
//! rankings, channels, and the external collaborators.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use lobbyforge_instance::{
    InstanceConfig, InstanceError, InstanceInfo, InstanceRegistry, Placement, ProvisionRequest,
    Provisioner,
};
use lobbyforge_protocol::{
    AccountId, InstanceId, PlayerLocation, RequestId, ServerKind, ServerRpc,
};
use lobbyforge_rankings::RankingService;
use lobbyforge_session::{ChatChannel, Hydrator, NameCache, SessionError, SessionManager, Wire};
use lobbyforge_store::{ProfileStore, ProfileStoreExt};

use crate::config::LobbyConfig;
use crate::error::LobbyError;
use crate::geo::IpGeo;
use crate::mail::Mailer;

/// The two lobby-wide channels every ready player is subscribed to.
pub(crate) struct LobbyChannels {
    pub(crate) global: ChatChannel,
    pub(crate) announce: ChatChannel,
}

impl LobbyChannels {
    fn new() -> Self {
        Self {
            global: ChatChannel::new("global"),
            announce: ChatChannel::new("announcements"),
        }
    }
}

/// One lobby process.
///
/// Owns all mutable lobby state behind `tokio::sync::Mutex` and talks to
/// the outside world only through the trait collaborators. Lock order,
/// where more than one is held: sessions, then instances, then channels.
pub struct LobbyServer<S, W, P, M, G> {
    pub(crate) config: LobbyConfig,
    pub(crate) store: Arc<S>,
    pub(crate) wire: Arc<W>,
    pub(crate) provisioner: Arc<P>,
    pub(crate) mailer: Arc<M>,
    pub(crate) geo: Arc<G>,
    pub(crate) sessions: Arc<Mutex<SessionManager>>,
    pub(crate) instances: Arc<Mutex<InstanceRegistry>>,
    pub(crate) channels: Arc<Mutex<LobbyChannels>>,
    pub(crate) rankings: Arc<RankingService<S>>,
    pub(crate) hydrator: Hydrator<S, W>,
}

impl<S, W, P, M, G> LobbyServer<S, W, P, M, G>
where
    S: ProfileStore,
    W: Wire,
    P: Provisioner,
    M: Mailer,
    G: IpGeo,
{
    pub fn new(
        config: LobbyConfig,
        store: Arc<S>,
        wire: Arc<W>,
        provisioner: Arc<P>,
        mailer: Arc<M>,
        geo: Arc<G>,
    ) -> Self {
        let sessions = Arc::new(Mutex::new(SessionManager::new()));
        let instances = Arc::new(Mutex::new(InstanceRegistry::new(InstanceConfig {
            max_players: config.max_players_per_instance,
        })));
        let rankings = Arc::new(RankingService::new(
            Arc::clone(&store),
            config.ranking_page_size,
            config.ranking_max_age,
        ));
        let hydrator = Hydrator::new(
            Arc::clone(&store),
            Arc::clone(&wire),
            Arc::clone(&sessions),
            Arc::new(NameCache::new()),
        );
        Self {
            config,
            store,
            wire,
            provisioner,
            mailer,
            geo,
            sessions,
            instances,
            channels: Arc::new(Mutex::new(LobbyChannels::new())),
            rankings,
            hydrator,
        }
    }

    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<Mutex<SessionManager>> {
        &self.sessions
    }

    pub fn instances(&self) -> &Arc<Mutex<InstanceRegistry>> {
        &self.instances
    }

    pub fn rankings(&self) -> &Arc<RankingService<S>> {
        &self.rankings
    }

    /// Starts the periodic ranking refresh.
    pub fn spawn_ranking_refresh(&self) -> tokio::task::JoinHandle<()> {
        Arc::clone(&self.rankings).spawn_refresh_loop(
            Arc::clone(&self.wire),
            Arc::clone(&self.sessions),
            self.config.ranking_refresh_period,
        )
    }

    /// Pre-registers one instance per configured town map so hubs are
    /// booting before the first player hits `Ready`.
    pub async fn start_town_servers(&self) {
        for map in &self.config.town_maps {
            let provision = self.instances.lock().await.register(map, ServerKind::Town);
            info!(map = %map, request = %provision.request, "pre-registering town instance");
            self.spawn_provision(provision);
        }
    }

    /// Tears every running town instance down, running the recovery flow
    /// for members that were in town.
    pub async fn stop_town_servers(&self) {
        let redirects = {
            let mut sessions = self.sessions.lock().await;
            let mut instances = self.instances.lock().await;
            let towns: Vec<RequestId> = instances
                .running()
                .iter()
                .copied()
                .filter(|r| {
                    instances
                        .get(*r)
                        .is_some_and(|i| i.kind == ServerKind::Town)
                })
                .collect();
            let mut all = Vec::new();
            for request in towns {
                if let Ok(outcome) = instances.unregister(request, &mut sessions) {
                    all.extend(outcome.redirect_to_town);
                }
            }
            all
        };
        for account in redirects {
            if let Err(error) = self.return_to_town(&account).await {
                debug!(%account, %error, "town recovery skipped");
            }
        }
    }

    // -- Instance callbacks (driven by the provisioner integration) --------

    /// The instance for `request` finished booting; tell its members
    /// where to connect.
    pub async fn on_instance_available(
        &self,
        request: RequestId,
        info: InstanceInfo,
    ) -> Result<(), LobbyError> {
        let ready = {
            let sessions = self.sessions.lock().await;
            let mut instances = self.instances.lock().await;
            instances.on_instance_available(request, info, &sessions)?
        };
        for peer in ready.members {
            if self.wire.is_connected(peer) {
                self.wire.send(
                    peer,
                    ServerRpc::ReceiveGameServerInfo {
                        map_name: ready.map_name.clone(),
                        address: ready.address.clone(),
                    },
                );
            }
        }
        Ok(())
    }

    /// The named instance died or was stopped; tear it down and recover
    /// town-located members.
    pub async fn on_instance_terminated(
        &self,
        instance_id: &InstanceId,
        reason: &str,
    ) -> Result<(), LobbyError> {
        let redirects = {
            let mut sessions = self.sessions.lock().await;
            let mut instances = self.instances.lock().await;
            let Some(request) = instances.request_for_instance(instance_id) else {
                error!(%instance_id, reason, "termination report for unknown instance");
                return Err(InstanceError::UnknownInstance(instance_id.clone()).into());
            };
            warn!(%instance_id, %request, reason, "instance terminated");
            instances.unregister(request, &mut sessions)?.redirect_to_town
        };
        for account in redirects {
            if let Err(error) = self.return_to_town(&account).await {
                debug!(%account, %error, "town recovery skipped");
            }
        }
        Ok(())
    }

    // -- Placement ----------------------------------------------------------

    /// Crash-recovery and hub fallback: reset the player to the starting
    /// town and re-place them. The member may have logged out since the
    /// redirect list was taken.
    pub async fn return_to_town(&self, account: &AccountId) -> Result<(), LobbyError> {
        let town = PlayerLocation::town(&self.config.starting_map);
        {
            let mut sessions = self.sessions.lock().await;
            let Some(session) = sessions.get_mut(account) else {
                return Err(SessionError::NotFound(account.clone()).into());
            };
            session.location = town.clone();
        }
        if let Err(error) = self.store.set_location(account, &town).await {
            warn!(%account, %error, "failed to persist town recovery location");
        }
        info!(%account, map = %town.map_name, "returned to town");
        self.place_session(account, &town.map_name, ServerKind::Town)
            .await;
        Ok(())
    }

    /// Puts `account` on `map_name`, provisioning a fresh instance when
    /// none fits, and sends connection info if one is live already.
    pub(crate) async fn place_session(
        &self,
        account: &AccountId,
        map_name: &str,
        kind: ServerKind,
    ) {
        let placement = {
            let mut sessions = self.sessions.lock().await;
            let mut instances = self.instances.lock().await;
            match instances.place(&mut sessions, account, map_name, kind) {
                Ok(placement) => placement,
                Err(error) => {
                    warn!(%account, map = %map_name, %error, "placement failed");
                    return;
                }
            }
        };
        match placement {
            Placement::Joined {
                map_name, address, ..
            } => {
                let peer = self.sessions.lock().await.peer_for_account(account);
                if let Some(peer) = peer {
                    self.wire
                        .send(peer, ServerRpc::ReceiveGameServerInfo { map_name, address });
                }
            }
            Placement::Pending(request) => {
                debug!(%account, %request, "waiting on booting instance");
            }
            Placement::Provisioning(provision) => self.spawn_provision(provision),
        }
    }

    pub(crate) fn spawn_provision(&self, provision: ProvisionRequest) {
        let provisioner = Arc::clone(&self.provisioner);
        tokio::spawn(async move {
            let request = provision.request;
            if let Err(error) = provisioner.provision(provision).await {
                error!(%request, %error, "provisioning call failed");
            }
        });
    }
}
