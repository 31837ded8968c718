//! The instance registry: every game-world server the lobby has asked
//! for, from provision request to teardown.
//!
//! Indexing discipline: a record enters the map-name index and the
//! waiting list *before* its provisioning call leaves the registry, so a
//! concurrent lookup by map name never misses a just-requested instance.
//! On teardown, every index removal that should succeed but does not is
//! logged as an integrity error and teardown continues — a missing entry
//! signals a prior bug, not a reason to leave the rest inconsistent.

use std::collections::HashMap;

use tracing::{debug, error, info, warn};

use lobbyforge_protocol::{
    AccountId, InstanceAddress, InstanceId, PeerId, RequestId, ServerKind,
};
use lobbyforge_session::{ChatChannel, SessionManager};

use crate::error::InstanceError;
use crate::instance::{GameInstance, InstanceConfig, InstanceState, launch_args};
use crate::provision::ProvisionRequest;

/// What the provisioner reports when an instance finishes booting.
#[derive(Debug, Clone)]
pub struct InstanceInfo {
    pub instance_id: InstanceId,
    pub address: InstanceAddress,
}

/// Result of a successful availability callback: everything the caller
/// needs to tell waiting members where to connect.
#[derive(Debug, Clone)]
pub struct ReadyInstance {
    pub request: RequestId,
    pub map_name: String,
    pub address: InstanceAddress,
    /// Peers of the sessions already joined to this instance.
    pub members: Vec<PeerId>,
}

/// Result of tearing an instance down.
#[derive(Debug, Clone)]
pub struct Unregistered {
    /// The removed record, state set to `Terminated`.
    pub instance: GameInstance,
    /// Members whose location was a town hub — the caller must run the
    /// town recovery flow for each.
    pub redirect_to_town: Vec<AccountId>,
}

/// Where a `place` call put the player.
#[derive(Debug, Clone)]
pub enum Placement {
    /// Joined a live instance; connection info is available immediately.
    Joined {
        request: RequestId,
        map_name: String,
        address: InstanceAddress,
    },
    /// Joined an instance that is still booting; connection info arrives
    /// with its availability callback.
    Pending(RequestId),
    /// No instance fit, a new one was registered. The caller must issue
    /// the provisioning call; the player is already a member.
    Provisioning(ProvisionRequest),
}

/// Registry of all known instances with secondary indexes by live
/// instance id and by map name, plus waiting/running lists.
///
/// Membership is *not* an index here — the session's `instance` backref
/// is authoritative, and membership questions walk the session manager.
/// That keeps exactly one owner per fact.
#[derive(Default)]
pub struct InstanceRegistry {
    next_request: u64,
    instances: HashMap<RequestId, GameInstance>,
    by_instance_id: HashMap<InstanceId, RequestId>,
    by_map: HashMap<String, Vec<RequestId>>,
    waiting: Vec<RequestId>,
    running: Vec<RequestId>,
    channels: HashMap<RequestId, ChatChannel>,
    config: InstanceConfig,
}

/// How many sessions reference `request` as their instance.
pub fn occupancy(sessions: &SessionManager, request: RequestId) -> usize {
    sessions
        .iter()
        .filter(|s| s.instance == Some(request))
        .count()
}

impl InstanceRegistry {
    pub fn new(config: InstanceConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Registers a new instance for `map_name` and returns the
    /// provisioning call the caller must issue. The record is fully
    /// indexed (map index, waiting list) before this returns.
    pub fn register(&mut self, map_name: &str, kind: ServerKind) -> ProvisionRequest {
        let request = RequestId(self.next_request);
        self.next_request += 1;

        self.instances
            .insert(request, GameInstance::new(request, map_name, kind));
        self.by_map
            .entry(map_name.to_owned())
            .or_default()
            .push(request);
        self.waiting.push(request);
        if let Some(instance) = self.instances.get_mut(&request) {
            instance.state = InstanceState::Waiting;
        }

        info!(%request, map = %map_name, %kind, "instance registered, awaiting provision");
        ProvisionRequest {
            request,
            map_name: map_name.to_owned(),
            kind,
            args: launch_args(kind, map_name),
        }
    }

    /// Availability callback: `request` finished booting as `info`.
    ///
    /// An unknown request id means the provisioner and the registry have
    /// desynced — logged loudly and rejected. On success the instance's
    /// chat channel is created and every already-joined member is
    /// subscribed to it.
    pub fn on_instance_available(
        &mut self,
        request: RequestId,
        info: InstanceInfo,
        sessions: &SessionManager,
    ) -> Result<ReadyInstance, InstanceError> {
        let Some(instance) = self.instances.get_mut(&request) else {
            error!(
                %request,
                instance_id = %info.instance_id,
                "availability callback for unknown request"
            );
            return Err(InstanceError::UnknownRequest(request));
        };
        if instance.state != InstanceState::Waiting {
            error!(%request, state = ?instance.state, "availability callback in unexpected state");
        }
        instance.state = InstanceState::Running;
        instance.instance_id = Some(info.instance_id.clone());
        instance.address = Some(info.address.clone());
        let map_name = instance.map_name.clone();

        self.by_instance_id.insert(info.instance_id.clone(), request);
        match self.waiting.iter().position(|r| *r == request) {
            Some(pos) => {
                self.waiting.remove(pos);
            }
            None => error!(%request, "waiting list entry missing on availability"),
        }
        self.running.push(request);

        let mut channel = ChatChannel::new(format!("{map_name}@{}", info.address));
        let mut members = Vec::new();
        for session in sessions.iter() {
            if session.instance == Some(request) {
                channel.subscribe(&session.account_id, session.peer);
                members.push(session.peer);
            }
        }
        self.channels.insert(request, channel);

        info!(
            %request,
            instance_id = %info.instance_id,
            address = %info.address,
            map = %map_name,
            "instance running"
        );
        Ok(ReadyInstance {
            request,
            map_name,
            address: info.address,
            members,
        })
    }

    /// Tears down a running instance: purges every index, clears member
    /// backrefs, collects town-located members for the caller's recovery
    /// flow, and drops the chat channel.
    pub fn unregister(
        &mut self,
        request: RequestId,
        sessions: &mut SessionManager,
    ) -> Result<Unregistered, InstanceError> {
        let Some(mut instance) = self.instances.remove(&request) else {
            error!(%request, "unregister for unknown request");
            return Err(InstanceError::UnknownRequest(request));
        };
        if instance.state != InstanceState::Running {
            error!(%request, state = ?instance.state, "unregister from non-running state");
            self.instances.insert(request, instance);
            return Err(InstanceError::NotRunning(request));
        }

        match &instance.instance_id {
            Some(id) => {
                if self.by_instance_id.remove(id).is_none() {
                    error!(%request, instance_id = %id, "instance-id index entry missing during unregister");
                }
            }
            None => error!(%request, "running instance had no instance id"),
        }

        match self.by_map.get_mut(&instance.map_name) {
            Some(list) => {
                match list.iter().position(|r| *r == request) {
                    Some(pos) => {
                        list.remove(pos);
                    }
                    None => {
                        error!(%request, map = %instance.map_name, "map index entry missing during unregister")
                    }
                }
                if list.is_empty() {
                    self.by_map.remove(&instance.map_name);
                }
            }
            None => {
                error!(%request, map = %instance.map_name, "map index list missing during unregister")
            }
        }

        match self.running.iter().position(|r| *r == request) {
            Some(pos) => {
                self.running.remove(pos);
            }
            None => error!(%request, "running list entry missing during unregister"),
        }

        let mut redirect_to_town = Vec::new();
        for session in sessions.iter_mut() {
            if session.instance == Some(request) {
                session.instance = None;
                if session.in_town() {
                    warn!(
                        account = %session.account_id,
                        %request,
                        "instance lost, forcing town recovery"
                    );
                    redirect_to_town.push(session.account_id.clone());
                } else {
                    debug!(
                        account = %session.account_id,
                        %request,
                        "instance lost, cleared instance reference"
                    );
                }
            }
        }

        if self.channels.remove(&request).is_none() {
            error!(%request, "map channel missing during unregister");
        }

        instance.state = InstanceState::Terminated;
        info!(%request, map = %instance.map_name, "instance unregistered");
        Ok(Unregistered {
            instance,
            redirect_to_town,
        })
    }

    /// Places `account` on `map_name`: prefer a live instance with
    /// capacity, fall back to one still booting, else register a new one.
    pub fn place(
        &mut self,
        sessions: &mut SessionManager,
        account: &AccountId,
        map_name: &str,
        kind: ServerKind,
    ) -> Result<Placement, InstanceError> {
        if !sessions.contains(account) {
            warn!(%account, map = %map_name, "placement requested for account with no session");
            return Err(InstanceError::MemberNotLoggedIn(account.clone()));
        }
        let max = self.config.max_players as usize;
        let candidate = self.by_map.get(map_name).and_then(|list| {
            list.iter()
                .copied()
                .find(|req| {
                    self.is_state(*req, InstanceState::Running)
                        && occupancy(sessions, *req) < max
                })
                .or_else(|| {
                    list.iter().copied().find(|req| {
                        self.is_state(*req, InstanceState::Waiting)
                            && occupancy(sessions, *req) < max
                    })
                })
        });

        match candidate {
            Some(request) => {
                self.join(sessions, account, request)?;
                match self.instances.get(&request) {
                    Some(instance) if instance.is_running() => match &instance.address {
                        Some(address) => Ok(Placement::Joined {
                            request,
                            map_name: instance.map_name.clone(),
                            address: address.clone(),
                        }),
                        None => {
                            error!(%request, "running instance missing address");
                            Ok(Placement::Pending(request))
                        }
                    },
                    _ => Ok(Placement::Pending(request)),
                }
            }
            None => {
                let provision = self.register(map_name, kind);
                self.join(sessions, account, provision.request)?;
                Ok(Placement::Provisioning(provision))
            }
        }
    }

    /// Marks `account` as a member of `request` and subscribes them to
    /// its chat channel if the instance is already live.
    pub fn join(
        &mut self,
        sessions: &mut SessionManager,
        account: &AccountId,
        request: RequestId,
    ) -> Result<(), InstanceError> {
        if !self.instances.contains_key(&request) {
            return Err(InstanceError::UnknownRequest(request));
        }
        let Some(session) = sessions.get_mut(account) else {
            return Err(InstanceError::MemberNotLoggedIn(account.clone()));
        };
        session.instance = Some(request);
        if let Some(channel) = self.channels.get_mut(&request) {
            channel.subscribe(&session.account_id, session.peer);
        }
        debug!(%account, %request, "joined instance");
        Ok(())
    }

    /// Drops `account`'s membership, unsubscribing them from the
    /// instance's chat channel. No-op for non-members.
    pub fn leave(&mut self, sessions: &mut SessionManager, account: &AccountId) {
        let Some(session) = sessions.get_mut(account) else {
            return;
        };
        let Some(request) = session.instance.take() else {
            return;
        };
        if let Some(channel) = self.channels.get_mut(&request) {
            channel.unsubscribe(account);
        }
        debug!(%account, %request, "left instance");
    }

    // -- Lookups -----------------------------------------------------------

    pub fn get(&self, request: RequestId) -> Option<&GameInstance> {
        self.instances.get(&request)
    }

    pub fn request_for_instance(&self, id: &InstanceId) -> Option<RequestId> {
        self.by_instance_id.get(id).copied()
    }

    pub fn get_by_instance_id(&self, id: &InstanceId) -> Option<&GameInstance> {
        self.instances.get(self.by_instance_id.get(id)?)
    }

    /// All instances registered for `map_name`, any state.
    pub fn on_map(&self, map_name: &str) -> &[RequestId] {
        self.by_map.get(map_name).map_or(&[], Vec::as_slice)
    }

    pub fn waiting(&self) -> &[RequestId] {
        &self.waiting
    }

    pub fn running(&self) -> &[RequestId] {
        &self.running
    }

    pub fn map_channel(&self, request: RequestId) -> Option<&ChatChannel> {
        self.channels.get(&request)
    }

    pub fn map_channel_mut(&mut self, request: RequestId) -> Option<&mut ChatChannel> {
        self.channels.get_mut(&request)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    fn is_state(&self, request: RequestId, state: InstanceState) -> bool {
        self.instances
            .get(&request)
            .is_some_and(|i| i.state == state)
    }
}

// =========================================================================
// Tests
// =========================================================================
