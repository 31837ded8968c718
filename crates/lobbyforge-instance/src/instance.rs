//! Game instance records and their lifecycle states.

use lobbyforge_protocol::{InstanceAddress, InstanceId, RequestId, ServerKind};

/// Lifecycle of one instance record.
///
/// `Requested → Waiting` happens inside registration (the record is fully
/// indexed before the provisioning call leaves the registry). `Waiting →
/// Running` happens when the provisioner reports the instance available.
/// `Terminated` is only ever seen on records already removed from the
/// registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Requested,
    Waiting,
    Running,
    Terminated,
}

/// One game-world server instance, live or pending.
///
/// `instance_id` and `address` are `Some` exactly while the record is
/// `Running` — a record without them is still waiting on the provisioner.
#[derive(Debug, Clone)]
pub struct GameInstance {
    pub request: RequestId,
    pub map_name: String,
    pub kind: ServerKind,
    pub state: InstanceState,
    pub instance_id: Option<InstanceId>,
    pub address: Option<InstanceAddress>,
}

impl GameInstance {
    pub(crate) fn new(request: RequestId, map_name: impl Into<String>, kind: ServerKind) -> Self {
        Self {
            request,
            map_name: map_name.into(),
            kind,
            state: InstanceState::Requested,
            instance_id: None,
            address: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == InstanceState::Running
    }
}

/// Command-line arguments the provisioned server boots with. Kind-specific
/// behavior is a match on the tag, not a type hierarchy.
pub fn launch_args(kind: ServerKind, map_name: &str) -> Vec<String> {
    let kind_arg = match kind {
        ServerKind::Town => "-typetown",
        ServerKind::World => "-typeworld",
        ServerKind::Arena => "-typearena",
    };
    vec![kind_arg.to_owned(), format!("-map{map_name}")]
}

/// Registry tuning knobs.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    /// Hard occupancy cap per instance; placement never joins a full one.
    pub max_players: u32,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self { max_players: 16 }
    }
}

// =========================================================================
// Tests
// =========================================================================
