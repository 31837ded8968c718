use lobbyforge_protocol::{AccountId, InstanceId, RequestId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstanceError {
    /// A callback referenced a request the registry never issued — a
    /// provisioner/registry desync.
    #[error("no registered instance for {0}")]
    UnknownRequest(RequestId),

    #[error("no running instance with id {0}")]
    UnknownInstance(InstanceId),

    #[error("instance {0} is not running")]
    NotRunning(RequestId),

    #[error("account {0} has no live session to place")]
    MemberNotLoggedIn(AccountId),

    /// The external provisioner rejected or failed a request.
    #[error("provisioning failed: {0}")]
    Provision(String),
}
