use lobbyforge_protocol::{AccountId, PeerId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no live session for account {0}")]
    NotFound(AccountId),

    #[error("peer {0} has no authenticated session")]
    NotAuthenticated(PeerId),
}
