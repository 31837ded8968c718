use thiserror::Error;

use crate::mail::MailError;
use lobbyforge_instance::InstanceError;
use lobbyforge_session::SessionError;
use lobbyforge_store::StoreError;

/// Umbrella error for lobby lifecycle operations.
#[derive(Debug, Error)]
pub enum LobbyError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error(transparent)]
    Mail(#[from] MailError),
}
