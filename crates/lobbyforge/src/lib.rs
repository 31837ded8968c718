//! Lobbyforge: the lobby tier of a multiplayer game backend.
//!
//! [`LobbyServer`] composes the member crates — session tracking and
//! profile hydration, the game instance registry, the ranking cache, and
//! the profile store facade — behind the transport's event surface
//! (`on_peer_connected`, `on_account_logged_in`, …) and the client RPC
//! dispatcher ([`LobbyServer::handle_rpc`]).
//!
//! External collaborators are traits: the transport's push side
//! ([`session::Wire`]), the backing store ([`store::ProfileStore`]), the
//! instance provisioner ([`instance::Provisioner`]), outbound mail
//! ([`Mailer`]), and IP geolocation ([`IpGeo`]).

mod config;
mod error;
mod events;
mod geo;
mod handlers;
mod mail;
mod server;

pub use config::LobbyConfig;
pub use error::LobbyError;
pub use geo::{IpGeo, TableGeo};
pub use handlers::player_name_is_valid;
pub use mail::{LogMailer, MailError, Mailer};
pub use server::LobbyServer;

pub use lobbyforge_instance as instance;
pub use lobbyforge_protocol as protocol;
pub use lobbyforge_rankings as rankings;
pub use lobbyforge_session as session;
pub use lobbyforge_store as store;
