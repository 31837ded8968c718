//! Walks one player through a full lobby session — connect, login,
//! hydration, readiness, town placement, a name change, a ranking page —
//! entirely over the in-memory collaborators, logging every push the
//! client would have received.
//!
//! Run with `RUST_LOG=debug` to watch the hydration fan-out in detail.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lobbyforge::instance::{InstanceInfo, MockProvisioner};
use lobbyforge::protocol::{
    Account, AccountId, ClientRpc, Codec, InstanceAddress, InstanceId, JsonCodec, PeerId,
    RankingSubject,
};
use lobbyforge::session::RecordingWire;
use lobbyforge::store::MemoryStore;
use lobbyforge::{LobbyConfig, LobbyServer, LogMailer, TableGeo};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store = Arc::new(MemoryStore::new());
    let wire = Arc::new(RecordingWire::new());
    let provisioner = Arc::new(MockProvisioner::new());
    let geo = Arc::new(TableGeo::new().with("203.0.113.9", "Iceland"));
    let server = LobbyServer::new(
        LobbyConfig::default(),
        Arc::clone(&store),
        Arc::clone(&wire),
        Arc::clone(&provisioner),
        Arc::new(LogMailer),
        geo,
    );

    server.start_town_servers().await;
    sleep(Duration::from_millis(50)).await;

    let peer = PeerId(1);
    let account = Account {
        id: AccountId::new("acc-42"),
        email: "arwic@example.net".to_owned(),
    };
    server.on_peer_connected(peer, "203.0.113.9");
    server.on_account_logged_in(&account, peer, "203.0.113.9").await;
    if let Err(error) = server.handle_rpc(peer, ClientRpc::Ready).await {
        warn!(%error, "ready rejected");
    }

    // The mock provisioner accepted the town request; pretend the server
    // process finished booting.
    sleep(Duration::from_millis(50)).await;
    if let Some(town) = provisioner.requests().first() {
        if let Err(error) = server
            .on_instance_available(
                town.request,
                InstanceInfo {
                    instance_id: InstanceId::new("inst-town-1"),
                    address: InstanceAddress {
                        host: "10.0.0.5".to_owned(),
                        port: 7777,
                    },
                },
            )
            .await
        {
            warn!(%error, "instance availability report rejected");
        }
    }

    if let Err(error) = server
        .handle_rpc(
            peer,
            ClientRpc::PlayerNameChange {
                new_name: "Arwic".to_owned(),
            },
        )
        .await
    {
        warn!(%error, "name change rejected");
    }
    if let Err(error) = server
        .handle_rpc(
            peer,
            ClientRpc::RankingListRequest {
                subject: RankingSubject::Player,
                page: 0,
            },
        )
        .await
    {
        warn!(%error, "ranking request rejected");
    }
    sleep(Duration::from_millis(100)).await;

    // Log each push in the wire form a real transport would carry.
    let codec = JsonCodec;
    for (dest, rpc) in wire.all_sent() {
        match codec.encode(&rpc) {
            Ok(frame) => {
                info!(peer = %dest, frame = %String::from_utf8_lossy(&frame), "client received");
            }
            Err(error) => warn!(peer = %dest, %error, "frame encode failed"),
        }
    }

    server.on_peer_disconnected(peer).await;
    info!(
        sessions = server.sessions().lock().await.len(),
        "lobby drained, shutting down"
    );
    server.stop_town_servers().await;
}
