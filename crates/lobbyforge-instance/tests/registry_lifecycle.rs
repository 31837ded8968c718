//! Full lifecycle and crash-recovery scenarios for the instance registry.

use lobbyforge_instance::{
    InstanceConfig, InstanceInfo, InstanceRegistry, InstanceState,
};
use lobbyforge_protocol::{
    Account, AccountId, InstanceAddress, InstanceId, PeerId, PlayerLocation, ServerKind,
};
use lobbyforge_session::SessionManager;

fn login(sessions: &mut SessionManager, id: &str, peer: u64) -> AccountId {
    let account = Account {
        id: AccountId::new(id),
        email: format!("{id}@example.net"),
    };
    sessions.create(&account, PeerId(peer), PlayerLocation::town("Oaktown"));
    account.id
}

fn info(id: &str) -> InstanceInfo {
    InstanceInfo {
        instance_id: InstanceId::new(id),
        address: InstanceAddress {
            host: "10.0.0.5".into(),
            port: 7777,
        },
    }
}

#[test]
fn test_lifecycle_identity_and_channel_appear_together() {
    // A record has an instance id, an address, and a chat channel exactly
    // while it is Running — never before, never after.
    let mut reg = InstanceRegistry::new(InstanceConfig::default());
    let mut sessions = SessionManager::new();
    let provision = reg.register("Oaktown", ServerKind::Town);
    let request = provision.request;

    let waiting = reg.get(request).unwrap();
    assert_eq!(waiting.state, InstanceState::Waiting);
    assert!(waiting.instance_id.is_none());
    assert!(waiting.address.is_none());
    assert!(reg.map_channel(request).is_none());

    reg.on_instance_available(request, info("inst-1"), &sessions)
        .unwrap();
    let running = reg.get(request).unwrap();
    assert_eq!(running.state, InstanceState::Running);
    assert!(running.instance_id.is_some());
    assert!(running.address.is_some());
    assert!(reg.map_channel(request).is_some());

    let torn_down = reg.unregister(request, &mut sessions).unwrap();
    assert_eq!(torn_down.instance.state, InstanceState::Terminated);
    assert!(reg.get(request).is_none());
    assert!(reg.map_channel(request).is_none());
}

#[test]
fn test_crash_recovery_redirects_town_members_and_clears_the_rest() {
    let mut reg = InstanceRegistry::new(InstanceConfig::default());
    let mut sessions = SessionManager::new();

    let town_player = login(&mut sessions, "acc-town", 1);
    let world_player = login(&mut sessions, "acc-world", 2);
    // The second player already transitioned out of the hub.
    sessions.get_mut(&world_player).unwrap().location = PlayerLocation {
        map_name: "Highlands".into(),
        kind: ServerKind::World,
    };

    let provision = reg.register("Highlands", ServerKind::World);
    let request = provision.request;
    reg.join(&mut sessions, &town_player, request).unwrap();
    reg.join(&mut sessions, &world_player, request).unwrap();
    reg.on_instance_available(request, info("inst-1"), &sessions)
        .unwrap();

    // Simulated crash.
    let outcome = reg.unregister(request, &mut sessions).unwrap();

    // Town-located member is collected for the recovery flow, the other
    // just loses the reference.
    assert_eq!(outcome.redirect_to_town, vec![town_player.clone()]);
    assert_eq!(sessions.get(&town_player).unwrap().instance, None);
    assert_eq!(sessions.get(&world_player).unwrap().instance, None);

    // All four indexes are purged.
    assert!(reg.get(request).is_none());
    assert!(reg.get_by_instance_id(&InstanceId::new("inst-1")).is_none());
    assert!(reg.on_map("Highlands").is_empty());
    assert!(reg.running().is_empty());
    assert!(reg.is_empty());
}

#[test]
fn test_second_instance_on_same_map_survives_first_teardown() {
    let mut reg = InstanceRegistry::new(InstanceConfig::default());
    let mut sessions = SessionManager::new();

    let first = reg.register("Pits", ServerKind::Arena).request;
    let second = reg.register("Pits", ServerKind::Arena).request;
    reg.on_instance_available(first, info("inst-1"), &sessions)
        .unwrap();
    reg.on_instance_available(
        second,
        InstanceInfo {
            instance_id: InstanceId::new("inst-2"),
            address: InstanceAddress {
                host: "10.0.0.6".into(),
                port: 7778,
            },
        },
        &sessions,
    )
    .unwrap();

    reg.unregister(first, &mut sessions).unwrap();

    assert_eq!(reg.on_map("Pits"), &[second]);
    assert_eq!(reg.running(), &[second]);
    assert!(reg.get_by_instance_id(&InstanceId::new("inst-2")).is_some());
}
