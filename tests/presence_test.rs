mod common;

use serde_json::json;
use uuid::Uuid;

use auth_core::{AuthError, PresenceEvent, PresenceRegistry, Role, SocketGateway};
use common::*;

fn message(from: Uuid) -> PresenceEvent {
    PresenceEvent::NewMessage {
        from,
        payload: json!({"text": "hello"}),
    }
}

#[tokio::test]
async fn targeted_delivery_fans_out_to_every_device() {
    let registry = PresenceRegistry::new();
    let user_id = Uuid::new_v4();
    let peer = Uuid::new_v4();

    let (first, mut rx1) = registry.register(user_id).await;
    let (second, mut rx2) = registry.register(user_id).await;

    assert_eq!(registry.send_to_user(user_id, &message(peer)).await, 2);
    assert!(rx1.recv().await.unwrap().contains("new_message"));
    assert!(rx2.recv().await.unwrap().contains("new_message"));

    // One device disconnects; only the other keeps receiving.
    registry.unregister(user_id, first).await;
    assert_eq!(registry.send_to_user(user_id, &message(peer)).await, 1);
    assert!(rx2.recv().await.is_some());

    // Both gone: delivery is a no-op, not an error.
    registry.unregister(user_id, second).await;
    assert_eq!(registry.send_to_user(user_id, &message(peer)).await, 0);
}

#[tokio::test]
async fn presence_broadcast_reaches_all_peers() {
    let registry = PresenceRegistry::new();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let (_, mut alice_rx) = registry.register(alice).await;
    let (_, mut bob_rx) = registry.register(bob).await;

    registry.broadcast_presence(alice, true).await;

    let expected = format!("\"user_id\":\"{}\"", alice);
    let alice_saw = alice_rx.recv().await.unwrap();
    let bob_saw = bob_rx.recv().await.unwrap();
    assert!(alice_saw.contains("online_user") && alice_saw.contains(&expected));
    assert!(bob_saw.contains("online_user") && bob_saw.contains(&expected));
}

#[tokio::test]
async fn gateway_rejects_bad_handshake_before_registering() {
    let h = harness();
    let registry = PresenceRegistry::new();
    let gateway = SocketGateway::new(h.verifier.clone(), registry);

    let err = gateway.connect("Bearer not-a-token").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));
}

#[tokio::test]
async fn gateway_connect_and_disconnect_announce_presence() {
    let h = harness();
    let account = account(Role::User);
    h.store.insert_account(account.clone()).await;
    let pair = h.issuer.issue(&account).unwrap();

    let gateway = SocketGateway::new(h.verifier.clone(), PresenceRegistry::new());

    // A peer is already online and observes the transitions.
    let peer = common::account(Role::User);
    h.store.insert_account(peer.clone()).await;
    let peer_pair = h.issuer.issue(&peer).unwrap();
    let mut peer_session = gateway
        .connect(&format!("Bearer {}", peer_pair.access_token))
        .await
        .unwrap();

    // The peer's own online announcement reaches it first.
    let own_online = peer_session.receiver.recv().await.unwrap();
    assert!(own_online.contains("online_user"));

    let session = gateway
        .connect(&format!("Bearer {}", pair.access_token))
        .await
        .unwrap();
    assert_eq!(session.claims.sub, account.id);
    assert_eq!(
        gateway.registry().connections_for(account.id).await.len(),
        1
    );

    let online = peer_session.receiver.recv().await.unwrap();
    assert!(online.contains("online_user") && online.contains(&account.id.to_string()));

    gateway.disconnect(account.id, session.connection_id).await;
    assert!(gateway
        .registry()
        .connections_for(account.id)
        .await
        .is_empty());

    let offline = peer_session.receiver.recv().await.unwrap();
    assert!(offline.contains("offline_user") && offline.contains(&account.id.to_string()));
}

#[tokio::test]
async fn offline_broadcast_waits_for_the_last_device() {
    let h = harness();
    let account = account(Role::User);
    h.store.insert_account(account.clone()).await;
    let pair = h.issuer.issue(&account).unwrap();

    let gateway = SocketGateway::new(h.verifier.clone(), PresenceRegistry::new());
    let authorization = format!("Bearer {}", pair.access_token);

    let phone = gateway.connect(&authorization).await.unwrap();
    let mut laptop = gateway.connect(&authorization).await.unwrap();

    gateway.disconnect(account.id, phone.connection_id).await;

    // Still one device online: no offline event was broadcast. Send a probe
    // and check the laptop sees only it.
    gateway
        .registry()
        .send_to_user(account.id, &message(account.id))
        .await;

    // Drain the online event from the laptop's own peers view.
    let mut saw_offline = false;
    while let Ok(msg) = laptop.receiver.try_recv() {
        if msg.contains("offline_user") {
            saw_offline = true;
        }
    }
    assert!(!saw_offline);
}
