//! Live-channel tests: handshake auth, room isolation, send fan-out with
//! sender echo, typing indicators.

mod test_utils;

use serial_test::serial;
use test_utils::{spawn_app, TestClient};
use tokio_tungstenite::tungstenite::Error as WsError;

use parley_server::message::{ClientEvent, ServerEvent};

#[tokio::test]
#[serial]
async fn handshake_without_credential_is_refused() {
    let Some(app) = spawn_app().await else { return };

    let result = TestClient::try_connect(&app, None).await;

    match result {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 401),
        other => panic!("expected 401 refusal, got: {:?}", other.map(|_| "connected")),
    }
}

#[tokio::test]
#[serial]
async fn handshake_with_garbage_credential_is_refused() {
    let Some(app) = spawn_app().await else { return };

    let result = TestClient::try_connect(&app, Some("not-a-token")).await;

    match result {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 401),
        other => panic!("expected 401 refusal, got: {:?}", other.map(|_| "connected")),
    }
}

#[tokio::test]
#[serial]
async fn live_send_reaches_receiver_and_echoes_to_sender() {
    let Some(app) = spawn_app().await else { return };

    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;

    let mut alice_client = TestClient::connect(&app, &app.token_for(&alice)).await;
    let mut bob_client = TestClient::connect(&app, &app.token_for(&bob)).await;
    alice_client.join(alice).await;
    bob_client.join(bob).await;

    alice_client
        .send_event(&ClientEvent::Send {
            sender: alice.to_string(),
            receiver: bob.to_string(),
            text: "hi".to_string(),
        })
        .await;

    let received = bob_client.recv_event().await;
    let ServerEvent::MessageDelivered(message) = received else {
        panic!("expected messageDelivered, got: {:?}", received);
    };
    assert_eq!(message.text, "hi");
    assert_eq!(message.sender.id, alice);
    assert_eq!(message.sender.name.as_deref(), Some("Alice"));
    assert_eq!(message.receiver.id, bob);
    assert_eq!(message.receiver.name.as_deref(), Some("Bob"));

    // The sender's own room gets the identical event for multi-device sync.
    let echoed = alice_client.recv_event().await;
    let ServerEvent::MessageDelivered(echo) = echoed else {
        panic!("expected echoed messageDelivered, got: {:?}", echoed);
    };
    assert_eq!(echo.id, message.id);
}

#[tokio::test]
#[serial]
async fn sender_echo_reaches_other_devices_of_the_sender() {
    let Some(app) = spawn_app().await else { return };

    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;

    let token = app.token_for(&alice);
    let mut phone = TestClient::connect(&app, &token).await;
    let mut laptop = TestClient::connect(&app, &token).await;
    phone.join(alice).await;
    laptop.join(alice).await;

    phone
        .send_event(&ClientEvent::Send {
            sender: alice.to_string(),
            receiver: bob.to_string(),
            text: "from the phone".to_string(),
        })
        .await;

    let on_laptop = laptop.recv_event().await;
    let ServerEvent::MessageDelivered(message) = on_laptop else {
        panic!("expected messageDelivered on the second device");
    };
    assert_eq!(message.text, "from the phone");
}

#[tokio::test]
#[serial]
async fn joining_a_foreign_room_is_a_no_op() {
    let Some(app) = spawn_app().await else { return };

    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;
    let mallory = app.seed_user("Mallory").await;

    // Mallory authenticates as herself but claims Bob's room.
    let mut mallory_client = TestClient::connect(&app, &app.token_for(&mallory)).await;
    mallory_client.join(bob).await;

    let mut alice_client = TestClient::connect(&app, &app.token_for(&alice)).await;
    alice_client.join(alice).await;
    alice_client
        .send_event(&ClientEvent::Send {
            sender: alice.to_string(),
            receiver: bob.to_string(),
            text: "for bob only".to_string(),
        })
        .await;

    // Alice still gets her echo; Mallory observes nothing at all.
    let echoed = alice_client.recv_event().await;
    assert!(matches!(echoed, ServerEvent::MessageDelivered(_)));
    mallory_client.expect_silence().await;
}

#[tokio::test]
#[serial]
async fn spoofed_sender_is_dropped_without_a_reply() {
    let Some(app) = spawn_app().await else { return };

    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;
    let mallory = app.seed_user("Mallory").await;

    let mut bob_client = TestClient::connect(&app, &app.token_for(&bob)).await;
    bob_client.join(bob).await;

    let mut mallory_client = TestClient::connect(&app, &app.token_for(&mallory)).await;
    mallory_client.join(mallory).await;
    mallory_client
        .send_event(&ClientEvent::Send {
            sender: alice.to_string(),
            receiver: bob.to_string(),
            text: "pretending to be alice".to_string(),
        })
        .await;

    // No delivery, no error payload back to the impersonator.
    bob_client.expect_silence().await;
    mallory_client.expect_silence().await;
}

#[tokio::test]
#[serial]
async fn empty_text_is_rejected_with_an_error_event() {
    let Some(app) = spawn_app().await else { return };

    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;

    let mut alice_client = TestClient::connect(&app, &app.token_for(&alice)).await;
    alice_client.join(alice).await;
    alice_client
        .send_event(&ClientEvent::Send {
            sender: alice.to_string(),
            receiver: bob.to_string(),
            text: String::new(),
        })
        .await;

    let reply = alice_client.recv_event().await;
    let ServerEvent::Error { code, .. } = reply else {
        panic!("expected a validation error event, got: {:?}", reply);
    };
    assert_eq!(code, "VALIDATION_ERROR");

    // The connection survives the rejection.
    alice_client
        .send_event(&ClientEvent::Send {
            sender: alice.to_string(),
            receiver: bob.to_string(),
            text: "still here".to_string(),
        })
        .await;
    assert!(matches!(
        alice_client.recv_event().await,
        ServerEvent::MessageDelivered(_)
    ));
}

#[tokio::test]
#[serial]
async fn typing_events_reach_the_receiver_only() {
    let Some(app) = spawn_app().await else { return };

    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;

    let mut alice_client = TestClient::connect(&app, &app.token_for(&alice)).await;
    let mut bob_client = TestClient::connect(&app, &app.token_for(&bob)).await;
    alice_client.join(alice).await;
    bob_client.join(bob).await;

    alice_client
        .send_event(&ClientEvent::TypingStarted {
            sender: alice.to_string(),
            receiver: bob.to_string(),
        })
        .await;

    let event = bob_client.recv_event().await;
    assert!(matches!(event, ServerEvent::TypingStarted { sender } if sender == alice));

    alice_client
        .send_event(&ClientEvent::TypingStopped {
            sender: alice.to_string(),
            receiver: bob.to_string(),
        })
        .await;

    let event = bob_client.recv_event().await;
    assert!(matches!(event, ServerEvent::TypingStopped { sender } if sender == alice));

    // No typing echo to the sender's own room.
    alice_client.expect_silence().await;
}
