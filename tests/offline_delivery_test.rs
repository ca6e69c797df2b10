// ============================================================================
// Best-effort delivery tests
// ============================================================================
//
// Delivery has no queue and no retry: an identity with no live connections
// observes nothing at publish time, and durability comes solely from the
// message store.
//
// ============================================================================

mod test_utils;

use serial_test::serial;
use test_utils::{spawn_app, TestClient};

use parley_server::message::{ClientEvent, ComposedMessage, ServerEvent};

#[tokio::test]
#[serial]
async fn live_send_to_offline_receiver_is_still_durable() {
    let Some(app) = spawn_app().await else { return };

    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;

    // Bob has no live connection.
    let mut alice_client = TestClient::connect(&app, &app.token_for(&alice)).await;
    alice_client.join(alice).await;
    alice_client
        .send_event(&ClientEvent::Send {
            sender: alice.to_string(),
            receiver: bob.to_string(),
            text: "hey".to_string(),
        })
        .await;

    // The sender still gets the echo; nothing errors.
    let echoed = alice_client.recv_event().await;
    assert!(matches!(echoed, ServerEvent::MessageDelivered(_)));

    // Bob sees the message on his next history fetch.
    let client = reqwest::Client::new();
    let history: Vec<ComposedMessage> = client
        .get(format!("{}/api/messages/{}", app.http_base, alice))
        .bearer_auth(app.token_for(&bob))
        .send()
        .await
        .expect("history request")
        .json()
        .await
        .expect("history body");

    assert_eq!(history.len(), 1);
    assert_eq!(history[0].text, "hey");
}

#[tokio::test]
#[serial]
async fn rest_send_is_not_delivered_live() {
    let Some(app) = spawn_app().await else { return };

    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;

    let mut bob_client = TestClient::connect(&app, &app.token_for(&bob)).await;
    bob_client.join(bob).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/api/messages", app.http_base))
        .bearer_auth(app.token_for(&alice))
        .json(&serde_json::json!({
            "receiver": bob.to_string(),
            "text": "sent over REST",
        }))
        .send()
        .await
        .expect("send request");

    assert_eq!(response.status().as_u16(), 201);
    let composed: ComposedMessage = response.json().await.expect("composed body");
    assert_eq!(composed.text, "sent over REST");

    // No messageDelivered event ever reaches Bob's live connection.
    bob_client.expect_silence().await;

    // But the message is durably fetchable.
    let history: Vec<ComposedMessage> = client
        .get(format!("{}/api/messages/{}", app.http_base, alice))
        .bearer_auth(app.token_for(&bob))
        .send()
        .await
        .expect("history request")
        .json()
        .await
        .expect("history body");

    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, composed.id);
}
