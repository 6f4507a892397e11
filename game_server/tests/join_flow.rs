mod support;

use serde_json::json;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(3);

#[tokio::test]
async fn join_is_acked_with_identity_then_game_state() {
    let mut ws = support::connect().await;
    let username = support::unique_username();
    support::send_json(&mut ws, json!({ "type": "join", "data": username })).await;

    let identity = support::recv_until(&mut ws, WAIT, |_| true).await;
    assert_eq!(identity["type"], "identity");
    assert!(identity["data"]["playerId"].is_string());

    let state = support::recv_until(&mut ws, WAIT, |_| true).await;
    assert_eq!(state["type"], "game_state");
    assert_eq!(state["data"]["leaderboardTime"], support::LEADERBOARD_SECONDS);
    assert!(state["data"]["seed"].is_u64());
    let status = state["data"]["status"].as_str().expect("status string");
    assert!(["waiting", "playing", "leaderboard"].contains(&status));
}

#[tokio::test]
async fn legacy_join_game_event_is_accepted() {
    let mut ws = support::connect().await;
    let username = support::unique_username();
    support::send_json(&mut ws, json!({ "type": "join_game", "data": username })).await;
    support::recv_type(&mut ws, "identity", WAIT).await;
}

#[tokio::test]
async fn short_username_is_rejected_and_can_retry() {
    let mut ws = support::connect().await;
    support::send_json(&mut ws, json!({ "type": "join", "data": "a" })).await;

    let rejected = support::recv_until(&mut ws, WAIT, |_| true).await;
    assert_eq!(rejected["type"], "join_rejected");
    assert!(rejected["data"]["reason"].is_string());

    // Same socket, valid name this time.
    let username = support::unique_username();
    support::join(&mut ws, &username).await;
}

#[tokio::test]
async fn gameplay_before_join_is_ignored() {
    let mut ws = support::connect().await;
    support::send_json(&mut ws, json!({ "type": "jump" })).await;
    support::send_json(&mut ws, json!({ "type": "dead" })).await;

    let username = support::unique_username();
    support::send_json(&mut ws, json!({ "type": "join", "data": username })).await;
    let first = support::recv_until(&mut ws, WAIT, |_| true).await;
    assert_eq!(first["type"], "identity");
}

#[tokio::test]
async fn other_clients_are_told_about_a_new_player() {
    let mut first = support::connect().await;
    let first_name = support::unique_username();
    support::join(&mut first, &first_name).await;

    let mut second = support::connect().await;
    let second_name = support::unique_username();
    let second_id = support::join(&mut second, &second_name).await;

    let joined = support::recv_until(&mut first, WAIT, |value| {
        value["type"] == "player_joined" && value["data"]["username"] == second_name.as_str()
    })
    .await;
    assert_eq!(joined["data"]["id"], second_id.as_str());

    // The joiner itself never gets its own player_joined.
    let own = tokio::time::timeout(
        Duration::from_millis(500),
        support::recv_until(&mut second, WAIT, |value| {
            value["type"] == "player_joined" && value["data"]["username"] == second_name.as_str()
        }),
    )
    .await;
    assert!(own.is_err());
}

#[tokio::test]
async fn snapshots_include_the_joined_player() {
    let mut ws = support::connect().await;
    let username = support::unique_username();
    let player_id = support::join(&mut ws, &username).await;

    let update = support::recv_until(&mut ws, WAIT, |value| {
        value["type"] == "update" && !value["data"]["players"][player_id.as_str()].is_null()
    })
    .await;
    let me = &update["data"]["players"][player_id.as_str()];
    assert_eq!(me["username"], username.as_str());
    assert_eq!(me["x"], 50);
    assert!(update["data"]["gameState"]["worldOffset"].is_u64());
}

#[tokio::test]
async fn disconnect_removes_player_from_snapshots() {
    let mut watcher = support::connect().await;
    let watcher_name = support::unique_username();
    support::join(&mut watcher, &watcher_name).await;

    let mut leaver = support::connect().await;
    let leaver_name = support::unique_username();
    let leaver_id = support::join(&mut leaver, &leaver_name).await;

    support::recv_until(&mut watcher, WAIT, |value| {
        value["type"] == "update" && !value["data"]["players"][leaver_id.as_str()].is_null()
    })
    .await;

    leaver.close(None).await.expect("close handshake");
    drop(leaver);

    support::recv_until(&mut watcher, WAIT, |value| {
        value["type"] == "update" && value["data"]["players"][leaver_id.as_str()].is_null()
    })
    .await;
}
