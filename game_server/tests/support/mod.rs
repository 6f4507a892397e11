// Shared primitives for one-time server bootstrapping across integration tests.
#![allow(dead_code)]

use flappy_server::domain::RoundTimings;
use flappy_server::use_cases::GameSettings;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::{
    // `Arc` shares data between threads; `OnceLock` writes a value only once.
    sync::{Arc, OnceLock},
    // Sleep durations are used in readiness polling loops.
    time::Duration,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

pub type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Round and leaderboard phases are shortened so a full cycle fits in a test.
pub const ROUND_SECONDS: u32 = 2;
pub const LEADERBOARD_SECONDS: u32 = 1;

// Global base URL used by all tests after the server publishes its bound address.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Ensure the test server is running and return the shared base URL.
pub fn ensure_server() -> &'static str {
    // Run initialization exactly once even if multiple tests call this function.
    SERVER_READY.get_or_init(|| {
        // Local one-time slot where the server thread publishes its selected URL.
        let published_url = Arc::new(OnceLock::<String>::new());
        // Clone so the spawned thread can write into the same shared slot.
        let published_url_thread = Arc::clone(&published_url);
        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            // Each server thread owns its own Tokio runtime.
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            // Run async server startup and serving on this dedicated runtime.
            runtime.block_on(async move {
                // Bind to an ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                // Capture the exact address that was assigned by the OS.
                let addr = listener.local_addr().expect("get local addr");
                // Publish the final base URL so test code can target the right server.
                let _ = published_url_thread.set(format!("http://{}", addr));
                // Start serving requests until the test process exits.
                let settings = GameSettings {
                    timings: RoundTimings {
                        round_seconds: ROUND_SECONDS,
                        leaderboard_seconds: LEADERBOARD_SECONDS,
                    },
                    ..GameSettings::default()
                };
                flappy_server::serve(listener, settings)
                    .await
                    .expect("server failed");
            });
        });
        // Block until URL is published and the bound port starts accepting connections.
        wait_for_server_url_and_readiness(published_url);
    });

    // Return the stable shared URL used by all tests in this binary.
    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

// Wait for URL publication and then wait for the server socket to accept TCP connections.
fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    // Poll until the server thread publishes the base URL.
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    // Persist the URL globally so every test gets the same endpoint.
    let _ = SERVER_URL.set(base_url.clone());

    // Strip the scheme so we can use host:port for raw TCP readiness checks.
    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    // Retry for a short period to avoid racing server bind/accept.
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    // Fail fast if startup never reached an accepting state.
    panic!("server did not become ready in time");
}

// Open a WebSocket to the shared server.
pub async fn connect() -> Ws {
    let base_url = ensure_server();
    let ws_url = format!("{}/ws", base_url.replacen("http://", "ws://", 1));
    let (ws, _response) = tokio_tungstenite::connect_async(ws_url.as_str())
        .await
        .expect("websocket connect");
    ws
}

// Unique display name so parallel tests can tell their players apart.
pub fn unique_username() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("p-{}", &id[..12])
}

pub async fn send_json(ws: &mut Ws, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("websocket send");
}

// Read text frames until one matches, failing the test after `within`.
pub async fn recv_until<F>(ws: &mut Ws, within: Duration, mut matches: F) -> Value
where
    F: FnMut(&Value) -> bool,
{
    tokio::time::timeout(within, async {
        loop {
            let frame = ws
                .next()
                .await
                .expect("websocket closed early")
                .expect("websocket recv");
            if let Message::Text(text) = frame {
                let value: Value = serde_json::from_str(&text).expect("server sent valid json");
                if matches(&value) {
                    return value;
                }
            }
        }
    })
    .await
    .expect("expected message did not arrive in time")
}

pub async fn recv_type(ws: &mut Ws, kind: &str, within: Duration) -> Value {
    recv_until(ws, within, |value| value["type"] == kind).await
}

// Join and return the assigned player id.
pub async fn join(ws: &mut Ws, username: &str) -> String {
    send_json(ws, serde_json::json!({ "type": "join", "data": username })).await;
    let identity = recv_type(ws, "identity", Duration::from_secs(2)).await;
    identity["data"]["playerId"]
        .as_str()
        .expect("identity carries playerId")
        .to_string()
}
