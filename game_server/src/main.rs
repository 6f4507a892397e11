#[tokio::main]
async fn main() {
    if let Err(e) = flappy_server::run_with_config().await {
        tracing::error!(error = %e, "game server exited");
        std::process::exit(1);
    }
}
