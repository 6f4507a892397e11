use flappy_server::client::{BotConfig, run_bot};
use flappy_server::frameworks::server::init_runtime;

#[tokio::main]
async fn main() {
    init_runtime();

    let config = BotConfig::from_env();
    if let Err(e) = run_bot(config).await {
        tracing::error!(error = ?e, "bot exited");
        std::process::exit(1);
    }
}
