use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::network::serve;
use tokio::net::TcpListener;

/// Main-method of the lobby server.
/// Parses command-line arguments, binds the listener and serves until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();
    let listener = TcpListener::bind(config.address()).await?;

    tokio::select! {
        result = serve(listener, config) => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
