//! Command line configuration of the lobby server.

use clap::Parser;
use shared::DEFAULT_TICK_RATE;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about = "Arena Pong lobby server")]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    pub port: u16,
    /// Simulation ticks per second for every running game
    #[clap(short, long, default_value_t = DEFAULT_TICK_RATE,
           value_parser = clap::value_parser!(u32).range(1..))]
    pub tick_rate: u32,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Nominal time between two ticks of a game.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            tick_rate: DEFAULT_TICK_RATE,
        }
    }
}
