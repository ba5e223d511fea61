use clap::Parser;
use client::game::LocalView;
use client::network::LobbyClient;
use log::{info, warn};
use shared::{ClientMessage, GameStatus, ServerMessage};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless arena Pong player", long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Display name of this player
    #[arg(short = 'n', long, default_value = "Bot")]
    name: String,

    /// Join this lobby instead of creating a new one
    #[arg(short = 'l', long)]
    lobby: Option<String>,

    /// Mark ready as soon as the channel is open
    #[arg(short = 'r', long)]
    auto_ready: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);

    let lobby = LobbyClient::new(&args.server)?;
    let credentials = match &args.lobby {
        Some(code) => lobby.join(code, &args.name).await?,
        None => lobby.create(&args.name).await?,
    };
    info!(
        "Playing as {} in lobby {}",
        credentials.player_id, credentials.lobby_code
    );

    let mut session = lobby.connect(&credentials).await?;
    let mut view = LocalView::new(credentials.player_id.clone());

    if args.auto_ready {
        session.send(&ClientMessage::PlayerReady).await?;
    }

    while let Some(message) = session.next_message().await? {
        view.apply(&message);

        match &message {
            ServerMessage::PlayerJoined { player_name } => info!("{} joined", player_name),
            ServerMessage::PlayerLeft { player_name } => info!("{} left", player_name),
            ServerMessage::GameStart { start_time } => info!("Game started at {}", start_time),
            ServerMessage::GameOver { winner } => info!("Game over, winner: {}", winner),
            ServerMessage::GameStateUpdate(_) => {}
        }

        if view.status() == Some(GameStatus::GameOver) {
            info!("Final score: {}", view.my_score());
            session.send(&ClientMessage::LeaveLobby).await?;
            break;
        }

        if let Some(direction) = view.next_move() {
            session.send(&ClientMessage::MovePaddle { direction }).await?;
        }
    }

    if let Some(reason) = session.close_reason() {
        warn!("Channel closed by server: {}", reason);
    }

    Ok(())
}
