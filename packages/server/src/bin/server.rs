//! Hiroba chat room server.
//!
//! Serves `GET /ws/chat/{room_id}?user_id={user_id}` and `GET /api/health`.
//! Users and rooms come from a JSON seed file, or built-in demo data.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server
//! cargo run --bin hiroba-server -- --host 0.0.0.0 --port 3000 --seed seed.json
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use hiroba_server::{
    infrastructure::{
        broadcast::InMemoryGroupBroadcaster, repository::InMemoryChatRepository, seed::SeedData,
    },
    ui::{AppState, Server},
    usecase::{ChatHooks, LifecycleController, PresenceNotifier, SendMessageUseCase},
};
use hiroba_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

#[derive(Parser, Debug)]
#[command(name = "hiroba-server")]
#[command(about = "Chat room server with presence announcements", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// JSON file with users and rooms (built-in demo data if omitted)
    #[arg(short = 's', long)]
    seed: Option<PathBuf>,

    /// Default log level when RUST_LOG is not set
    #[arg(short = 'l', long, default_value = "debug")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &["hiroba_shared"], &args.log_level);

    // Initialize dependencies in order:
    // 1. Repository
    // 2. Broadcaster and presence registry
    // 3. UseCases
    // 4. Server

    // 1. Create Repository (in-memory database)
    let seed = match &args.seed {
        Some(path) => SeedData::from_path(path),
        None => Ok(SeedData::demo()),
    };
    let (users, rooms) = match seed.and_then(SeedData::into_entities) {
        Ok(entities) => entities,
        Err(e) => {
            tracing::error!("Invalid seed data: {}", e);
            std::process::exit(1);
        }
    };
    for room in &rooms {
        tracing::info!("Room {} '{}' loaded", room.id, room.name);
    }
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let repository = Arc::new(InMemoryChatRepository::new(users, rooms, clock.clone()));

    // 2. Create Broadcaster and PresenceNotifier
    let broadcaster = Arc::new(InMemoryGroupBroadcaster::new());
    let presence = Arc::new(PresenceNotifier::new(broadcaster.clone()));

    // 3. Create UseCases
    let lifecycle = Arc::new(LifecycleController::new(
        repository.clone(),
        repository.clone(),
        broadcaster.clone(),
        presence.clone(),
        Arc::new(ChatHooks::new(presence)),
    ));
    let send_message = Arc::new(SendMessageUseCase::new(repository, broadcaster));

    // 4. Create and run the server
    let server = Server::new(AppState::new(lifecycle, send_message, clock));
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
