//! Hiroba CLI chat client.
//!
//! Connects to a chat room and sends each entered line as a message.
//! Automatically reconnects on disconnection (max 5 attempts with 5 second interval).
//! Rejected connections (unknown user, not assigned to the room, missing room,
//! already connected) exit immediately.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-client -- --room-id 7 --user-id 1
//! cargo run --bin hiroba-client -- -r 7 -i 2 -u ws://127.0.0.1:3000/ws/chat
//! ```

use clap::Parser;

use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba-client")]
#[command(about = "CLI chat client for Hiroba rooms", long_about = None)]
struct Args {
    /// Room to join
    #[arg(short = 'r', long)]
    room_id: i64,

    /// Signed-in user id
    #[arg(short = 'i', long)]
    user_id: i64,

    /// Base URL of the chat endpoint
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws/chat")]
    url: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &["hiroba_shared"], "info");

    let args = Args::parse();

    if let Err(e) = hiroba_client::run_client(args.url, args.room_id, args.user_id).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
