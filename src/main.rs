//! Thin CLI entry point over the `chessmate` library. All the actual
//! wiring (collaborators, actors, routes) lives in `lib.rs` so it can
//! be driven from integration tests as well as from this binary.

use clap::{Parser, Subcommand};

/// chessmate — a real-time, authenticated, multiplayer chess server.
#[derive(Parser, Debug)]
#[command(name = "chessmate")]
#[command(about = "Real-time multiplayer chess: rule engine, sessions, matchmaking")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the WebSocket server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value_t = 8080)]
        port: u16,

        /// Host address to bind to.
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { port, host } => chessmate::run_server(&host, port).await,
    }
}
