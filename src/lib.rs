//! # chessmate — Real-Time Multiplayer Chess Server
//!
//! A WebSocket-first chess server: a FIDE-rule bitboard engine, a
//! per-game session actor that serializes every mutation through its
//! mailbox, and a singleton matchmaking coordinator that pairs queued
//! players and hands them off to a fresh session.
//!
//! ## Architecture
//!
//! - **`rules` / `position` / `bitboard`** — the chess engine: legal
//!   move generation, check/checkmate/stalemate/draw detection, FEN
//!   import/export.
//! - **`game`** — the `Game` aggregate: one game's authoritative state
//!   plus move history and draw-offer negotiation.
//! - **`session`** — `GameSessionActor`, one per live game, the sole
//!   mutator of its `Game`.
//! - **`matchmaker`** — `MatchmakerActor`, the singleton FIFO queue that
//!   pairs waiting users and starts their session.
//! - **`ws`** — the three WebSocket routes (`/ws/matchmaking`,
//!   `/ws/game/{id}`, `/ws/game/{id}/spectate`) that connect clients to
//!   the actors above.
//! - **`collaborators` / `repository`** — the external-dependency ports
//!   (auth, persistence, bot play, clock, RNG) and their in-memory
//!   default implementations.
//!
//! This crate is split into a library (this file) and a thin `serve`
//! binary (`main.rs`) so integration tests under `tests/` can exercise
//! the actor graph directly instead of only through a spawned process.

pub mod bitboard;
pub mod collaborators;
pub mod error;
pub mod game;
pub mod ids;
pub mod matchmaker;
pub mod player;
pub mod position;
pub mod protocol;
pub mod repository;
pub mod rules;
pub mod session;
pub mod session_directory;
pub mod types;
pub mod ws;

use std::sync::Arc;

use actix::{Actor, Addr};
use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};

use crate::collaborators::{
    Authenticator, BotEngine, BotPredicate, Clock, FirstLegalMoveBot, InMemoryUserExistenceChecker,
    NeverBot, RandomSource, StaticTokenAuthenticator, SystemClock, ThreadRngSource,
    UserExistenceChecker,
};
use crate::matchmaker::MatchmakerActor;
use crate::repository::{GameFactory, GameRepository, InMemoryGameRepository, StandardGameFactory};
use crate::session_directory::SessionDirectory;

/// Builds the collaborator graph and starts the HTTP + WebSocket server.
///
/// Every collaborator is wired here as an `Arc<dyn Trait>` so a
/// production deployment can swap in a real auth/persistence/engine
/// backend without touching `session.rs` or `matchmaker.rs`.
pub async fn run_server(host: &str, port: u16) -> std::io::Result<()> {
    let user_existence: Arc<dyn UserExistenceChecker> =
        Arc::new(InMemoryUserExistenceChecker::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let random: Arc<dyn RandomSource> = Arc::new(ThreadRngSource);
    let authenticator: Arc<dyn Authenticator> = Arc::new(StaticTokenAuthenticator);
    let bot_predicate: Arc<dyn BotPredicate> = Arc::new(NeverBot);
    let bot_engine: Arc<dyn BotEngine> = Arc::new(FirstLegalMoveBot);
    let repository: Arc<dyn GameRepository> = Arc::new(InMemoryGameRepository::new());
    let game_factory: Arc<dyn GameFactory> = Arc::new(StandardGameFactory);
    let directory = Arc::new(SessionDirectory::new());

    let matchmaker = MatchmakerActor::new(
        user_existence.clone(),
        random,
        clock,
        game_factory,
        repository,
        bot_predicate,
        bot_engine,
        directory.clone(),
    )
    .start();

    serve(host, port, authenticator, user_existence, matchmaker, directory).await
}

/// The HTTP/WebSocket server loop, split out from [`run_server`] so
/// integration tests can supply their own pre-wired collaborators
/// (e.g. a `UserExistenceChecker` pre-seeded with test accounts)
/// without duplicating the route/CORS/logging setup.
#[allow(clippy::too_many_arguments)]
pub async fn serve(
    host: &str,
    port: u16,
    authenticator: Arc<dyn Authenticator>,
    user_existence: Arc<dyn UserExistenceChecker>,
    matchmaker: Addr<MatchmakerActor>,
    directory: Arc<SessionDirectory>,
) -> std::io::Result<()> {
    let authenticator_data = web::Data::new(authenticator);
    let user_existence_data = web::Data::new(user_existence);
    let matchmaker_data = web::Data::new(matchmaker);
    let directory_data = web::Data::new(directory);

    log::info!("starting chessmate server on {host}:{port}");
    log::info!("matchmaking endpoint: ws://{host}:{port}/ws/matchmaking");
    log::info!("game endpoint: ws://{host}:{port}/ws/game/{{game_id}}");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(authenticator_data.clone())
            .app_data(user_existence_data.clone())
            .app_data(matchmaker_data.clone())
            .app_data(directory_data.clone())
            .route("/ws/matchmaking", web::get().to(ws::ws_matchmaking_connect))
            .route(
                "/ws/game/{game_id}/spectate",
                web::get().to(ws::ws_spectate_connect),
            )
            .route("/ws/game/{game_id}", web::get().to(ws::ws_game_connect))
    })
    .bind((host, port))?
    .run()
    .await
}
