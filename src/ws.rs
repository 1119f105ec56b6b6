//! WebSocket transport: three thin per-connection actors bound to the
//! matchmaking, per-game, and spectator routes. Each forwards parsed
//! client messages to the actor that owns the authoritative state
//! (`MatchmakerActor` or a game's `GameSessionActor`) and relays that
//! actor's pushes back out over the socket — the same
//! connection-actor-plus-heartbeat shape as the teacher's `WsSession`,
//! split three ways because each route talks to a different owner.
//!
//! ## Routes
//!
//! | Route                                  | Connects as                       |
//! |-----------------------------------------|------------------------------------|
//! | `GET /ws/matchmaking?token=`             | an authenticated user joining the queue |
//! | `GET /ws/game/{game_id}?player_id=&token=` | a participant of that game      |
//! | `GET /ws/game/{game_id}/spectate`        | an anonymous read-only observer   |
//!
//! Both the matchmaking and per-game channels require a bearer token;
//! on the per-game channel it is resolved to a `UserId` and checked
//! against the `player_id`'s actual owner by `GameSessionActor` itself
//! (`AttachPlayer`), so a guessed or stolen `player_id` alone is never
//! sufficient. Each channel sends `AuthSuccess` before any other
//! message once the token checks out.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use uuid::Uuid;

use crate::collaborators::{Authenticator, UserExistenceChecker};
use crate::error::CoreError;
use crate::ids::{GameId, PlayerId, UserId};
use crate::matchmaker::{Join, Leave, MatchmakerActor, MatchmakingPush};
use crate::protocol::{
    ClientGameMessage, ClientMatchmakingMessage, ClientSpectatorMessage, ServerGameMessage,
    ServerMatchmakingMessage, WireError,
};
use crate::session::{
    AcceptDraw, AttachPlayer, AttachSpectator, AttemptMove, DetachPlayer, DetachSpectator,
    GameSessionActor, OfferDraw, RejectDraw, Resign, Push,
};
use crate::session_directory::SessionDirectory;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// /ws/matchmaking
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct MatchmakingQuery {
    token: String,
}

pub struct MatchmakingConn {
    last_heartbeat: Instant,
    user_id: crate::ids::UserId,
    matchmaker: Addr<MatchmakerActor>,
}

impl MatchmakingConn {
    fn new(user_id: crate::ids::UserId, matchmaker: Addr<MatchmakerActor>) -> Self {
        Self {
            last_heartbeat: Instant::now(),
            user_id,
            matchmaker,
        }
    }
}

impl Actor for MatchmakingConn {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        send_json(ctx, &ServerMatchmakingMessage::AuthSuccess {
            user_id: self.user_id,
        });

        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });

        let conn = ctx.address().recipient();
        let user_id = self.user_id;
        let matchmaker = self.matchmaker.clone();
        ctx.spawn(
            actix::fut::wrap_future(async move { matchmaker.send(Join { user_id, conn }).await })
                .map(|result, _act: &mut Self, ctx| match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        send_json(ctx, &ServerMatchmakingMessage::Error {
                            error: WireError::from(&e),
                        });
                        ctx.stop();
                    }
                    Err(_) => ctx.stop(),
                }),
        );
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.matchmaker.do_send(Leave {
            user_id: self.user_id,
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for MatchmakingConn {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => match serde_json::from_str(&text) {
                Ok(ClientMatchmakingMessage::JoinQueue) => {
                    // Already enqueued on connect; a repeat request is a
                    // harmless no-op from the client's perspective.
                }
                Ok(ClientMatchmakingMessage::LeaveQueue) => {
                    self.matchmaker.do_send(Leave {
                        user_id: self.user_id,
                    });
                }
                Ok(ClientMatchmakingMessage::Unknown) => {
                    log::debug!("matchmaking conn {}: unrecognized message", self.user_id);
                }
                Err(e) => log::debug!("matchmaking conn {}: bad message: {e}", self.user_id),
            },
            Ok(ws::Message::Ping(data)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&data);
            }
            Ok(ws::Message::Pong(_)) => self.last_heartbeat = Instant::now(),
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => {}
            Err(_) => ctx.stop(),
        }
    }
}

impl Handler<MatchmakingPush> for MatchmakingConn {
    type Result = ();

    fn handle(&mut self, msg: MatchmakingPush, ctx: &mut Self::Context) {
        send_json(ctx, &msg.0);
    }
}

pub async fn ws_matchmaking_connect(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<MatchmakingQuery>,
    authenticator: web::Data<Arc<dyn Authenticator>>,
    user_existence: web::Data<Arc<dyn UserExistenceChecker>>,
    matchmaker: web::Data<Addr<MatchmakerActor>>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = authenticator
        .authenticate(&query.token)
        .await
        .map_err(|e| actix_web::error::ErrorUnauthorized(e.to_string()))?;
    user_existence
        .register(user_id)
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?;
    let conn = MatchmakingConn::new(user_id, matchmaker.get_ref().clone());
    ws::start(conn, &req, stream)
}

// ---------------------------------------------------------------------------
// /ws/game/{game_id}
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct PlayerQuery {
    player_id: String,
    token: String,
}

pub struct PlayerConn {
    last_heartbeat: Instant,
    player_id: PlayerId,
    user_id: UserId,
    session: Addr<GameSessionActor>,
}

impl PlayerConn {
    fn new(player_id: PlayerId, user_id: UserId, session: Addr<GameSessionActor>) -> Self {
        Self {
            last_heartbeat: Instant::now(),
            player_id,
            user_id,
            session,
        }
    }

    fn forward<M>(&self, ctx: &mut ws::WebsocketContext<Self>, msg: M)
    where
        M: Message<Result = Result<(), CoreError>> + Send + 'static,
        GameSessionActor: Handler<M>,
    {
        let player_id = self.player_id;
        ctx.spawn(
            actix::fut::wrap_future(self.session.send(msg)).map(move |result, _act, ctx| {
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        log::debug!("player {player_id}: rejected: {e}");
                        send_json(ctx, &ServerGameMessage::MoveRejected {
                            error: WireError::from(&e),
                        });
                    }
                    Err(_) => log::warn!("player {player_id}: session actor unreachable"),
                }
            }),
        );
    }
}

impl Actor for PlayerConn {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        send_json(ctx, &ServerGameMessage::AuthSuccess {
            user_id: self.user_id,
        });

        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });

        let player_id = self.player_id;
        let user_id = self.user_id;
        let addr = ctx.address().recipient();
        let session = self.session.clone();
        ctx.spawn(
            actix::fut::wrap_future(async move {
                session
                    .send(AttachPlayer {
                        player_id,
                        user_id,
                        addr,
                    })
                    .await
            })
            .map(move |result, _act: &mut Self, ctx| match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    log::debug!("player {player_id}: attach rejected: {e}");
                    send_json(ctx, &ServerGameMessage::Error {
                        error: WireError::from(&e),
                    });
                    ctx.stop();
                }
                Err(_) => ctx.stop(),
            }),
        );
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.session.do_send(DetachPlayer {
            player_id: self.player_id,
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for PlayerConn {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                let parsed: Result<ClientGameMessage, _> = serde_json::from_str(&text);
                let player_id = self.player_id;
                match parsed {
                    Ok(ClientGameMessage::MoveAttempt { mv }) => {
                        self.forward(ctx, AttemptMove { player_id, mv });
                    }
                    Ok(ClientGameMessage::Resign) => self.forward(ctx, Resign { player_id }),
                    Ok(ClientGameMessage::OfferDraw) => self.forward(ctx, OfferDraw { player_id }),
                    Ok(ClientGameMessage::AcceptDraw) => {
                        self.forward(ctx, AcceptDraw { player_id });
                    }
                    Ok(ClientGameMessage::RejectDraw) => {
                        self.forward(ctx, RejectDraw { player_id });
                    }
                    Ok(ClientGameMessage::Unknown) => {
                        log::debug!("player {player_id}: unrecognized message");
                    }
                    Err(e) => log::debug!("player {player_id}: bad message: {e}"),
                }
            }
            Ok(ws::Message::Ping(data)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&data);
            }
            Ok(ws::Message::Pong(_)) => self.last_heartbeat = Instant::now(),
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => {}
            Err(_) => ctx.stop(),
        }
    }
}

impl Handler<Push> for PlayerConn {
    type Result = ();

    fn handle(&mut self, msg: Push, ctx: &mut Self::Context) {
        send_json(ctx, &msg.0);
    }
}

pub async fn ws_game_connect(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<String>,
    query: web::Query<PlayerQuery>,
    authenticator: web::Data<Arc<dyn Authenticator>>,
    directory: web::Data<Arc<SessionDirectory>>,
) -> Result<HttpResponse, actix_web::Error> {
    let game_id = GameId::from_str(&path)
        .map_err(|_| actix_web::error::ErrorBadRequest("invalid game id"))?;
    let player_id = PlayerId::from_str(&query.player_id)
        .map_err(|_| actix_web::error::ErrorBadRequest("invalid player id"))?;
    let user_id = authenticator
        .authenticate(&query.token)
        .await
        .map_err(|e| actix_web::error::ErrorUnauthorized(e.to_string()))?;
    let session = directory
        .get(game_id)
        .ok_or_else(|| actix_web::error::ErrorNotFound("game not found"))?;

    // `GameSessionActor::AttachPlayer` rejects the connection (and the
    // ws upgrade is torn down) if `user_id` does not own `player_id`.
    let conn = PlayerConn::new(player_id, user_id, session);
    ws::start(conn, &req, stream)
}

// ---------------------------------------------------------------------------
// /ws/game/{game_id}/spectate
// ---------------------------------------------------------------------------

pub struct SpectatorConn {
    last_heartbeat: Instant,
    spectator_id: Uuid,
    session: Addr<GameSessionActor>,
}

impl SpectatorConn {
    fn new(session: Addr<GameSessionActor>) -> Self {
        Self {
            last_heartbeat: Instant::now(),
            spectator_id: Uuid::new_v4(),
            session,
        }
    }
}

impl Actor for SpectatorConn {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });

        self.session.do_send(AttachSpectator {
            spectator_id: self.spectator_id,
            addr: ctx.address().recipient(),
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.session.do_send(DetachSpectator {
            spectator_id: self.spectator_id,
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for SpectatorConn {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                let _: Result<ClientSpectatorMessage, _> = serde_json::from_str(&text);
            }
            Ok(ws::Message::Ping(data)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&data);
            }
            Ok(ws::Message::Pong(_)) => self.last_heartbeat = Instant::now(),
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => {}
            Err(_) => ctx.stop(),
        }
    }
}

impl Handler<Push> for SpectatorConn {
    type Result = ();

    fn handle(&mut self, msg: Push, ctx: &mut Self::Context) {
        send_json(ctx, &msg.0);
    }
}

pub async fn ws_spectate_connect(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<String>,
    directory: web::Data<Arc<SessionDirectory>>,
) -> Result<HttpResponse, actix_web::Error> {
    let game_id = GameId::from_str(&path)
        .map_err(|_| actix_web::error::ErrorBadRequest("invalid game id"))?;
    let session = directory
        .get(game_id)
        .ok_or_else(|| actix_web::error::ErrorNotFound("game not found"))?;

    let conn = SpectatorConn::new(session);
    ws::start(conn, &req, stream)
}

fn send_json<A>(ctx: &mut ws::WebsocketContext<A>, msg: &impl serde::Serialize)
where
    A: Actor<Context = ws::WebsocketContext<A>>,
{
    match serde_json::to_string(msg) {
        Ok(text) => ctx.text(text),
        Err(e) => log::error!("failed to serialize outgoing ws message: {e}"),
    }
}
