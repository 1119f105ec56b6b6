//! `GameSessionActor` — the SessionHub. One actor per live game,
//! started by the matchmaker at pairing time. Owns the authoritative
//! `Game` and the registries of attached player/spectator connections.
//! Every handled message performs validate → apply → persist →
//! broadcast: a mutation is only broadcast and acknowledged once its
//! persisted snapshot has actually been written, and is rolled back in
//! memory otherwise. actix guarantees one message processed at a time
//! per actor, so this single mailbox is the game's entire critical
//! section — no additional lock is needed, generalizing the teacher's
//! singleton `GameBroadcaster` subscriber map down to one map per game.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use actix::prelude::*;
use uuid::Uuid;

use crate::collaborators::{BotEngine, BotPredicate};
use crate::error::CoreError;
use crate::game::Game;
use crate::ids::{PlayerId, UserId};
use crate::protocol::{ServerGameMessage, WireError};
use crate::repository::GameRepository;
use crate::rules;
use crate::types::{Color, GameStatus, Move};

/// A server-to-client game message delivered to one connection. A thin
/// actix `Message` wrapper around the transport-agnostic
/// `ServerGameMessage` so `protocol.rs` stays free of an actix
/// dependency.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct Push(pub ServerGameMessage);

/// Attaches a player's connection to the session. Replaces any
/// previously attached connection for the same `PlayerId` (reconnect).
/// `user_id` is the identity the bearer token on `/ws/game/{id}`
/// resolved to — it must match the participant `player_id` claims to
/// be, or the attach is rejected.
#[derive(Message)]
#[rtype(result = "Result<(), CoreError>")]
pub struct AttachPlayer {
    pub player_id: PlayerId,
    pub user_id: UserId,
    pub addr: Recipient<Push>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct DetachPlayer {
    pub player_id: PlayerId,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct AttachSpectator {
    pub spectator_id: Uuid,
    pub addr: Recipient<Push>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct DetachSpectator {
    pub spectator_id: Uuid,
}

#[derive(Message)]
#[rtype(result = "Result<(), CoreError>")]
pub struct AttemptMove {
    pub player_id: PlayerId,
    pub mv: Move,
}

#[derive(Message)]
#[rtype(result = "Result<(), CoreError>")]
pub struct Resign {
    pub player_id: PlayerId,
}

#[derive(Message)]
#[rtype(result = "Result<(), CoreError>")]
pub struct OfferDraw {
    pub player_id: PlayerId,
}

#[derive(Message)]
#[rtype(result = "Result<(), CoreError>")]
pub struct AcceptDraw {
    pub player_id: PlayerId,
}

#[derive(Message)]
#[rtype(result = "Result<(), CoreError>")]
pub struct RejectDraw {
    pub player_id: PlayerId,
}

/// Snapshot request, used by a freshly attached connection to receive
/// the current state before any further event arrives.
#[derive(Message)]
#[rtype(result = "ServerGameMessage")]
pub struct SyncSnapshot;

/// Self-sent after a successful transition, when the side now to move
/// is a bot. Discarded if the game is no longer in progress by the
/// time it is handled — the cancellation-on-terminal rule.
#[derive(Message)]
#[rtype(result = "()")]
struct PlayBotMove {
    for_side: Color,
}

const BOT_MOVE_DELAY: Duration = Duration::from_millis(400);

pub struct GameSessionActor {
    game: Game,
    repository: Arc<dyn GameRepository>,
    bot_predicate: Arc<dyn BotPredicate>,
    bot_engine: Arc<dyn BotEngine>,
    players: HashMap<PlayerId, Recipient<Push>>,
    spectators: HashMap<Uuid, Recipient<Push>>,
}

impl GameSessionActor {
    pub fn new(
        game: Game,
        repository: Arc<dyn GameRepository>,
        bot_predicate: Arc<dyn BotPredicate>,
        bot_engine: Arc<dyn BotEngine>,
    ) -> Self {
        Self {
            game,
            repository,
            bot_predicate,
            bot_engine,
            players: HashMap::new(),
            spectators: HashMap::new(),
        }
    }

    fn snapshot(&self) -> ServerGameMessage {
        ServerGameMessage::GameStateSync {
            game_id: self.game.id,
            fen: self.game.position.to_fen(),
            status: self.game.status,
            legal_moves: self.game.legal_moves(),
            pending_draw_offer: self.game.pending_draw_offer,
        }
    }

    fn broadcast(&self, msg: ServerGameMessage) {
        for addr in self.players.values() {
            addr.do_send(Push(msg.clone()));
        }
        for addr in self.spectators.values() {
            addr.do_send(Push(msg.clone()));
        }
    }

    fn schedule_bot_move_if_needed(&self, ctx: &mut Context<Self>) {
        if self.game.is_over() {
            return;
        }
        let side = self.game.position.side_to_move;
        let user_id = self.game.player_for(side).user_id;
        let predicate = self.bot_predicate.clone();
        ctx.spawn(actix::fut::wrap_future(async move { predicate.is_bot(user_id).await }).map(
            move |is_bot, act: &mut Self, ctx| match is_bot {
                Ok(true) => {
                    ctx.notify_later(PlayBotMove { for_side: side }, BOT_MOVE_DELAY);
                }
                Ok(false) => {}
                Err(e) => log::warn!("bot predicate check failed: {e}"),
            },
        ));
    }

    fn require_turn(&self, player_id: PlayerId) -> Result<Color, CoreError> {
        let side = self
            .game
            .side_of(player_id)
            .ok_or(CoreError::NotAParticipant(player_id, self.game.id))?;
        if side != self.game.position.side_to_move {
            return Err(CoreError::NotYourTurn(player_id));
        }
        Ok(side)
    }

    fn require_participant(&self, player_id: PlayerId) -> Result<Color, CoreError> {
        self.game
            .side_of(player_id)
            .ok_or(CoreError::NotAParticipant(player_id, self.game.id))
    }
}

impl Actor for GameSessionActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        log::info!("game session {} started", self.game.id);
    }
}

impl Handler<AttachPlayer> for GameSessionActor {
    type Result = Result<(), CoreError>;

    fn handle(&mut self, msg: AttachPlayer, _ctx: &mut Context<Self>) -> Self::Result {
        let side = self
            .game
            .side_of(msg.player_id)
            .ok_or(CoreError::NotAParticipant(msg.player_id, self.game.id))?;
        if self.game.player_for(side).user_id != msg.user_id {
            return Err(CoreError::NotAParticipant(msg.player_id, self.game.id));
        }
        self.players.insert(msg.player_id, msg.addr.clone());
        msg.addr.do_send(Push(self.snapshot()));
        self.broadcast(ServerGameMessage::PlayerReconnected {
            player_id: msg.player_id,
        });
        Ok(())
    }
}

impl Handler<DetachPlayer> for GameSessionActor {
    type Result = ();

    fn handle(&mut self, msg: DetachPlayer, _ctx: &mut Context<Self>) {
        self.players.remove(&msg.player_id);
        self.broadcast(ServerGameMessage::PlayerDisconnected {
            player_id: msg.player_id,
        });
    }
}

impl Handler<AttachSpectator> for GameSessionActor {
    type Result = ();

    fn handle(&mut self, msg: AttachSpectator, _ctx: &mut Context<Self>) {
        msg.addr.do_send(Push(self.snapshot()));
        self.spectators.insert(msg.spectator_id, msg.addr);
    }
}

impl Handler<DetachSpectator> for GameSessionActor {
    type Result = ();

    fn handle(&mut self, msg: DetachSpectator, _ctx: &mut Context<Self>) {
        self.spectators.remove(&msg.spectator_id);
    }
}

impl Handler<SyncSnapshot> for GameSessionActor {
    type Result = ServerGameMessage;

    fn handle(&mut self, _msg: SyncSnapshot, _ctx: &mut Context<Self>) -> ServerGameMessage {
        self.snapshot()
    }
}

impl Handler<AttemptMove> for GameSessionActor {
    type Result = ResponseActFuture<Self, Result<(), CoreError>>;

    fn handle(&mut self, msg: AttemptMove, _ctx: &mut Context<Self>) -> Self::Result {
        let side = match self.require_turn(msg.player_id) {
            Ok(side) => side,
            Err(e) => return Box::pin(actix::fut::ready(Err(e))),
        };

        let before = self.game.clone();
        if let Err(e) = self.game.apply_move(msg.mv) {
            return Box::pin(actix::fut::ready(Err(e)));
        }

        let repo = self.repository.clone();
        let game = self.game.clone();
        let executed = ServerGameMessage::MoveExecuted {
            game_id: game.id,
            mv: msg.mv,
            by: side,
            fen: game.position.to_fen(),
            status: game.status,
            is_check: rules::is_in_check(&game.position, game.position.side_to_move),
        };
        // Checkmate/stalemate are already fully signaled by
        // `MoveExecuted.status` — only an actual draw gets the extra
        // `GameDrawn` broadcast.
        let drawn = (game.status == GameStatus::Draw).then(|| ServerGameMessage::GameDrawn {
            game_id: game.id,
            reason: game.end_reason.expect("draw status always carries a reason"),
        });

        Box::pin(
            actix::fut::wrap_future(async move { repo.save(&game).await }).map(
                move |result, act: &mut Self, ctx| match result {
                    Ok(()) => {
                        act.broadcast(executed);
                        if let Some(drawn) = drawn {
                            act.broadcast(drawn);
                        }
                        act.schedule_bot_move_if_needed(ctx);
                        Ok(())
                    }
                    Err(e) => {
                        act.game = before;
                        Err(e)
                    }
                },
            ),
        )
    }
}

impl Handler<Resign> for GameSessionActor {
    type Result = ResponseActFuture<Self, Result<(), CoreError>>;

    fn handle(&mut self, msg: Resign, _ctx: &mut Context<Self>) -> Self::Result {
        let side = match self.require_participant(msg.player_id) {
            Ok(side) => side,
            Err(e) => return Box::pin(actix::fut::ready(Err(e))),
        };
        let before = self.game.clone();
        if let Err(e) = self.game.resign(side) {
            return Box::pin(actix::fut::ready(Err(e)));
        }

        let repo = self.repository.clone();
        let game = self.game.clone();
        let resigned = ServerGameMessage::GameResigned {
            game_id: game.id,
            by: side,
        };

        Box::pin(
            actix::fut::wrap_future(async move { repo.save(&game).await }).map(
                move |result, act: &mut Self, _ctx| match result {
                    Ok(()) => {
                        act.broadcast(resigned);
                        Ok(())
                    }
                    Err(e) => {
                        act.game = before;
                        Err(e)
                    }
                },
            ),
        )
    }
}

impl Handler<OfferDraw> for GameSessionActor {
    type Result = ResponseActFuture<Self, Result<(), CoreError>>;

    fn handle(&mut self, msg: OfferDraw, _ctx: &mut Context<Self>) -> Self::Result {
        let side = match self.require_participant(msg.player_id) {
            Ok(side) => side,
            Err(e) => return Box::pin(actix::fut::ready(Err(e))),
        };
        let before = self.game.clone();
        if let Err(e) = self.game.offer_draw(side) {
            return Box::pin(actix::fut::ready(Err(e)));
        }

        let repo = self.repository.clone();
        let game = self.game.clone();

        Box::pin(
            actix::fut::wrap_future(async move { repo.save(&game).await }).map(
                move |result, act: &mut Self, _ctx| match result {
                    Ok(()) => {
                        act.broadcast(ServerGameMessage::DrawOffered { by: side });
                        Ok(())
                    }
                    Err(e) => {
                        act.game = before;
                        Err(e)
                    }
                },
            ),
        )
    }
}

impl Handler<AcceptDraw> for GameSessionActor {
    type Result = ResponseActFuture<Self, Result<(), CoreError>>;

    fn handle(&mut self, msg: AcceptDraw, _ctx: &mut Context<Self>) -> Self::Result {
        let side = match self.require_participant(msg.player_id) {
            Ok(side) => side,
            Err(e) => return Box::pin(actix::fut::ready(Err(e))),
        };
        let before = self.game.clone();
        if let Err(e) = self.game.accept_draw(side) {
            return Box::pin(actix::fut::ready(Err(e)));
        }

        let repo = self.repository.clone();
        let game = self.game.clone();

        Box::pin(
            actix::fut::wrap_future(async move { repo.save(&game).await }).map(
                move |result, act: &mut Self, _ctx| match result {
                    Ok(()) => {
                        act.broadcast(ServerGameMessage::DrawAccepted);
                        Ok(())
                    }
                    Err(e) => {
                        act.game = before;
                        Err(e)
                    }
                },
            ),
        )
    }
}

impl Handler<RejectDraw> for GameSessionActor {
    type Result = ResponseActFuture<Self, Result<(), CoreError>>;

    fn handle(&mut self, msg: RejectDraw, _ctx: &mut Context<Self>) -> Self::Result {
        let side = match self.require_participant(msg.player_id) {
            Ok(side) => side,
            Err(e) => return Box::pin(actix::fut::ready(Err(e))),
        };
        let before = self.game.clone();
        if let Err(e) = self.game.reject_draw(side) {
            return Box::pin(actix::fut::ready(Err(e)));
        }

        let repo = self.repository.clone();
        let game = self.game.clone();

        Box::pin(
            actix::fut::wrap_future(async move { repo.save(&game).await }).map(
                move |result, act: &mut Self, _ctx| match result {
                    Ok(()) => {
                        act.broadcast(ServerGameMessage::DrawRejected);
                        Ok(())
                    }
                    Err(e) => {
                        act.game = before;
                        Err(e)
                    }
                },
            ),
        )
    }
}

impl Handler<PlayBotMove> for GameSessionActor {
    type Result = ();

    fn handle(&mut self, msg: PlayBotMove, ctx: &mut Context<Self>) {
        if self.game.is_over() || self.game.position.side_to_move != msg.for_side {
            return;
        }
        let legal_moves = self.game.legal_moves();
        let engine = self.bot_engine.clone();
        let game_id = self.game.id;
        ctx.spawn(
            actix::fut::wrap_future(async move { engine.choose_move(game_id, &legal_moves).await })
                .map(move |result, act: &mut Self, ctx| match result {
                    Ok(mv) => {
                        if act.game.is_over() || act.game.position.side_to_move != msg.for_side {
                            return;
                        }
                        let before = act.game.clone();
                        if act.game.apply_move(mv).is_err() {
                            return;
                        }

                        let repo = act.repository.clone();
                        let game = act.game.clone();
                        let executed = ServerGameMessage::MoveExecuted {
                            game_id: game.id,
                            mv,
                            by: msg.for_side,
                            fen: game.position.to_fen(),
                            status: game.status,
                            is_check: rules::is_in_check(
                                &game.position,
                                game.position.side_to_move,
                            ),
                        };
                        let drawn =
                            (game.status == GameStatus::Draw).then(|| ServerGameMessage::GameDrawn {
                                game_id: game.id,
                                reason: game
                                    .end_reason
                                    .expect("draw status always carries a reason"),
                            });

                        ctx.spawn(
                            actix::fut::wrap_future(async move { repo.save(&game).await }).map(
                                move |result, act: &mut Self, ctx| match result {
                                    Ok(()) => {
                                        act.broadcast(executed);
                                        if let Some(drawn) = drawn {
                                            act.broadcast(drawn);
                                        }
                                        act.schedule_bot_move_if_needed(ctx);
                                    }
                                    Err(e) => {
                                        log::error!(
                                            "failed to persist bot move for game {}: {e}",
                                            act.game.id
                                        );
                                        act.game = before;
                                    }
                                },
                            ),
                        );
                    }
                    Err(e) => log::warn!("bot engine failed to choose a move: {e}"),
                }),
        );
    }
}

impl From<CoreError> for ServerGameMessage {
    fn from(err: CoreError) -> Self {
        ServerGameMessage::Error {
            error: WireError::from(&err),
        }
    }
}
