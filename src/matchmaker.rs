//! `MatchmakerActor` — the singleton matchmaking coordinator. Its
//! mailbox serializes `Join`/`Leave`, so the enqueue-then-try-pair
//! sequence is atomic without an explicit queue mutex: the actor
//! mailbox *is* the lock, the same guarantee the teacher's
//! `GameBroadcaster` gets for its subscriber map.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use actix::prelude::*;

use crate::collaborators::{BotEngine, BotPredicate, Clock, RandomSource};
use crate::error::CoreError;
use crate::game::Game;
use crate::ids::UserId;
use crate::player::Player;
use crate::protocol::{ServerMatchmakingMessage, WireError};
use crate::repository::{GameFactory, GameRepository};
use crate::session::GameSessionActor;
use crate::session_directory::SessionDirectory;
use crate::types::Color;

/// Default time an unclaimed match is held before the pairing is
/// abandoned and both sides are returned to the queue.
pub const DEFAULT_MATCH_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct MatchmakingPush(pub ServerMatchmakingMessage);

struct QueueEntry {
    user_id: UserId,
    conn: Recipient<MatchmakingPush>,
}

#[derive(Message)]
#[rtype(result = "Result<(), CoreError>")]
pub struct Join {
    pub user_id: UserId,
    pub conn: Recipient<MatchmakingPush>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Leave {
    pub user_id: UserId,
}

pub struct MatchmakerActor {
    queue: VecDeque<QueueEntry>,
    user_existence: Arc<dyn crate::collaborators::UserExistenceChecker>,
    random: Arc<dyn RandomSource>,
    #[allow(dead_code)]
    clock: Arc<dyn Clock>,
    game_factory: Arc<dyn GameFactory>,
    repository: Arc<dyn GameRepository>,
    bot_predicate: Arc<dyn BotPredicate>,
    bot_engine: Arc<dyn BotEngine>,
    directory: Arc<SessionDirectory>,
}

impl MatchmakerActor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_existence: Arc<dyn crate::collaborators::UserExistenceChecker>,
        random: Arc<dyn RandomSource>,
        clock: Arc<dyn Clock>,
        game_factory: Arc<dyn GameFactory>,
        repository: Arc<dyn GameRepository>,
        bot_predicate: Arc<dyn BotPredicate>,
        bot_engine: Arc<dyn BotEngine>,
        directory: Arc<SessionDirectory>,
    ) -> Self {
        Self {
            queue: VecDeque::new(),
            user_existence,
            random,
            clock,
            game_factory,
            repository,
            bot_predicate,
            bot_engine,
            directory,
        }
    }

    fn is_enqueued(&self, user_id: UserId) -> bool {
        self.queue.iter().any(|e| e.user_id == user_id)
    }

    /// Pairs two queue entries into a fresh game. On factory failure,
    /// re-enqueues both users in their original order (`waiting` ahead
    /// of `joining`, the relative order they held before this attempt)
    /// and returns the error to the caller.
    fn pair(&mut self, joining: QueueEntry, waiting: QueueEntry) -> Result<(), CoreError> {
        let joining_side = self.random.random_color();

        let (white_user, black_user) = if joining_side == Color::White {
            (joining.user_id, waiting.user_id)
        } else {
            (waiting.user_id, joining.user_id)
        };
        let white = Player::new(white_user, Color::White);
        let black = Player::new(black_user, Color::Black);

        let game = match self.game_factory.create_game(white, black) {
            Ok(game) => game,
            Err(e) => {
                log::error!("failed to create game for matched pair: {e}");
                self.queue.push_front(joining);
                self.queue.push_front(waiting);
                return Err(e);
            }
        };
        let game_id = game.id;
        self.start_session(game);

        let (white_conn, black_conn) = if joining_side == Color::White {
            (joining.conn, waiting.conn)
        } else {
            (waiting.conn, joining.conn)
        };
        white_conn.do_send(MatchmakingPush(ServerMatchmakingMessage::MatchFound {
            game_id,
            player_id: white.id,
            side: Color::White,
        }));
        black_conn.do_send(MatchmakingPush(ServerMatchmakingMessage::MatchFound {
            game_id,
            player_id: black.id,
            side: Color::Black,
        }));
        Ok(())
    }

    /// Starts the session actor for a freshly paired game and registers
    /// it in the directory. The starting position is persisted lazily,
    /// on the session's first mutation, rather than here.
    fn start_session(&self, game: Game) {
        let game_id = game.id;
        let addr = GameSessionActor::new(
            game,
            self.repository.clone(),
            self.bot_predicate.clone(),
            self.bot_engine.clone(),
        )
        .start();
        self.directory.insert(game_id, addr);
    }
}

impl Actor for MatchmakerActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        log::info!("matchmaker started");
    }
}

impl Handler<Join> for MatchmakerActor {
    type Result = ResponseActFuture<Self, Result<(), CoreError>>;

    fn handle(&mut self, msg: Join, _ctx: &mut Context<Self>) -> Self::Result {
        if self.is_enqueued(msg.user_id) {
            return Box::pin(actix::fut::ready(Err(CoreError::AlreadyEnqueued(
                msg.user_id,
            ))));
        }
        let checker = self.user_existence.clone();
        let user_id = msg.user_id;
        let conn = msg.conn;

        Box::pin(
            actix::fut::wrap_future(async move { checker.exists(user_id).await }).map(
                move |exists, act: &mut Self, _ctx| match exists {
                    Ok(true) => {
                        let entry = QueueEntry { user_id, conn };
                        match act.queue.pop_front() {
                            Some(waiting) => act.pair(entry, waiting),
                            None => {
                                entry
                                    .conn
                                    .do_send(MatchmakingPush(ServerMatchmakingMessage::QueuePositionUpdate {
                                        position: 1,
                                    }));
                                act.queue.push_back(entry);
                                Ok(())
                            }
                        }
                    }
                    Ok(false) => {
                        let err = CoreError::UnknownUser(user_id);
                        conn.do_send(MatchmakingPush(ServerMatchmakingMessage::Error {
                            error: WireError::from(&err),
                        }));
                        Err(err)
                    }
                    Err(e) => {
                        conn.do_send(MatchmakingPush(ServerMatchmakingMessage::Error {
                            error: WireError::from(&e),
                        }));
                        Err(e)
                    }
                },
            ),
        )
    }
}

impl Handler<Leave> for MatchmakerActor {
    type Result = ();

    fn handle(&mut self, msg: Leave, _ctx: &mut Context<Self>) {
        self.queue.retain(|e| e.user_id != msg.user_id);
    }
}
