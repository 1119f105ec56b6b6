//! Shared test-only actors: minimal recipients that record every push
//! they receive, standing in for a real `PlayerConn`/`MatchmakingConn`
//! so integration tests can assert on what a client would have seen.

use std::sync::{Arc, Mutex};

use actix::prelude::*;

use chessmate::matchmaker::MatchmakingPush;
use chessmate::protocol::{ServerGameMessage, ServerMatchmakingMessage};
use chessmate::session::Push;

#[derive(Message)]
#[rtype(result = "Vec<ServerGameMessage>")]
pub struct GetGameMessages;

/// Records every `Push` it receives, in order. Stands in for a
/// `PlayerConn`/`SpectatorConn` in tests that only care what state
/// reached the client, not how the socket framing works.
#[derive(Default)]
pub struct GameRecorder {
    received: Arc<Mutex<Vec<ServerGameMessage>>>,
}

impl Actor for GameRecorder {
    type Context = Context<Self>;
}

impl Handler<Push> for GameRecorder {
    type Result = ();

    fn handle(&mut self, msg: Push, _ctx: &mut Context<Self>) {
        self.received.lock().unwrap().push(msg.0);
    }
}

impl Handler<GetGameMessages> for GameRecorder {
    type Result = Vec<ServerGameMessage>;

    fn handle(&mut self, _msg: GetGameMessages, _ctx: &mut Context<Self>) -> Vec<ServerGameMessage> {
        self.received.lock().unwrap().clone()
    }
}

#[derive(Message)]
#[rtype(result = "Vec<ServerMatchmakingMessage>")]
pub struct GetMatchMessages;

/// Records every `MatchmakingPush` it receives, in order. Stands in
/// for a `MatchmakingConn`.
#[derive(Default)]
pub struct MatchRecorder {
    received: Arc<Mutex<Vec<ServerMatchmakingMessage>>>,
}

impl Actor for MatchRecorder {
    type Context = Context<Self>;
}

impl Handler<MatchmakingPush> for MatchRecorder {
    type Result = ();

    fn handle(&mut self, msg: MatchmakingPush, _ctx: &mut Context<Self>) {
        self.received.lock().unwrap().push(msg.0);
    }
}

impl Handler<GetMatchMessages> for MatchRecorder {
    type Result = Vec<ServerMatchmakingMessage>;

    fn handle(
        &mut self,
        _msg: GetMatchMessages,
        _ctx: &mut Context<Self>,
    ) -> Vec<ServerMatchmakingMessage> {
        self.received.lock().unwrap().clone()
    }
}
