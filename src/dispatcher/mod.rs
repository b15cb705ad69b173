//! §4.F Event Dispatcher: the seam where client events meet the state
//! machine. Resolves the sender from the Connection Registry, looks the game
//! up via the Game Registry (holding its mutex across the whole mutation
//! step, per §5's per-game serial execution requirement), invokes the
//! engine, and fans results out through `Fanout`. Mirrors the shape of the
//! teacher's HTTP handlers in `server/routes.rs` — thin functions that
//! translate one external request into one domain call plus one response —
//! generalised from request/response to event-in/fan-out-out.

pub mod events;

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::CacheError;
use crate::directory::RoomDirectory;
use crate::domain::{GameState, RawPlayer, UserId};
use crate::engine::avalon::{AvalonEngine, DefaultAvalonEngine, GameError, OsRandomness, Transition};
use crate::fanout::Fanout;
use crate::registry::{ConnectionRegistry, GameRegistry, RoomMembership};

use events::*;

const LOG_TARGET: &str = "dispatcher";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("unknown game {0}")]
    UnknownGame(String),
    #[error("session {0} is not connected")]
    UnknownSession(String),
    #[error("sender's room does not match the game's room")]
    RoomMismatch,
}

pub struct Dispatcher {
    connections: Arc<ConnectionRegistry>,
    games: Arc<GameRegistry>,
    membership: Arc<RoomMembership>,
    directory: Arc<dyn RoomDirectory>,
    fanout: Arc<Fanout>,
    engine: DefaultAvalonEngine,
}

impl Dispatcher {
    pub fn new(
        connections: Arc<ConnectionRegistry>,
        games: Arc<GameRegistry>,
        membership: Arc<RoomMembership>,
        directory: Arc<dyn RoomDirectory>,
        fanout: Arc<Fanout>,
    ) -> Self {
        Self {
            connections,
            games,
            membership,
            directory,
            fanout,
            engine: DefaultAvalonEngine,
        }
    }

    fn emit_error(&self, session_id: &str, message: impl Into<String>) {
        self.fanout
            .emit(session_id, EV_ERROR, json!({ "message": message.into() }));
    }

    // ---- connect / disconnect --------------------------------------

    pub async fn handle_connect(&self, session_id: &str, auth: Option<ConnectAuth>) {
        self.connections.connect(session_id).await;
        self.fanout
            .emit(session_id, EV_CONNECTED, json!({ "session_id": session_id }));
        info!(target: LOG_TARGET, session_id, guest = auth.is_none(), "client connected");
    }

    pub async fn handle_disconnect(&self, session_id: &str) -> Result<(), DispatchError> {
        let Some(record) = self.connections.disconnect(session_id).await else {
            return Ok(());
        };
        self.fanout.unregister(session_id);

        let (Some(room_id), Some(user_id)) = (record.room_id.clone(), record.user_id) else {
            return Ok(());
        };

        self.depart_room(&room_id, user_id, &record.username.unwrap_or_default())
            .await
    }

    // ---- room membership --------------------------------------------

    pub async fn handle_join_room(
        &self,
        session_id: &str,
        payload: JoinRoomPayload,
    ) -> Result<(), DispatchError> {
        self.connections
            .bind_identity(
                session_id,
                payload.user_id,
                payload.username.clone(),
                payload.display_name.clone(),
                payload.room_id.clone(),
            )
            .await;
        self.membership
            .join(&payload.room_id, payload.user_id, session_id)
            .await?;

        let roster = self.connections.room_roster(&payload.room_id).await;
        let roster_json: Vec<_> = roster
            .iter()
            .map(|r| {
                json!({
                    "user_id": r.user_id,
                    "username": r.username,
                    "display_name": r.display_name,
                })
            })
            .collect();

        self.broadcast_room(
            &payload.room_id,
            EV_USER_JOINED,
            json!({ "user_id": payload.user_id, "username": payload.username, "display_name": payload.display_name }),
        )
        .await;
        self.fanout
            .emit(session_id, EV_ROOM_USERS, json!({ "users": roster_json }));

        info!(target: LOG_TARGET, room_id = %payload.room_id, user_id = payload.user_id, "user joined room");
        Ok(())
    }

    pub async fn handle_leave_room(
        &self,
        session_id: &str,
        payload: LeaveRoomPayload,
    ) -> Result<(), DispatchError> {
        self.connections.unbind_room(session_id).await;
        self.depart_room(&payload.room_id, payload.user_id, &payload.username)
            .await
    }

    /// Shared by explicit `leave_room` and `disconnect`: host succession
    /// runs BEFORE membership removal (§4.E).
    async fn depart_room(
        &self,
        room_id: &str,
        user_id: UserId,
        username: &str,
    ) -> Result<(), DispatchError> {
        let successor = self.membership.handle_departure(room_id, user_id).await?;
        self.membership.leave(room_id, user_id).await?;

        if let Some(new_host) = successor {
            self.broadcast_room(room_id, EV_HOST_CHANGED, json!({ "host_id": new_host }))
                .await;
        }
        self.broadcast_room(
            room_id,
            EV_USER_LEFT,
            json!({ "user_id": user_id, "username": username }),
        )
        .await;
        Ok(())
    }

    // ---- passthrough, non-core events --------------------------------

    pub async fn handle_ready_toggle(&self, session_id: &str, payload: ReadyTogglePayload) {
        let Some(record) = self.connections.get(session_id).await else {
            return;
        };
        self.broadcast_room(
            &payload.room_id,
            EV_READY_TOGGLED,
            json!({ "user_id": record.user_id, "ready": payload.ready }),
        )
        .await;
    }

    pub async fn handle_chat_message(&self, session_id: &str, payload: ChatMessagePayload) {
        let Some(record) = self.connections.get(session_id).await else {
            return;
        };
        self.broadcast_room(
            &payload.room_id,
            EV_CHAT_MESSAGE,
            json!({
                "user_id": record.user_id,
                "username": record.username,
                "message": payload.message,
            }),
        )
        .await;
    }

    // ---- game lifecycle -----------------------------------------------

    pub async fn handle_start_game(
        &self,
        session_id: &str,
        payload: StartGamePayload,
    ) -> Result<(), DispatchError> {
        if payload.game_type != "avalon" {
            self.broadcast_room(
                &payload.room_id,
                EV_GAME_STARTED,
                json!({ "game_id": payload.game_id, "game_type": payload.game_type }),
            )
            .await;
            return Ok(());
        }

        let roster = self.connections.room_roster(&payload.room_id).await;
        if roster.len() < crate::rulebook::MIN_PLAYERS {
            self.emit_error(session_id, ERR_TOO_FEW_PLAYERS);
            return Ok(());
        }
        if roster.len() > crate::rulebook::MAX_PLAYERS {
            self.emit_error(session_id, ERR_TOO_MANY_PLAYERS);
            return Ok(());
        }

        let players: Vec<RawPlayer> = roster
            .into_iter()
            .filter_map(|r| {
                Some(RawPlayer {
                    user_id: r.user_id?,
                    username: r.username.unwrap_or_default(),
                    display_name: r.display_name.unwrap_or_default(),
                })
            })
            .collect();

        let mut rng = OsRandomness;
        let state = match self.engine.initialize(
            payload.game_id.clone(),
            payload.room_id.clone(),
            players,
            &mut rng,
        ) {
            Ok(state) => state,
            Err(err) => {
                self.emit_error(session_id, err.to_string());
                return Ok(());
            }
        };

        self.games.bind_room(&payload.room_id, &payload.game_id).await?;
        self.games.insert(state.clone()).await?;

        self.broadcast_room(
            &payload.room_id,
            EV_GAME_STARTED,
            json!({ "game_id": payload.game_id, "public_state": crate::engine::avalon::PublicState::project(&state) }),
        )
        .await;

        self.fanout_role_assignments(&state).await;
        self.fanout_game_state_update(&state).await;

        info!(target: LOG_TARGET, game_id = %payload.game_id, room_id = %payload.room_id, player_count = state.player_count(), "avalon game started");
        Ok(())
    }

    pub async fn handle_get_game_state(
        &self,
        session_id: &str,
        payload: GetGameStatePayload,
    ) -> Result<(), DispatchError> {
        let Some(record) = self.connections.get(session_id).await else {
            return Err(DispatchError::UnknownSession(session_id.to_string()));
        };
        let Some(user_id) = record.user_id else {
            return Err(DispatchError::UnknownSession(session_id.to_string()));
        };
        let handle = self.require_game(&payload.game_id, record.room_id.as_deref()).await?;
        let state = handle.lock().await;
        match self.engine.get_player_view(&state, user_id) {
            Some(view) => {
                self.fanout.emit(session_id, EV_GAME_STATE_UPDATE, json!(view));
            }
            None => self.emit_error(session_id, "not a player in this game"),
        }
        Ok(())
    }

    // ---- the four state-mutating game events ---------------------------

    pub async fn handle_propose_team(
        &self,
        session_id: &str,
        payload: ProposeTeamPayload,
    ) -> Result<(), DispatchError> {
        let (user_id, room_id) = self.resolve_caller(session_id).await?;
        let handle = self.require_game(&payload.game_id, Some(&room_id)).await?;
        let mut state = handle.lock().await;

        let result = self
            .engine
            .propose_team(&mut state, user_id, payload.team_members);
        let transition = match result {
            Ok(t) => t,
            Err(err) => {
                self.emit_error(session_id, err.to_string());
                return Ok(());
            }
        };
        self.games.persist(&state).await;

        if let Transition::TeamProposed = transition {
            self.broadcast_room(
                &room_id,
                EV_TEAM_PROPOSED,
                json!({ "game_id": state.game_id, "proposed_team": state.proposed_team }),
            )
            .await;
            self.fanout_game_state_update(&state).await;
        }
        Ok(())
    }

    pub async fn handle_vote_team(
        &self,
        session_id: &str,
        payload: VoteTeamPayload,
    ) -> Result<(), DispatchError> {
        let (user_id, room_id) = self.resolve_caller(session_id).await?;
        let handle = self.require_game(&payload.game_id, Some(&room_id)).await?;
        let mut state = handle.lock().await;

        let transition = match self.engine.vote_team(&mut state, user_id, payload.approve) {
            Ok(t) => t,
            Err(err) => {
                self.emit_error(session_id, err.to_string());
                return Ok(());
            }
        };
        self.games.persist(&state).await;

        match transition {
            Transition::VoteRecorded => {
                self.broadcast_room(
                    &room_id,
                    EV_TEAM_VOTE_UPDATE,
                    json!({ "game_id": state.game_id, "votes_cast": state.team_votes.len(), "votes_needed": state.player_count() }),
                )
                .await;
            }
            Transition::TeamVoteResolved { approved } => {
                self.broadcast_room(
                    &room_id,
                    EV_TEAM_VOTE_RESULT,
                    json!({ "game_id": state.game_id, "approved": approved, "votes": state.team_votes }),
                )
                .await;
                if state.phase == crate::domain::Phase::GameOver {
                    self.broadcast_game_ended(&state).await;
                } else {
                    self.fanout_game_state_update(&state).await;
                }
            }
            other => warn!(target: LOG_TARGET, ?other, "unexpected transition from vote_team"),
        }
        Ok(())
    }

    pub async fn handle_vote_mission(
        &self,
        session_id: &str,
        payload: VoteMissionPayload,
    ) -> Result<(), DispatchError> {
        let (user_id, room_id) = self.resolve_caller(session_id).await?;
        let handle = self.require_game(&payload.game_id, Some(&room_id)).await?;
        let mut state = handle.lock().await;
        let mut rng = OsRandomness;

        let transition =
            match self.engine.vote_mission(&mut state, user_id, payload.success, &mut rng) {
                Ok(t) => t,
                Err(err) => {
                    self.emit_error(session_id, err.to_string());
                    return Ok(());
                }
            };
        self.games.persist(&state).await;

        match transition {
            Transition::VoteRecorded => {
                self.broadcast_room(
                    &room_id,
                    EV_MISSION_VOTE_UPDATE,
                    json!({ "game_id": state.game_id, "votes_cast": state.mission_votes.len(), "votes_needed": state.proposed_team.len() }),
                )
                .await;
            }
            Transition::MissionResolved { record } => {
                self.broadcast_room(
                    &room_id,
                    EV_MISSION_RESULT,
                    json!({ "game_id": state.game_id, "record": record }),
                )
                .await;
                if state.phase == crate::domain::Phase::GameOver {
                    self.broadcast_game_ended(&state).await;
                } else {
                    self.fanout_game_state_update(&state).await;
                }
            }
            other => warn!(target: LOG_TARGET, ?other, "unexpected transition from vote_mission"),
        }
        Ok(())
    }

    pub async fn handle_assassinate(
        &self,
        session_id: &str,
        payload: AssassinatePayload,
    ) -> Result<(), DispatchError> {
        let (user_id, room_id) = self.resolve_caller(session_id).await?;
        let handle = self.require_game(&payload.game_id, Some(&room_id)).await?;
        let mut state = handle.lock().await;

        let transition = match self.engine.assassinate(&mut state, user_id, payload.target_id) {
            Ok(t) => t,
            Err(err) => {
                self.emit_error(session_id, err.to_string());
                return Ok(());
            }
        };
        self.games.persist(&state).await;

        if let Transition::Assassinated { winner, reason } = transition {
            self.broadcast_room(
                &room_id,
                EV_ASSASSINATION_RESULT,
                json!({ "game_id": state.game_id, "target_id": payload.target_id, "winner_team": winner, "reason": reason }),
            )
            .await;
            self.broadcast_game_ended(&state).await;
        }
        Ok(())
    }

    // ---- shared helpers ------------------------------------------------

    async fn resolve_caller(&self, session_id: &str) -> Result<(UserId, String), DispatchError> {
        let record = self
            .connections
            .get(session_id)
            .await
            .ok_or_else(|| DispatchError::UnknownSession(session_id.to_string()))?;
        let user_id = record
            .user_id
            .ok_or_else(|| DispatchError::UnknownSession(session_id.to_string()))?;
        let room_id = record
            .room_id
            .ok_or_else(|| DispatchError::UnknownSession(session_id.to_string()))?;
        Ok((user_id, room_id))
    }

    /// Looks the game up via the registry and cross-checks the sender's room
    /// against the game's room, per §4.F step 2.
    async fn require_game(
        &self,
        game_id: &str,
        caller_room_id: Option<&str>,
    ) -> Result<Arc<tokio::sync::Mutex<GameState>>, DispatchError> {
        let handle = self
            .games
            .get(game_id)
            .await?
            .ok_or_else(|| DispatchError::UnknownGame(game_id.to_string()))?;
        if let Some(room_id) = caller_room_id {
            let state = handle.lock().await;
            if state.room_id != room_id {
                return Err(DispatchError::RoomMismatch);
            }
        }
        Ok(handle)
    }

    async fn broadcast_room(&self, room_id: &str, event: &'static str, payload: serde_json::Value) {
        let sessions: Vec<String> = self
            .connections
            .room_roster_with_sessions(room_id)
            .await
            .into_iter()
            .map(|(session_id, _)| session_id)
            .collect();
        self.fanout.emit_room(&sessions, event, payload);
    }

    async fn fanout_role_assignments(&self, state: &GameState) {
        for player in &state.players {
            if let Some(session_id) = self.session_for_user(&state.room_id, player.user_id).await {
                self.fanout.emit(
                    &session_id,
                    EV_ROLE_ASSIGNED,
                    json!({ "role": player.role, "team": player.team }),
                );
            }
        }
    }

    /// `emit_projected`-shaped fan-out of `game_state_update`: every room
    /// member receives their own `get_player_view` projection, never the raw
    /// internal state (§4.G).
    async fn fanout_game_state_update(&self, state: &GameState) {
        let recipients: Vec<(String, UserId)> = self
            .connections
            .room_roster_with_sessions(&state.room_id)
            .await
            .into_iter()
            .filter_map(|(session_id, record)| Some((session_id, record.user_id?)))
            .collect();

        self.fanout
            .emit_projected(&recipients, EV_GAME_STATE_UPDATE, |user_id| {
                self.engine
                    .get_player_view(state, user_id)
                    .map(|view| json!(view))
            });
    }

    async fn broadcast_game_ended(&self, state: &GameState) {
        self.games.remove(&state.game_id).await;
        if let Err(err) = self.games.unbind_room(&state.room_id).await {
            warn!(target: LOG_TARGET, room_id = %state.room_id, %err, "failed to unbind room->game index");
        }
        self.broadcast_room(
            &state.room_id,
            EV_GAME_ENDED,
            json!({
                "game_id": state.game_id,
                "winner_team": state.winner_team,
                "win_reason": state.win_reason,
                "roster": state.players,
                "mission_results": state.mission_results,
                "assassination_target": state.assassination_target,
            }),
        )
        .await;
        info!(target: LOG_TARGET, game_id = %state.game_id, winner = ?state.winner_team, "game ended");
    }

    async fn session_for_user(&self, room_id: &str, user_id: UserId) -> Option<String> {
        self.connections
            .room_roster_with_sessions(room_id)
            .await
            .into_iter()
            .find(|(_, record)| record.user_id == Some(user_id))
            .map(|(session_id, _)| session_id)
    }

    /// Exposed so the bootstrap code can seed an authoritative host record
    /// the first time a room is created; not part of the inbound-event
    /// contract itself.
    pub fn directory(&self) -> &Arc<dyn RoomDirectory> {
        &self.directory
    }

    /// Single entry point for the transport layer (`server::ws`): normalises
    /// the raw `{event, payload}` frame into a typed handler call (§9
    /// "dynamic payload shapes") and, on any error, emits `error` to the
    /// caller only rather than letting it propagate — this is where §4.F
    /// step 5 actually happens for every event kind at once instead of being
    /// repeated in each handler.
    pub async fn dispatch(&self, session_id: &str, event: &str, payload: serde_json::Value) {
        let result = self.route(session_id, event, payload).await;
        if let Err(err) = result {
            warn!(target: LOG_TARGET, session_id, event, %err, "event rejected");
            self.emit_error(session_id, err.to_string());
        }
    }

    async fn route(
        &self,
        session_id: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), DispatchError> {
        fn parse<T: serde::de::DeserializeOwned>(payload: serde_json::Value) -> Result<T, DispatchError> {
            serde_json::from_value(payload)
                .map_err(|e| DispatchError::Game(GameError::validation(e.to_string())))
        }

        match event {
            "join_room" => self.handle_join_room(session_id, parse(payload)?).await,
            "leave_room" => self.handle_leave_room(session_id, parse(payload)?).await,
            "ready_toggle" => {
                self.handle_ready_toggle(session_id, parse(payload)?).await;
                Ok(())
            }
            "chat_message" => {
                self.handle_chat_message(session_id, parse(payload)?).await;
                Ok(())
            }
            "start_game" => self.handle_start_game(session_id, parse(payload)?).await,
            "propose_team" => self.handle_propose_team(session_id, parse(payload)?).await,
            "vote_team" => self.handle_vote_team(session_id, parse(payload)?).await,
            "vote_mission" => self.handle_vote_mission(session_id, parse(payload)?).await,
            "assassinate" => self.handle_assassinate(session_id, parse(payload)?).await,
            "get_game_state" => self.handle_get_game_state(session_id, parse(payload)?).await,
            other => Err(DispatchError::Game(GameError::validation(format!(
                "unknown event kind: {other}"
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::directory::InMemoryRoomDirectory;

    fn build_dispatcher() -> Dispatcher {
        let cache = Arc::new(InMemoryCache::new());
        let connections = Arc::new(ConnectionRegistry::new());
        let games = Arc::new(GameRegistry::new(cache.clone()));
        let directory = Arc::new(InMemoryRoomDirectory::new());
        let membership = Arc::new(RoomMembership::new(cache, directory.clone()));
        let fanout = Arc::new(Fanout::new());
        Dispatcher::new(connections, games, membership, directory, fanout)
    }

    async fn join(dispatcher: &Dispatcher, session: &str, room: &str, user_id: UserId) {
        dispatcher.handle_connect(session, None).await;
        dispatcher
            .handle_join_room(
                session,
                JoinRoomPayload {
                    room_id: room.to_string(),
                    user_id,
                    username: format!("user{user_id}"),
                    display_name: format!("User {user_id}"),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn start_game_below_minimum_emits_korean_capacity_error() {
        let dispatcher = build_dispatcher();
        let mut rx = dispatcher.fanout.register("s0".into());
        join(&dispatcher, "s0", "room1", 0).await;
        // drain the connected/room_users messages from join
        while rx.try_recv().is_ok() {}

        dispatcher
            .handle_start_game(
                "s0",
                StartGamePayload {
                    room_id: "room1".into(),
                    game_type: "avalon".into(),
                    game_id: "g1".into(),
                },
            )
            .await
            .unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.event, EV_ERROR);
        assert_eq!(msg.payload["message"], ERR_TOO_FEW_PLAYERS);
    }

    #[tokio::test]
    async fn start_game_with_five_players_broadcasts_game_started() {
        let dispatcher = build_dispatcher();
        let mut rx = dispatcher.fanout.register("s0".into());
        for (i, session) in ["s0", "s1", "s2", "s3", "s4"].iter().enumerate() {
            join(&dispatcher, session, "room1", i as i64).await;
        }
        while rx.try_recv().is_ok() {}

        dispatcher
            .handle_start_game(
                "s0",
                StartGamePayload {
                    room_id: "room1".into(),
                    game_type: "avalon".into(),
                    game_id: "g1".into(),
                },
            )
            .await
            .unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.event, EV_GAME_STARTED);
    }

    #[tokio::test]
    async fn host_departure_broadcasts_host_changed() {
        let dispatcher = build_dispatcher();
        dispatcher.directory.set_host("room1", 0).await.unwrap();
        join(&dispatcher, "s0", "room1", 0).await;
        join(&dispatcher, "s1", "room1", 1).await;

        let mut rx1 = dispatcher.fanout.register("s1".into());
        dispatcher
            .handle_leave_room(
                "s0",
                LeaveRoomPayload {
                    room_id: "room1".into(),
                    user_id: 0,
                    username: "user0".into(),
                },
            )
            .await
            .unwrap();

        let mut saw_host_changed = false;
        while let Ok(msg) = rx1.try_recv() {
            if msg.event == EV_HOST_CHANGED {
                saw_host_changed = true;
                assert_eq!(msg.payload["host_id"], 1);
            }
        }
        assert!(saw_host_changed);
    }
}
