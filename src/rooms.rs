//! # Room Membership and Join Broadcasting
//!
//! Clients connect to `/ws/rooms` and join a named room; everyone already
//! in that room hears about the arrival, and departures are broadcast on
//! disconnect. Rooms exist only while they have members.
//!
//! ## WebSocket Protocol:
//! 1. **Connection**: Client connects, server assigns a client id
//! 2. **Join**: Client sends `{"kind": "join_room", "room_id": "..."}`
//! 3. **Broadcasts**: Server fans out `peer_joined` / `peer_left` to the room
//! 4. **Disconnect**: Closing the socket leaves the room implicitly
//!
//! All frames in both directions are JSON objects discriminated by a
//! `kind` field; unknown or malformed frames get an `error` reply, never a
//! dropped connection.
//!
//! The registry caps the number of distinct rooms. Joining an existing
//! room always succeeds; creating a room past the cap is refused, so an
//! unauthenticated client cannot grow server memory without bound.

use crate::state::AppState;

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Broadcast delivered to room members when membership changes.
#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub enum RoomEvent {
    PeerJoined { room_id: String, peer_id: Uuid },
    PeerLeft { room_id: String, peer_id: Uuid },
}

/// Why a join was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    /// The room does not exist yet and the registry is at its room cap.
    RoomLimitReached,
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinError::RoomLimitReached => write!(f, "room limit reached"),
        }
    }
}

/// Tracks which client is in which room.
///
/// A client is in at most one room; joining a second room leaves the first.
/// Empty rooms are evicted immediately so the registry only ever holds
/// rooms with at least one member.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, HashMap<Uuid, Recipient<RoomEvent>>>>,
    max_rooms: usize,
}

impl fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomRegistry")
            .field("rooms", &self.room_count())
            .field("max_rooms", &self.max_rooms)
            .finish()
    }
}

impl RoomRegistry {
    pub fn new(max_rooms: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            max_rooms,
        }
    }

    /// Add a client to a room, leaving its previous room if any.
    ///
    /// Returns the member count of the room after joining. Existing members
    /// are notified with `PeerJoined`.
    pub fn join(
        &self,
        room_id: &str,
        client_id: Uuid,
        recipient: Recipient<RoomEvent>,
    ) -> Result<usize, JoinError> {
        let mut rooms = self.rooms.write().unwrap();

        if !rooms.contains_key(room_id) && rooms.len() >= self.max_rooms {
            return Err(JoinError::RoomLimitReached);
        }

        Self::remove_member(&mut rooms, client_id);

        let members = rooms.entry(room_id.to_string()).or_default();
        for member in members.values() {
            member.do_send(RoomEvent::PeerJoined {
                room_id: room_id.to_string(),
                peer_id: client_id,
            });
        }
        members.insert(client_id, recipient);
        Ok(members.len())
    }

    /// Remove a client from whatever room it is in, notifying the remaining
    /// members. A client that never joined is a no-op.
    pub fn leave(&self, client_id: Uuid) {
        let mut rooms = self.rooms.write().unwrap();
        if let Some(room_id) = Self::remove_member(&mut rooms, client_id) {
            if let Some(members) = rooms.get(&room_id) {
                for member in members.values() {
                    member.do_send(RoomEvent::PeerLeft {
                        room_id: room_id.clone(),
                        peer_id: client_id,
                    });
                }
            }
        }
    }

    /// Number of rooms that currently have members.
    pub fn room_count(&self) -> usize {
        self.rooms.read().unwrap().len()
    }

    /// Member count of one room (0 if it does not exist).
    pub fn member_count(&self, room_id: &str) -> usize {
        self.rooms
            .read()
            .unwrap()
            .get(room_id)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    // Removes the member and evicts its room if it became empty. Returns
    // the room the member was in.
    fn remove_member(
        rooms: &mut HashMap<String, HashMap<Uuid, Recipient<RoomEvent>>>,
        client_id: Uuid,
    ) -> Option<String> {
        let room_id = rooms
            .iter()
            .find(|(_, members)| members.contains_key(&client_id))
            .map(|(id, _)| id.clone())?;

        let members = rooms.get_mut(&room_id)?;
        members.remove(&client_id);
        if members.is_empty() {
            rooms.remove(&room_id);
        }
        Some(room_id)
    }
}

/// Messages the client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinRoom { room_id: String },
}

/// Messages the server sends.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerMessage {
    Joined { room_id: String, participants: usize },
    PeerJoined { room_id: String, peer_id: Uuid },
    PeerLeft { room_id: String, peer_id: Uuid },
    Error { message: String },
}

/// WebSocket actor for one room client.
///
/// ## Actor Model:
/// Each connection is an independent actor; membership changes reach it as
/// `RoomEvent` messages from the registry, which it serializes onto the
/// socket.
pub struct RoomSocket {
    client_id: Uuid,
    registry: Arc<RoomRegistry>,
    state: web::Data<AppState>,
    last_heartbeat: Instant,
}

impl RoomSocket {
    pub fn new(registry: Arc<RoomRegistry>, state: web::Data<AppState>) -> Self {
        Self {
            client_id: Uuid::new_v4(),
            registry,
            state,
            last_heartbeat: Instant::now(),
        }
    }

    fn send_message(&self, ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMessage) {
        match serde_json::to_string(msg) {
            Ok(json) => ctx.text(json),
            Err(e) => error!(client = %self.client_id, error = %e, "failed to serialize server message"),
        }
    }

    fn handle_join(&self, room_id: String, ctx: &mut ws::WebsocketContext<Self>) {
        let recipient = ctx.address().recipient();
        match self.registry.join(&room_id, self.client_id, recipient) {
            Ok(participants) => {
                info!(client = %self.client_id, room = %room_id, participants, "client joined room");
                self.send_message(ctx, &ServerMessage::Joined { room_id, participants });
            }
            Err(e) => {
                warn!(client = %self.client_id, room = %room_id, error = %e, "join refused");
                self.send_message(
                    ctx,
                    &ServerMessage::Error {
                        message: e.to_string(),
                    },
                );
            }
        }
    }
}

impl Actor for RoomSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(client = %self.client_id, "room socket connected");
        self.state.increment_connected_clients();

        ctx.run_interval(Duration::from_secs(30), |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > Duration::from_secs(60) {
                warn!(client = %act.client_id, "heartbeat timeout, closing room socket");
                ctx.stop();
            } else {
                ctx.ping(b"");
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!(client = %self.client_id, "room socket disconnected");
        self.registry.leave(self.client_id);
        self.state.decrement_connected_clients();
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for RoomSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::JoinRoom { room_id }) => {
                    self.handle_join(room_id, ctx);
                }
                Err(e) => {
                    debug!(client = %self.client_id, error = %e, "unparseable client frame");
                    self.send_message(
                        ctx,
                        &ServerMessage::Error {
                            message: format!("invalid message: {}", e),
                        },
                    );
                }
            },
            Ok(ws::Message::Binary(_)) => {
                self.send_message(
                    ctx,
                    &ServerMessage::Error {
                        message: "binary frames are not supported".to_string(),
                    },
                );
            }
            Ok(ws::Message::Ping(data)) => {
                ctx.pong(&data);
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                info!(client = %self.client_id, ?reason, "room socket closed by client");
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                warn!(client = %self.client_id, "unexpected continuation frame");
            }
            Ok(ws::Message::Nop) => {}
            Err(e) => {
                error!(client = %self.client_id, error = %e, "websocket protocol error");
                ctx.stop();
            }
        }
    }
}

impl Handler<RoomEvent> for RoomSocket {
    type Result = ();

    fn handle(&mut self, msg: RoomEvent, ctx: &mut Self::Context) {
        let out = match msg {
            RoomEvent::PeerJoined { room_id, peer_id } => {
                ServerMessage::PeerJoined { room_id, peer_id }
            }
            RoomEvent::PeerLeft { room_id, peer_id } => ServerMessage::PeerLeft { room_id, peer_id },
        };
        self.send_message(ctx, &out);
    }
}

/// WebSocket endpoint handler: upgrades the HTTP request and hands the
/// connection to a `RoomSocket` actor.
pub async fn room_socket(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    info!(
        peer = ?req.connection_info().peer_addr(),
        "new room socket connection request"
    );
    let registry = app_state.rooms.clone();
    ws::start(RoomSocket::new(registry, app_state), &req, stream)
}
