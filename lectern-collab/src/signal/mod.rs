mod events;
mod registry;

pub use events::*;
pub use registry::*;

use log::info;

use crate::util::Id;

/// Marker for ids of gateway connections. The connection itself is owned by
/// the server's gateway; everything in here only deals in its id.
pub struct Connection;

pub type ConnectionId = Id<Connection>;

/// A message the gateway should deliver to a single connection
#[derive(Debug)]
pub struct Outbound {
    pub to: ConnectionId,
    pub event: ServerEvent,
}

/// Routes inbound gateway events to the correct peers in a room.
///
/// Handlers are pure of any network transport: each one takes the sending
/// connection and an event, updates the registry, and returns the messages to
/// deliver. Delivery is fire-and-forget; a dropped message is the client's
/// renegotiation problem, not ours.
#[derive(Default)]
pub struct Signaling {
    registry: RoomRegistry,
}

impl Signaling {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Handles one inbound event, returning the fan-out to deliver
    pub fn handle(&self, sender: ConnectionId, event: ClientEvent) -> Vec<Outbound> {
        match event {
            ClientEvent::JoinLiveClass { room_id } => self.join(sender, &room_id),
            ClientEvent::LeaveLiveClass { room_id } => self.leave(sender, &room_id),
            ClientEvent::LiveChatMessage {
                room_id,
                message,
                user,
            } => self.everyone(&room_id, ServerEvent::NewMessage { message, user }),
            ClientEvent::Offer { room_id, offer } => self.peers(
                sender,
                &room_id,
                ServerEvent::Offer {
                    offer,
                    sender_id: sender,
                },
            ),
            ClientEvent::Answer { room_id, answer } => self.peers(
                sender,
                &room_id,
                ServerEvent::Answer {
                    answer,
                    sender_id: sender,
                },
            ),
            ClientEvent::IceCandidate { room_id, candidate } => self.peers(
                sender,
                &room_id,
                ServerEvent::IceCandidate {
                    candidate,
                    sender_id: sender,
                },
            ),
        }
    }

    /// Handles a connection dropping without an explicit leave.
    ///
    /// The membership snapshot is taken before any teardown, so every room the
    /// connection was in still gets its departure notice.
    pub fn disconnect(&self, connection: ConnectionId) -> Vec<Outbound> {
        let rooms = self.registry.drop_connection(connection);

        if !rooms.is_empty() {
            info!("Connection {} dropped out of {} room(s)", connection, rooms.len());
        }

        rooms
            .iter()
            .flat_map(|room_id| {
                self.everyone(
                    room_id,
                    ServerEvent::UserDisconnected {
                        connection_id: connection,
                    },
                )
            })
            .collect()
    }

    fn join(&self, sender: ConnectionId, room_id: &str) -> Vec<Outbound> {
        // Existing members learn about the newcomer so they can initiate
        // signaling toward it
        let existing = self.registry.join(sender, room_id);

        info!("Connection {} joined room {}", sender, room_id);

        existing
            .into_iter()
            .map(|to| Outbound {
                to,
                event: ServerEvent::UserConnected {
                    connection_id: sender,
                },
            })
            .collect()
    }

    fn leave(&self, sender: ConnectionId, room_id: &str) -> Vec<Outbound> {
        self.registry.leave(sender, room_id);

        info!("Connection {} left room {}", sender, room_id);

        self.everyone(
            room_id,
            ServerEvent::UserDisconnected {
                connection_id: sender,
            },
        )
    }

    /// Fan-out to every current member of the room, sender included
    fn everyone(&self, room_id: &str, event: ServerEvent) -> Vec<Outbound> {
        self.registry
            .members_of(room_id)
            .into_iter()
            .map(|to| Outbound {
                to,
                event: event.clone(),
            })
            .collect()
    }

    /// Fan-out to every member of the room except the sender
    fn peers(&self, sender: ConnectionId, room_id: &str, event: ServerEvent) -> Vec<Outbound> {
        self.registry
            .members_of(room_id)
            .into_iter()
            .filter(|member| *member != sender)
            .map(|to| Outbound {
                to,
                event: event.clone(),
            })
            .collect()
    }
}
