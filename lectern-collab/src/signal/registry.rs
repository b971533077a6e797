use std::collections::HashMap;

use parking_lot::Mutex;

use super::ConnectionId;

pub type RoomId = String;

/// In-memory bookkeeping of which connections are in which rooms.
///
/// Rooms materialize on first join and disappear once the last member leaves;
/// nothing here is persisted. Mutations happen under one lock that is never
/// held across an await, so handlers observe the registry atomically.
#[derive(Default)]
pub struct RoomRegistry {
    state: Mutex<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    /// Members per room, in join order
    members: HashMap<RoomId, Vec<ConnectionId>>,
    /// Reverse index, owned here rather than borrowed from the transport
    rooms_by_connection: HashMap<ConnectionId, Vec<RoomId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds the connection to the room, returning the members that were
    /// already in it. Does nothing if it is already a member.
    ///
    /// The prior-member snapshot and the insertion happen under one lock, so
    /// two connections joining at the same time cannot both miss each other.
    pub fn join(&self, connection: ConnectionId, room_id: &str) -> Vec<ConnectionId> {
        let mut state = self.state.lock();

        let members = state.members.entry(room_id.to_string()).or_default();
        let existing: Vec<_> = members
            .iter()
            .copied()
            .filter(|c| *c != connection)
            .collect();

        if !members.contains(&connection) {
            members.push(connection);
        }

        let rooms = state.rooms_by_connection.entry(connection).or_default();
        if !rooms.iter().any(|r| r == room_id) {
            rooms.push(room_id.to_string());
        }

        existing
    }

    /// Removes the connection from the room, collecting the room if it is
    /// now empty.
    pub fn leave(&self, connection: ConnectionId, room_id: &str) {
        let mut state = self.state.lock();

        let room_emptied = state
            .members
            .get_mut(room_id)
            .map(|members| {
                members.retain(|c| *c != connection);
                members.is_empty()
            })
            .unwrap_or(false);

        if room_emptied {
            state.members.remove(room_id);
        }

        let connection_emptied = state
            .rooms_by_connection
            .get_mut(&connection)
            .map(|rooms| {
                rooms.retain(|r| r != room_id);
                rooms.is_empty()
            })
            .unwrap_or(false);

        if connection_emptied {
            state.rooms_by_connection.remove(&connection);
        }
    }

    /// Current members of the room, in join order. Empty for unknown rooms.
    pub fn members_of(&self, room_id: &str) -> Vec<ConnectionId> {
        self.state
            .lock()
            .members
            .get(room_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Rooms the connection is currently a member of
    pub fn rooms_of(&self, connection: ConnectionId) -> Vec<RoomId> {
        self.state
            .lock()
            .rooms_by_connection
            .get(&connection)
            .cloned()
            .unwrap_or_default()
    }

    /// Removes the connection from every room it is in, returning the rooms it
    /// was a member of at the moment of removal.
    pub fn drop_connection(&self, connection: ConnectionId) -> Vec<RoomId> {
        let mut state = self.state.lock();

        let rooms = state
            .rooms_by_connection
            .remove(&connection)
            .unwrap_or_default();

        for room_id in &rooms {
            let room_emptied = state
                .members
                .get_mut(room_id)
                .map(|members| {
                    members.retain(|c| *c != connection);
                    members.is_empty()
                })
                .unwrap_or(false);

            if room_emptied {
                state.members.remove(room_id);
            }
        }

        rooms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_is_idempotent() {
        let registry = RoomRegistry::new();
        let connection = ConnectionId::new();

        registry.join(connection, "algebra");
        registry.join(connection, "algebra");

        assert_eq!(registry.members_of("algebra"), vec![connection]);
        assert_eq!(registry.rooms_of(connection), vec!["algebra".to_string()]);
    }

    #[test]
    fn join_returns_the_prior_members() {
        let registry = RoomRegistry::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();

        assert!(registry.join(a, "algebra").is_empty());
        assert_eq!(registry.join(b, "algebra"), vec![a]);

        // Rejoining reports the others, never the joiner itself
        assert_eq!(registry.join(b, "algebra"), vec![a]);
    }

    #[test]
    fn members_match_net_joins() {
        let registry = RoomRegistry::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();

        registry.join(a, "algebra");
        registry.join(b, "algebra");
        registry.leave(a, "algebra");
        registry.join(a, "algebra");
        registry.leave(b, "algebra");

        assert_eq!(registry.members_of("algebra"), vec![a]);
    }

    #[test]
    fn empty_rooms_are_collected() {
        let registry = RoomRegistry::new();
        let connection = ConnectionId::new();

        registry.join(connection, "algebra");
        registry.leave(connection, "algebra");

        assert!(registry.members_of("algebra").is_empty());
        assert!(registry.rooms_of(connection).is_empty());
    }

    #[test]
    fn dropping_returns_the_membership_snapshot() {
        let registry = RoomRegistry::new();
        let connection = ConnectionId::new();

        registry.join(connection, "algebra");
        registry.join(connection, "geometry");

        let mut rooms = registry.drop_connection(connection);
        rooms.sort();

        assert_eq!(rooms, vec!["algebra".to_string(), "geometry".to_string()]);
        assert!(registry.members_of("algebra").is_empty());
        assert!(registry.members_of("geometry").is_empty());
    }
}
