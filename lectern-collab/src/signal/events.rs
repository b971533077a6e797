use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ConnectionId, RoomId};

/// Events clients send over a gateway connection.
///
/// Session descriptions and ICE candidates are opaque payloads; the server
/// relays them without inspection.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    JoinLiveClass { room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    LeaveLiveClass { room_id: RoomId },
    /// The user field is client-asserted and not verified against any
    /// authenticated identity
    #[serde(rename_all = "camelCase")]
    LiveChatMessage {
        room_id: RoomId,
        message: String,
        user: Value,
    },
    #[serde(rename_all = "camelCase")]
    Offer { room_id: RoomId, offer: Value },
    #[serde(rename_all = "camelCase")]
    Answer { room_id: RoomId, answer: Value },
    #[serde(rename_all = "camelCase")]
    IceCandidate { room_id: RoomId, candidate: Value },
}

/// Events the server emits to gateway connections
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// A new participant joined the room, so peers can start negotiating
    /// toward it
    #[serde(rename_all = "camelCase")]
    UserConnected { connection_id: ConnectionId },
    /// A participant left the room, explicitly or by dropping its connection
    #[serde(rename_all = "camelCase")]
    UserDisconnected { connection_id: ConnectionId },
    #[serde(rename_all = "camelCase")]
    NewMessage { message: String, user: Value },
    #[serde(rename_all = "camelCase")]
    Offer { offer: Value, sender_id: ConnectionId },
    #[serde(rename_all = "camelCase")]
    Answer { answer: Value, sender_id: ConnectionId },
    #[serde(rename_all = "camelCase")]
    IceCandidate {
        candidate: Value,
        sender_id: ConnectionId,
    },
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn client_events_parse_from_the_wire_vocabulary() {
        let join: ClientEvent =
            serde_json::from_str(r#"{"type":"join-live-class","roomId":"class-1"}"#).unwrap();
        assert!(matches!(join, ClientEvent::JoinLiveClass { room_id } if room_id == "class-1"));

        let chat: ClientEvent = serde_json::from_str(
            r#"{"type":"live-chat-message","roomId":"class-1","message":"hi","user":{"name":"Ada"}}"#,
        )
        .unwrap();
        assert!(matches!(chat, ClientEvent::LiveChatMessage { .. }));

        let candidate: ClientEvent = serde_json::from_str(
            r#"{"type":"ice-candidate","roomId":"class-1","candidate":{"sdpMid":"0"}}"#,
        )
        .unwrap();
        assert!(matches!(candidate, ClientEvent::IceCandidate { .. }));
    }

    #[test]
    fn relayed_events_carry_the_sender_id() {
        let sender = ConnectionId::new();

        let event = ServerEvent::Offer {
            offer: json!({"sdp": "v=0"}),
            sender_id: sender,
        };

        let wire: Value = serde_json::to_value(&event).unwrap();
        assert_eq!(wire["type"], "offer");
        assert_eq!(wire["senderId"], sender.to_string());
        assert_eq!(wire["offer"]["sdp"], "v=0");
    }

    #[test]
    fn malformed_events_fail_to_parse() {
        let unknown = serde_json::from_str::<ClientEvent>(r#"{"type":"unknown-event"}"#);
        assert!(unknown.is_err());

        let missing_room = serde_json::from_str::<ClientEvent>(r#"{"type":"join-live-class"}"#);
        assert!(missing_room.is_err());
    }
}
