use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use lectern_collab::{ClientEvent, ConnectionId, Outbound, ServerEvent, Signaling};
use log::{debug, info};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::context::ServerContext;

/// Accepts persistent connections and routes their events through the
/// signaling layer.
///
/// Note that no verified identity is attached to a connection; whatever a
/// client claims in chat is relayed as-is.
pub struct Gateway {
    signaling: Signaling,
    connections: Mutex<HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl Gateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            signaling: Signaling::new(),
            connections: Default::default(),
        })
    }

    /// Registers a new connection, returning its id
    fn connect(&self, sender: mpsc::UnboundedSender<ServerEvent>) -> ConnectionId {
        let id = ConnectionId::new();
        self.connections.lock().insert(id, sender);

        info!("Connection {} established", id);
        id
    }

    /// Tears a connection down. Departure notices go out first, while the
    /// membership bookkeeping is still intact.
    fn disconnect(&self, id: ConnectionId) {
        let outbound = self.signaling.disconnect(id);
        self.deliver(outbound);

        self.connections.lock().remove(&id);
        info!("Connection {} closed", id);
    }

    fn handle_event(&self, id: ConnectionId, event: ClientEvent) {
        let outbound = self.signaling.handle(id, event);
        self.deliver(outbound);
    }

    /// Sends an event to a single connection. Best-effort; a connection that
    /// already closed just drops the message.
    pub fn send_to(&self, connection: ConnectionId, event: ServerEvent) {
        if let Some(sender) = self.connections.lock().get(&connection) {
            let _ = sender.send(event);
        }
    }

    /// Sends an event to every member of a room, except the given connections
    pub fn broadcast_to_room(&self, room_id: &str, event: ServerEvent, excluding: &[ConnectionId]) {
        for member in self.signaling.registry().members_of(room_id) {
            if !excluding.contains(&member) {
                self.send_to(member, event.clone());
            }
        }
    }

    fn deliver(&self, outbound: Vec<Outbound>) {
        for message in outbound {
            self.send_to(message.to, message.event);
        }
    }
}

pub async fn gateway_handler(
    ws: WebSocketUpgrade,
    State(context): State<ServerContext>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, context.gateway))
}

async fn handle_socket(socket: WebSocket, gateway: Arc<Gateway>) {
    let (mut sink, mut stream) = socket.split();
    let (sender, mut receiver) = mpsc::unbounded_channel();

    let id = gateway.connect(sender);

    // Drain outbound events into the socket, preserving their order
    let writer = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            let text = serde_json::to_string(&event).expect("serializes properly");

            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => gateway.handle_event(id, event),
                // Malformed frames are dropped without a reply
                Err(err) => debug!("Connection {} sent a malformed event: {}", id, err),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    gateway.disconnect(id);
    writer.abort();
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fake_connection(gateway: &Gateway) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (gateway.connect(sender), receiver)
    }

    fn drain(receiver: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn chat_is_delivered_to_the_whole_room() {
        let gateway = Gateway::new();
        let (a, mut a_rx) = fake_connection(&gateway);
        let (b, mut b_rx) = fake_connection(&gateway);

        for connection in [a, b] {
            gateway.handle_event(
                connection,
                ClientEvent::JoinLiveClass {
                    room_id: "class-1".to_string(),
                },
            );
        }

        gateway.handle_event(
            a,
            ClientEvent::LiveChatMessage {
                room_id: "class-1".to_string(),
                message: "hello".to_string(),
                user: json!({"name": "Ada"}),
            },
        );

        for events in [drain(&mut a_rx), drain(&mut b_rx)] {
            assert!(events
                .iter()
                .any(|e| matches!(e, ServerEvent::NewMessage { message, .. } if message == "hello")));
        }
    }

    #[tokio::test]
    async fn dropped_connections_still_notify_their_rooms() {
        let gateway = Gateway::new();
        let (dropped, _dropped_rx) = fake_connection(&gateway);
        let (peer, mut peer_rx) = fake_connection(&gateway);

        for connection in [dropped, peer] {
            gateway.handle_event(
                connection,
                ClientEvent::JoinLiveClass {
                    room_id: "class-1".to_string(),
                },
            );
        }

        drain(&mut peer_rx);
        gateway.disconnect(dropped);

        let notices: Vec<_> = drain(&mut peer_rx)
            .into_iter()
            .filter(|e| {
                matches!(e, ServerEvent::UserDisconnected { connection_id } if *connection_id == dropped)
            })
            .collect();

        assert_eq!(notices.len(), 1);
        assert!(gateway.signaling.registry().members_of("class-1").contains(&peer));
    }

    #[tokio::test]
    async fn broadcasts_can_exclude_connections() {
        let gateway = Gateway::new();
        let (a, mut a_rx) = fake_connection(&gateway);
        let (b, mut b_rx) = fake_connection(&gateway);

        for connection in [a, b] {
            gateway.handle_event(
                connection,
                ClientEvent::JoinLiveClass {
                    room_id: "class-1".to_string(),
                },
            );
        }

        drain(&mut a_rx);
        drain(&mut b_rx);

        gateway.broadcast_to_room(
            "class-1",
            ServerEvent::UserConnected { connection_id: a },
            &[a],
        );

        assert!(drain(&mut a_rx).is_empty());
        assert_eq!(drain(&mut b_rx).len(), 1);
    }
}
