use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use reel_types::events::RoomEvent;

/// Identity of one live connection. A user may hold several.
pub type ConnectionId = Uuid;

/// Where party events go once a state change is persisted.
///
/// `Dispatcher` delivers within this process. Running several server
/// processes needs an implementation backed by a shared pub/sub channel.
#[async_trait]
pub trait RoomPublisher: Send + Sync {
    /// Deliver `event` to every subscriber of `party_id`. Best effort;
    /// returns how many connections accepted it.
    async fn publish(&self, party_id: &str, event: RoomEvent) -> usize;
}

/// Tracks live connections and the party rooms they follow.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<RwLock<Registry>>,
}

#[derive(Default)]
struct Registry {
    /// Outbound queue per connection
    senders: HashMap<ConnectionId, mpsc::UnboundedSender<RoomEvent>>,

    /// party id -> subscribed connections
    rooms: HashMap<String, HashSet<ConnectionId>>,

    /// connection -> party ids, so disconnect can clean every room
    memberships: HashMap<ConnectionId, HashSet<String>>,
}

impl Registry {
    fn remove_from_room(&mut self, party_id: &str, conn_id: ConnectionId) -> bool {
        let Some(subscribers) = self.rooms.get_mut(party_id) else {
            return false;
        };
        let removed = subscribers.remove(&conn_id);
        if subscribers.is_empty() {
            self.rooms.remove(party_id);
        }
        removed
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection. Events for rooms it joins arrive on the
    /// returned receiver.
    pub async fn register(&self) -> (ConnectionId, mpsc::UnboundedReceiver<RoomEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.inner.write().await;
        registry.senders.insert(conn_id, tx);
        registry.memberships.insert(conn_id, HashSet::new());
        (conn_id, rx)
    }

    /// Subscribe a connection to a party room. Empty ids and unknown
    /// connections are ignored with a warning.
    pub async fn join_room(&self, conn_id: ConnectionId, party_id: &str) -> bool {
        let party_id = party_id.trim();
        if party_id.is_empty() {
            warn!("Connection {} tried to join a room without a party id", conn_id);
            return false;
        }

        let mut guard = self.inner.write().await;
        let registry = &mut *guard;
        let Some(memberships) = registry.memberships.get_mut(&conn_id) else {
            warn!("Unknown connection {} tried to join room {}", conn_id, party_id);
            return false;
        };
        memberships.insert(party_id.to_string());
        registry
            .rooms
            .entry(party_id.to_string())
            .or_default()
            .insert(conn_id);

        info!("Connection {} joined room {}", conn_id, party_id);
        true
    }

    pub async fn leave_room(&self, conn_id: ConnectionId, party_id: &str) -> bool {
        let party_id = party_id.trim();
        if party_id.is_empty() {
            return false;
        }

        let mut registry = self.inner.write().await;
        if let Some(memberships) = registry.memberships.get_mut(&conn_id) {
            memberships.remove(party_id);
        }
        let removed = registry.remove_from_room(party_id, conn_id);
        if removed {
            info!("Connection {} left room {}", conn_id, party_id);
        }
        removed
    }

    /// Forget a connection and drop it from every room it followed.
    /// Returns how many rooms it was removed from.
    pub async fn disconnect(&self, conn_id: ConnectionId) -> usize {
        let mut registry = self.inner.write().await;
        registry.senders.remove(&conn_id);
        let rooms = registry.memberships.remove(&conn_id).unwrap_or_default();
        for party_id in &rooms {
            registry.remove_from_room(party_id, conn_id);
        }
        debug!("Connection {} cleaned up from {} rooms", conn_id, rooms.len());
        rooms.len()
    }

    /// Fan an event out to one party's room. Events published for the same
    /// party reach each connection in publish order.
    pub async fn broadcast(&self, party_id: &str, event: RoomEvent) -> usize {
        let registry = self.inner.read().await;
        let Some(subscribers) = registry.rooms.get(party_id) else {
            debug!("No subscribers for {} in room {}", event.name(), party_id);
            return 0;
        };

        let mut delivered = 0;
        for conn_id in subscribers {
            match registry.senders.get(conn_id) {
                Some(tx) if tx.send(event.clone()).is_ok() => delivered += 1,
                _ => debug!("Dropping {} for closed connection {}", event.name(), conn_id),
            }
        }

        debug!("{} delivered to {} connections in room {}", event.name(), delivered, party_id);
        delivered
    }

    pub async fn room_size(&self, party_id: &str) -> usize {
        self.inner
            .read()
            .await
            .rooms
            .get(party_id)
            .map_or(0, HashSet::len)
    }

    /// Rooms a connection currently follows.
    pub async fn rooms_of(&self, conn_id: ConnectionId) -> Vec<String> {
        self.inner
            .read()
            .await
            .memberships
            .get(&conn_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RoomPublisher for Dispatcher {
    async fn publish(&self, party_id: &str, event: RoomEvent) -> usize {
        self.broadcast(party_id, event).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use reel_types::models::PartyView;

    use super::*;

    fn left(party_id: Uuid) -> RoomEvent {
        RoomEvent::Left {
            user_id: Uuid::new_v4(),
            user_name: "Ana".into(),
            party_id,
            party_deleted: false,
            party: None,
        }
    }

    fn joined(party_id: Uuid) -> RoomEvent {
        RoomEvent::Joined {
            user_id: Uuid::new_v4(),
            user_name: "Bia".into(),
            user_photo: None,
            party: PartyView {
                id: party_id,
                short_code: "ABC234".into(),
                title: "Friday".into(),
                host_id: Uuid::new_v4(),
                host: None,
                host_genres: vec![],
                members: vec![],
                movies: vec![],
                likes: vec![],
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn events_reach_only_the_room() {
        let dispatcher = Dispatcher::new();
        let party = Uuid::new_v4();
        let other = Uuid::new_v4();

        let (a, mut rx_a) = dispatcher.register().await;
        let (b, mut rx_b) = dispatcher.register().await;
        assert!(dispatcher.join_room(a, &party.to_string()).await);
        assert!(dispatcher.join_room(b, &other.to_string()).await);

        let delivered = dispatcher.broadcast(&party.to_string(), left(party)).await;
        assert_eq!(delivered, 1);
        assert!(matches!(rx_a.try_recv(), Ok(RoomEvent::Left { .. })));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_party_id_is_a_no_op() {
        let dispatcher = Dispatcher::new();
        let (conn, _rx) = dispatcher.register().await;
        assert!(!dispatcher.join_room(conn, "  ").await);
        assert!(dispatcher.rooms_of(conn).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_connection_cannot_join() {
        let dispatcher = Dispatcher::new();
        assert!(!dispatcher.join_room(Uuid::new_v4(), "party").await);
        assert_eq!(dispatcher.room_size("party").await, 0);
    }

    #[tokio::test]
    async fn leave_room_stops_delivery() {
        let dispatcher = Dispatcher::new();
        let party = Uuid::new_v4();
        let room = party.to_string();
        let (conn, mut rx) = dispatcher.register().await;

        dispatcher.join_room(conn, &room).await;
        assert!(dispatcher.leave_room(conn, &room).await);
        assert!(!dispatcher.leave_room(conn, &room).await);

        assert_eq!(dispatcher.broadcast(&room, left(party)).await, 0);
        assert!(rx.try_recv().is_err());
        assert_eq!(dispatcher.room_size(&room).await, 0);
    }

    #[tokio::test]
    async fn disconnect_cleans_every_room() {
        let dispatcher = Dispatcher::new();
        let (conn, _rx) = dispatcher.register().await;
        let (stay, _rx2) = dispatcher.register().await;

        dispatcher.join_room(conn, "p1").await;
        dispatcher.join_room(conn, "p2").await;
        dispatcher.join_room(stay, "p2").await;

        assert_eq!(dispatcher.disconnect(conn).await, 2);
        assert_eq!(dispatcher.room_size("p1").await, 0);
        assert_eq!(dispatcher.room_size("p2").await, 1);
        assert!(dispatcher.rooms_of(conn).await.is_empty());
        assert!(!dispatcher.join_room(conn, "p1").await);
    }

    #[tokio::test]
    async fn dropped_receivers_are_skipped() {
        let dispatcher = Dispatcher::new();
        let party = Uuid::new_v4();
        let room = party.to_string();

        let (gone, rx_gone) = dispatcher.register().await;
        let (live, mut rx_live) = dispatcher.register().await;
        dispatcher.join_room(gone, &room).await;
        dispatcher.join_room(live, &room).await;
        drop(rx_gone);

        assert_eq!(dispatcher.publish(&room, left(party)).await, 1);
        assert!(rx_live.try_recv().is_ok());
    }

    #[tokio::test]
    async fn per_room_order_is_preserved() {
        let dispatcher = Dispatcher::new();
        let party = Uuid::new_v4();
        let room = party.to_string();
        let (conn, mut rx) = dispatcher.register().await;
        dispatcher.join_room(conn, &room).await;

        dispatcher.broadcast(&room, joined(party)).await;
        dispatcher.broadcast(&room, left(party)).await;

        assert_eq!(rx.recv().await.unwrap().name(), "userJoinedPartyRealtime");
        assert_eq!(rx.recv().await.unwrap().name(), "userLeftPartyRealtime");
    }
}
