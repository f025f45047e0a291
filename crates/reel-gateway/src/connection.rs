use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use reel_types::events::RoomCommand;

use crate::dispatcher::{ConnectionId, Dispatcher};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Drive one authenticated realtime connection until it closes.
///
/// The bearer token was checked at the HTTP upgrade, so the socket goes
/// straight into the event loop. Whatever ends the loop, the connection is
/// removed from every room it joined.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, user_id: Uuid, name: String) {
    let (mut sender, mut receiver) = socket.split();
    let (conn_id, mut events) = dispatcher.register().await;

    info!("{} ({}) connected to gateway as {}", name, user_id, conn_id);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward room events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            error!("Failed to encode {}: {}", event.name(), e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read room commands from client
    let dispatcher_recv = dispatcher.clone();
    let name_recv = name.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<RoomCommand>(&text) {
                    Ok(cmd) => handle_command(&dispatcher_recv, conn_id, cmd).await,
                    Err(e) => {
                        warn!(
                            "{} ({}) bad command: {} -- raw: {}",
                            name_recv,
                            user_id,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    let rooms = dispatcher.disconnect(conn_id).await;
    info!("{} ({}) disconnected from gateway, left {} rooms", name, user_id, rooms);
}

async fn handle_command(dispatcher: &Dispatcher, conn_id: ConnectionId, cmd: RoomCommand) {
    match cmd {
        RoomCommand::JoinPartyRoom { party_id } => {
            dispatcher
                .join_room(conn_id, party_id.as_deref().unwrap_or_default())
                .await;
        }
        RoomCommand::LeavePartyRoom { party_id } => {
            dispatcher
                .leave_room(conn_id, party_id.as_deref().unwrap_or_default())
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commands_drive_room_membership() {
        let dispatcher = Dispatcher::new();
        let (conn, _rx) = dispatcher.register().await;

        handle_command(
            &dispatcher,
            conn,
            RoomCommand::JoinPartyRoom { party_id: Some("party-1".into()) },
        )
        .await;
        assert_eq!(dispatcher.rooms_of(conn).await, vec!["party-1".to_string()]);

        handle_command(&dispatcher, conn, RoomCommand::JoinPartyRoom { party_id: None }).await;
        assert_eq!(dispatcher.rooms_of(conn).await.len(), 1);

        handle_command(
            &dispatcher,
            conn,
            RoomCommand::LeavePartyRoom { party_id: Some("party-1".into()) },
        )
        .await;
        assert!(dispatcher.rooms_of(conn).await.is_empty());
    }
}
