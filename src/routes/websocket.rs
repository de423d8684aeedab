use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    models::child::{ChildProfile, ProfileEvent, SyncState},
    services::children::ChildService,
    services::metrics::WATCHERS_GAUGE,
    AppState,
};

/// GET /children/{id}/watch — live profile watcher.
///
/// Emits `{sync_state, profile}` events: one snapshot on connect, then one
/// event per profile update. Eventually consistent, last-write-observed-wins;
/// closing the socket cancels the subscription.
pub async fn watch_child(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(child_id): Path<Uuid>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, child_id))
}

fn event_text(sync_state: SyncState, profile: Option<ChildProfile>) -> String {
    serde_json::to_string(&ProfileEvent { sync_state, profile })
        .unwrap_or_else(|_| r#"{"sync_state":"error","profile":null}"#.to_string())
}

async fn handle_socket(mut socket: WebSocket, state: AppState, child_id: Uuid) {
    // Initial snapshot straight from the store.
    let child = match ChildService::get(&state.db, child_id).await {
        Ok(Some(child)) => child,
        Ok(None) => {
            let _ = socket
                .send(Message::Text(event_text(SyncState::Error, None).into()))
                .await;
            return;
        }
        Err(e) => {
            error!("watcher snapshot failed for child {child_id}: {e}");
            let _ = socket
                .send(Message::Text(event_text(SyncState::Error, None).into()))
                .await;
            return;
        }
    };

    // Dedicated pub/sub connection for the live feed. Without one the
    // snapshot is still served, flagged as offline.
    let channel = ChildService::profile_channel(child_id);
    let mut pubsub = match state.redis_client.get_async_pubsub().await {
        Ok(c) => c,
        Err(e) => {
            warn!("watcher pubsub unavailable: {e}");
            let _ = socket
                .send(Message::Text(
                    event_text(SyncState::Offline, Some(child)).into(),
                ))
                .await;
            return;
        }
    };
    if let Err(e) = pubsub.subscribe(&channel).await {
        error!("watcher subscribe error on {channel}: {e}");
        let _ = socket
            .send(Message::Text(
                event_text(SyncState::Offline, Some(child)).into(),
            ))
            .await;
        return;
    }

    if socket
        .send(Message::Text(
            event_text(SyncState::Synced, Some(child)).into(),
        ))
        .await
        .is_err()
    {
        return;
    }

    info!("watcher connected for child {child_id}");
    WATCHERS_GAUGE.inc();

    let (mut sender, mut receiver) = socket.split();

    // Redis Pub/Sub → WebSocket
    let mut redis_task = tokio::spawn(async move {
        let mut pubsub_stream = pubsub.on_message();
        while let Some(msg) = pubsub_stream.next().await {
            let payload: String = match msg.get_payload() {
                Ok(p) => p,
                Err(_) => continue,
            };
            let text = match serde_json::from_str::<ChildProfile>(&payload) {
                Ok(profile) => event_text(SyncState::Synced, Some(profile)),
                Err(_) => event_text(SyncState::Error, None),
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Drain the client side; a Close frame ends the watch.
    let mut client_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => break,
                Message::Ping(_) => {}
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut redis_task) => client_task.abort(),
        _ = (&mut client_task) => redis_task.abort(),
    }

    WATCHERS_GAUGE.dec();
    info!("watcher disconnected for child {child_id}");
}
