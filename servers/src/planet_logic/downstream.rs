use crate::planet_logic::state::AppState;
use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use lib_planetwatch::{Subscription, Topic, WatcherError};
use serde::Deserialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WsParams {
    client_id: Option<String>,
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/ws/{planet}/{topic}", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}

pub async fn run(port: u16, app_state: AppState, shutdown: broadcast::Receiver<()>) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind downstream listener on {}", addr))?;
    log::info!("Downstream server listening on {}", addr);
    serve(listener, app_state, shutdown).await
}

pub async fn serve(listener: TcpListener, app_state: AppState, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
    axum::serve(listener, router(app_state))
        .with_graceful_shutdown(async move {
            shutdown.recv().await.ok();
            log::info!("Downstream server shutting down.");
        })
        .await
        .context("Downstream server failed")?;
    Ok(())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path((planet, topic)): Path<(String, String)>,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> Response {
    let topic = match topic.parse::<Topic>() {
        Ok(topic) => topic,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    // Subscribe before upgrading so the replay reflects the moment of the request
    let subscription = match state.watcher.subscribe(topic, &planet, params.client_id) {
        Ok(subscription) => subscription,
        Err(e @ WatcherError::UnknownPlanet(_)) => return (StatusCode::NOT_FOUND, e.to_string()).into_response(),
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    let shutdown = state.shutdown.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, subscription, shutdown))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let planets = state.watcher.pool().active_planets();
    Json(serde_json::json!({ "status": "ok", "planets": planets }))
}

async fn handle_socket(mut socket: WebSocket, mut subscription: Subscription, mut shutdown: broadcast::Receiver<()>) {
    log::info!(
        "Client {} streaming {} from '{}'",
        subscription.id(),
        subscription.topic(),
        subscription.planet()
    );

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Clients only listen; anything else they send is ignored
                Some(Ok(_)) => {}
            },
            event = subscription.next() => {
                let Some(event) = event else { break };
                match serde_json::to_string(&*event) {
                    Ok(json_str) => {
                        if socket.send(Message::Text(json_str.into())).await.is_err() {
                            break; // client disconnected
                        }
                    }
                    Err(e) => log::error!("Failed to serialize {} event: {}", event.topic, e),
                }
            }
            _ = shutdown.recv() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        }
    }

    subscription.close();
    log::info!("Client {} disconnected", subscription.id());
}
