//! HTTP 路由
//!
//! 路由形状沿用既有前端依赖的接口：频道管理、消息发送/历史、
//! 用户管理，以及 WebSocket 升级入口。

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use domain::entities::{Channel, ChatMessage, User};

use crate::{error::ApiError, state::AppState, ws_connection};

#[derive(Debug, Deserialize)]
struct CreateUserPayload {
    username: String,
}

#[derive(Debug, Deserialize)]
struct StartChannelPayload {
    user_id: Uuid,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SendMessagePayload {
    channel_id: Uuid,
    sender_id: Uuid,
    message: String,
}

#[derive(Debug, Deserialize)]
struct EditMessagePayload {
    message: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", post(create_user))
        .route("/users/{id}", get(find_user).put(update_user).delete(delete_user))
        .route("/chat", post(start_channel).get(list_channels))
        .route(
            "/chat/{id}/user/{user_id}",
            post(add_user_to_channel).delete(remove_user_from_channel),
        )
        .route("/chat/message", post(send_message))
        .route("/chat/message/{id}", put(edit_message).delete(delete_message))
        .route("/chat/channel/{id}", get(get_channel_history))
        .route("/ws/chat/{id}/user/{user_id}", get(websocket_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = User::new(payload.username)?;
    let user = state.users.create(user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn find_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("user {id}")))?;
    Ok(Json(user))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<Json<User>, ApiError> {
    let mut user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("user {id}")))?;
    user.rename(payload.username)?;
    let user = state.users.update(user).await?;
    Ok(Json(user))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn start_channel(
    State(state): State<AppState>,
    Json(payload): Json<StartChannelPayload>,
) -> Result<(StatusCode, Json<Channel>), ApiError> {
    let channel = state
        .chat_service
        .start_channel(payload.user_id, payload.name)
        .await?;
    Ok((StatusCode::CREATED, Json(channel)))
}

async fn list_channels(State(state): State<AppState>) -> Result<Json<Vec<Channel>>, ApiError> {
    Ok(Json(state.chat_service.list_channels().await?))
}

async fn add_user_to_channel(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state.chat_service.add_user_to_channel(id, user_id).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "success" }))))
}

async fn remove_user_from_channel(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    state
        .chat_service
        .remove_user_from_channel(id, user_id)
        .await?;
    Ok(Json(json!({ "message": "success" })))
}

async fn send_message(
    State(state): State<AppState>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    let message = state
        .chat_service
        .send_message(payload.channel_id, payload.sender_id, payload.message)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn edit_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EditMessagePayload>,
) -> Result<Json<ChatMessage>, ApiError> {
    let message = state.chat_service.edit_message(id, payload.message).await?;
    Ok(Json(message))
}

async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.chat_service.delete_message(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_channel_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(state.chat_service.get_channel_history(id).await?))
}

async fn websocket_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Response {
    ws.on_upgrade(move |socket: WebSocket| ws_connection::serve(socket, state, id, user_id))
}
