use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, info};
use uuid::Uuid;

use rabbit_types::ChatId;
use rabbit_types::api::{
    ChatListResponse, ChatMessagesResponse, ChatTurn, MessageResponse, PublicChatRequest,
    PublicChatResponse, SendChatRequest, SendChatResponse,
};
use rabbit_types::models::{ConversationMessage, Role, timestamp_now};

use crate::auth::AppState;
use crate::middleware::AuthUser;
use crate::{blocking, reply};

const GUEST_HISTORY_TURNS: usize = 20;

fn chat_id_param(raw: String) -> Result<ChatId, StatusCode> {
    ChatId::parse(raw).map_err(|_| StatusCode::BAD_REQUEST)
}

pub async fn list_chats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, StatusCode> {
    let chats = blocking(move || state.store.get_chat_list(&auth.username)).await?;
    Ok(Json(ChatListResponse { chats }))
}

/// Soft-delete a chat. Deleting twice is not an error.
pub async fn delete_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let chat_id = chat_id_param(chat_id)?;

    let username = auth.username.clone();
    let target = chat_id.clone();
    let newly_deleted = blocking(move || state.store.add_deleted_chat(&username, &target)).await?;
    if newly_deleted {
        info!("User {} deleted chat {}", auth.username, chat_id);
    }

    Ok(Json(MessageResponse { success: true, message: "Chat deleted successfully".into() }))
}

pub async fn get_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let chat_id = chat_id_param(chat_id)?;

    let messages = blocking(move || {
        if state.store.is_chat_deleted(&auth.username, &chat_id)? {
            return Ok(None);
        }
        state.store.get_conversations(&auth.username, Some(&chat_id)).map(Some)
    })
    .await?
    .ok_or(StatusCode::GONE)?;

    Ok(Json(ChatMessagesResponse { messages }))
}

/// Record the user's message and the assistant's reply in one thread.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SendChatRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let content = req.message.trim().to_string();
    if content.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let chat_id = match req.chat_id.filter(|id| !id.is_empty()) {
        Some(raw) => chat_id_param(raw)?,
        None => ChatId::generate(),
    };

    let response = reply::respond(&content).to_string();

    let user_message = ConversationMessage {
        id: Uuid::new_v4().to_string(),
        chat_id: chat_id.clone(),
        role: Role::User,
        content,
        timestamp: timestamp_now(),
    };
    let assistant_message = ConversationMessage {
        id: Uuid::new_v4().to_string(),
        chat_id: chat_id.clone(),
        role: Role::Assistant,
        content: response.clone(),
        timestamp: timestamp_now(),
    };

    let username = auth.username.clone();
    blocking(move || {
        state.store.add_conversation(&username, &user_message)?;
        state.store.add_conversation(&username, &assistant_message)
    })
    .await?;

    Ok(Json(SendChatResponse { response, chat_id, username: auth.username.to_string() }))
}

/// Chat for visitors without an account. Nothing is stored.
pub async fn public_chat(
    Json(req): Json<PublicChatRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let history = guest_history(&req.history);
    debug!("Guest chat message with {} prior turns", history.len());

    Ok(Json(PublicChatResponse { response: reply::respond(message).to_string() }))
}

/// The last user/assistant turns a guest sent along, oldest first.
fn guest_history(turns: &[ChatTurn]) -> Vec<(Role, &str)> {
    let valid: Vec<(Role, &str)> = turns.iter().filter_map(ChatTurn::parsed).collect();
    let skip = valid.len().saturating_sub(GUEST_HISTORY_TURNS);
    valid.into_iter().skip(skip).collect()
}
