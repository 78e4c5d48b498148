use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use rabbit_types::api::{AddJournalRequest, AddMoodRequest, EntriesResponse, EntryResponse};
use rabbit_types::models::{JournalEntry, MoodEntry, timestamp_now};

use crate::auth::AppState;
use crate::blocking;
use crate::middleware::AuthUser;

fn entry_timestamp(requested: Option<String>) -> String {
    requested.filter(|t| !t.trim().is_empty()).unwrap_or_else(timestamp_now)
}

// -- Mood --

pub async fn add_mood(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<AddMoodRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let score = req.mood.score().ok_or(StatusCode::BAD_REQUEST)?;

    let entry = MoodEntry {
        id: Uuid::new_v4().to_string(),
        mood: score.to_string(),
        note: req.note.unwrap_or_default(),
        timestamp: entry_timestamp(req.timestamp),
    };

    let stored = entry.clone();
    blocking(move || state.store.add_mood_entry(&auth.username, &stored)).await?;

    Ok((StatusCode::CREATED, Json(EntryResponse { success: true, entry })))
}

pub async fn list_moods(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, StatusCode> {
    let entries = blocking(move || state.store.get_mood_entries(&auth.username)).await?;
    Ok(Json(EntriesResponse { entries }))
}

// -- Journal --

pub async fn add_journal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<AddJournalRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.content.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let entry = JournalEntry {
        id: Uuid::new_v4().to_string(),
        content: req.content,
        timestamp: entry_timestamp(req.timestamp),
    };

    let stored = entry.clone();
    blocking(move || state.store.add_journal_entry(&auth.username, &stored)).await?;

    Ok((StatusCode::CREATED, Json(EntryResponse { success: true, entry })))
}

pub async fn list_journals(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, StatusCode> {
    let entries = blocking(move || state.store.get_journal_entries(&auth.username)).await?;
    Ok(Json(EntriesResponse { entries }))
}
