use std::io::{self, BufRead, IsTerminal, Read, Write};

use chrono::Utc;
use notemaster_core::controller::{ControllerError, ControllerSnapshot, NotesController};
use notemaster_core::models::{Note, NoteId};
use notemaster_core::HttpNoteService;
use serde::Serialize;

use crate::auth::KeyringTokenStore;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub type Controller = NotesController<HttpNoteService>;

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: i64,
    pub title: String,
    pub preview: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
    pub relative_time: String,
    pub selected: bool,
}

/// Controller wired to the profile's API URL and keychain entry, not yet bootstrapped.
pub fn build_controller(global_profile: Option<&str>) -> Result<(Controller, String), CliError> {
    let config = CliProfilesConfig::load()?;
    let profile_name = config.resolve_profile_name(global_profile);
    let client_config = config.client_config(&profile_name)?;
    let service = HttpNoteService::from_config(&client_config).map_err(notemaster_core::Error::from)?;
    tracing::debug!(
        "Using profile '{}' against {}",
        profile_name,
        service.base_url()
    );
    let controller = NotesController::new(service, KeyringTokenStore::new(&profile_name));
    Ok((controller, profile_name))
}

/// Restore the stored session and load the first page of notes.
///
/// Query changes made before calling this are applied to that first fetch.
pub async fn open_session(controller: &Controller) -> Result<ControllerSnapshot, CliError> {
    if controller.bootstrap().await.is_none() {
        return Err(CliError::NotSignedIn);
    }
    loaded_snapshot(controller)
}

/// Current snapshot, or the error the last operation left behind.
pub fn loaded_snapshot(controller: &Controller) -> Result<ControllerSnapshot, CliError> {
    let snapshot = controller.snapshot();
    if !snapshot.is_authenticated() {
        return Err(CliError::NotSignedIn);
    }
    if let Some(message) = snapshot.error.clone() {
        return Err(ControllerError::FetchFailed(message).into());
    }
    Ok(snapshot)
}

/// Select a note from the loaded list and return it.
pub fn select_note(controller: &Controller, id: NoteId) -> Result<Note, CliError> {
    if !controller.select(id) {
        return Err(CliError::NoteNotFound(id));
    }
    controller
        .snapshot()
        .selected_note()
        .cloned()
        .ok_or(CliError::NoteNotFound(id))
}

pub fn parse_note_id(raw: &str) -> Result<NoteId, CliError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyNoteId);
    }
    trimmed
        .parse()
        .map_err(|_| CliError::InvalidNoteId(trimmed.to_string()))
}

pub fn format_note_lines(snapshot: &ControllerSnapshot) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    snapshot
        .notes
        .iter()
        .map(|note| {
            let marker = if snapshot.selected_id == Some(note.id) {
                '*'
            } else {
                ' '
            };
            let title = truncate_chars(&collapse_whitespace(&note.title), 40);
            let preview = note_preview(note, 40);
            let relative_time = format_relative_time(note.updated_at.timestamp_millis(), now_ms);

            if preview.is_empty() {
                format!(
                    "{marker} {:>6}  {title:<40}  {relative_time}",
                    note.id.get()
                )
            } else {
                format!(
                    "{marker} {:>6}  {title:<40}  {relative_time:<10}  {preview}",
                    note.id.get()
                )
            }
        })
        .collect()
}

pub fn note_to_list_item(note: &Note, selected: bool) -> NoteListItem {
    let now_ms = Utc::now().timestamp_millis();
    NoteListItem {
        id: note.id.get(),
        title: note.title.clone(),
        preview: note_preview(note, 80),
        content: note.content.clone(),
        created_at: note.created_at.to_rfc3339(),
        updated_at: note.updated_at.to_rfc3339(),
        relative_time: format_relative_time(note.updated_at.timestamp_millis(), now_ms),
        selected,
    }
}

pub fn render_note(note: &Note) -> String {
    let mut rendered = format!(
        "# {}\n\nid: {}\ncreated: {}\nupdated: {}\n",
        note.title,
        note.id,
        note.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        note.updated_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );
    if !note.content.is_empty() {
        rendered.push('\n');
        rendered.push_str(&note.content);
        rendered.push('\n');
    }
    rendered
}

pub fn note_preview(note: &Note, max_chars: usize) -> String {
    let first_line = note.content.lines().next().unwrap_or("");
    truncate_chars(&collapse_whitespace(first_line), max_chars)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = text.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Explicit value first, then piped stdin.
pub fn resolve_content(explicit: Option<String>) -> Result<Option<String>, CliError> {
    if explicit.is_some() {
        return Ok(explicit);
    }
    read_piped_stdin()
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    let trimmed = buffer.trim_end_matches(['\n', '\r']);
    if trimmed.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

pub fn prompt_confirmation(question: &str) -> Result<bool, CliError> {
    let mut stderr = io::stderr();
    write!(stderr, "{question} [y/N] ")?;
    stderr.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_affirmative(&answer))
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
