use notemaster_core::models::{Note, NoteDraft};

use crate::commands::common::{
    build_controller, open_session, parse_note_id, resolve_content, select_note,
};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    title: Option<String>,
    content: Option<String>,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let note_id = parse_note_id(id)?;
    let content = resolve_content(content)?;
    if title.is_none() && content.is_none() {
        return Err(CliError::NothingToEdit);
    }

    let (controller, _profile_name) = build_controller(global_profile)?;
    open_session(&controller).await?;
    let note = select_note(&controller, note_id)?;

    let draft = apply_edits(&note, title, content);
    if draft == NoteDraft::from_note(&note) {
        println!("{}", note.id);
        return Ok(());
    }

    let updated = controller.save(Some(&note), &draft).await?;
    println!("{}", updated.id);
    Ok(())
}

/// Start from the stored values and replace only what was given.
pub fn apply_edits(note: &Note, title: Option<String>, content: Option<String>) -> NoteDraft {
    let mut draft = NoteDraft::from_note(note);
    if let Some(title) = title {
        draft.title = title;
    }
    if let Some(content) = content {
        draft.content = content;
    }
    draft
}
