use notemaster_core::models::SortKey;

use crate::commands::common::{
    build_controller, format_note_lines, note_to_list_item, open_session, NoteListItem,
};
use crate::error::CliError;

pub async fn run_list(
    search: Option<&str>,
    sort: SortKey,
    limit: Option<u32>,
    as_json: bool,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let (controller, _profile_name) = build_controller(global_profile)?;

    // Signed out, these only record the query; the bootstrap fetch uses it.
    controller.set_limit(limit);
    controller.set_sort_key(sort).await?;
    if let Some(term) = search {
        controller.set_search_term(term.trim()).await?;
    }
    let snapshot = open_session(&controller).await?;

    if as_json {
        let json_items = snapshot
            .notes
            .iter()
            .map(|note| note_to_list_item(note, snapshot.selected_id == Some(note.id)))
            .collect::<Vec<NoteListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if snapshot.notes.is_empty() {
        println!("No notes found.");
    } else {
        for line in format_note_lines(&snapshot) {
            println!("{line}");
        }
    }

    Ok(())
}
