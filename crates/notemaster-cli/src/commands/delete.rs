use notemaster_core::controller::DeleteConfirmation;

use crate::commands::common::{
    build_controller, open_session, parse_note_id, prompt_confirmation, select_note,
};
use crate::error::CliError;

pub async fn run_delete(id: &str, assume_yes: bool, global_profile: Option<&str>) -> Result<(), CliError> {
    let note_id = parse_note_id(id)?;
    let (controller, _profile_name) = build_controller(global_profile)?;
    open_session(&controller).await?;
    let note = select_note(&controller, note_id)?;

    if !assume_yes && !prompt_confirmation(&format!("Delete note {} \"{}\"?", note.id, note.title))? {
        return Err(CliError::DeleteCancelled);
    }

    if let Some(deleted) = controller
        .delete_selected(DeleteConfirmation::confirmed())
        .await?
    {
        println!("{deleted}");
    }
    Ok(())
}
