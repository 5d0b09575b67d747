use crate::commands::common::{
    build_controller, note_to_list_item, open_session, parse_note_id, render_note, select_note,
};
use crate::error::CliError;

pub async fn run_show(id: &str, as_json: bool, global_profile: Option<&str>) -> Result<(), CliError> {
    let note_id = parse_note_id(id)?;
    let (controller, _profile_name) = build_controller(global_profile)?;
    open_session(&controller).await?;
    let note = select_note(&controller, note_id)?;

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&note_to_list_item(&note, true))?
        );
    } else {
        print!("{}", render_note(&note));
    }
    Ok(())
}
