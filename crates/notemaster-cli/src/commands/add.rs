use notemaster_core::models::NoteDraft;

use crate::commands::common::{build_controller, open_session, resolve_content};
use crate::error::CliError;

pub async fn run_add(
    title: String,
    content: Option<String>,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let content = resolve_content(content)?.unwrap_or_default();
    let (controller, _profile_name) = build_controller(global_profile)?;
    open_session(&controller).await?;

    let note = controller.save(None, &NoteDraft::new(title, content)).await?;
    println!("{}", note.id);
    Ok(())
}
