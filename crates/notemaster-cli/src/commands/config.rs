use notemaster_core::util::normalize_text_option;
use notemaster_core::ClientConfig;

use crate::cli::ConfigCommands;
use crate::config_profiles::{default_config_path, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            api_url,
            no_activate,
        } => run_config_init(profile.as_deref().or(global_profile), api_url, no_activate),
        ConfigCommands::Show => run_config_show(global_profile),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    api_url: Option<String>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load()?;
    let profile_name = config.resolve_profile_name(profile_name);
    init_profile(&mut config, &profile_name, api_url, no_activate)?;
    let path = config.save()?;

    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );
    let client = config.client_config(&profile_name)?;
    println!(
        "Profile '{profile_name}' uses {}. Run `notemaster auth login --username <name> --password <password>`.",
        client.api_base_url
    );
    Ok(())
}

/// Apply `config init` values to an in-memory config.
pub fn init_profile(
    config: &mut CliProfilesConfig,
    profile_name: &str,
    api_url: Option<String>,
    no_activate: bool,
) -> Result<(), CliError> {
    let profile = config.profile_mut_or_default(profile_name);
    if let Some(url) = normalize_text_option(api_url) {
        profile.api_base_url = Some(ClientConfig::new(url)?.api_base_url);
    }

    if !no_activate {
        config.active_profile = Some(profile_name.to_string());
    }
    Ok(())
}

pub fn run_config_show(global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load()?;
    let profile_name = config.resolve_profile_name(global_profile);
    let client = config.client_config(&profile_name)?;

    println!("config:  {}", default_config_path()?.display());
    println!("profile: {profile_name}");
    println!(
        "active:  {}",
        config.active_profile.as_deref().unwrap_or("(none)")
    );
    println!("api url: {}", client.api_base_url);
    if config.profile(&profile_name).is_none() {
        println!("Profile '{profile_name}' is not configured; using defaults.");
    }
    Ok(())
}
