use notemaster_core::auth::{Credentials, Registration};

use crate::cli::AuthCommands;
use crate::commands::common::build_controller;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let (controller, profile_name) = build_controller(global_profile)?;
    match command {
        AuthCommands::Register {
            username,
            email,
            password,
        } => {
            let registration = Registration::new(username, email, password);
            let user = controller
                .register(&registration)
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?;
            println!(
                "Registered and signed in profile '{profile_name}' as {}",
                user.username
            );
            Ok(())
        }
        AuthCommands::Login { username, password } => {
            let credentials = Credentials::new(username, password);
            let user = controller
                .login(&credentials)
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?;
            println!("Signed in profile '{profile_name}' as {}", user.username);
            Ok(())
        }
        AuthCommands::Status => {
            if let Some(user) = controller.bootstrap().await {
                println!(
                    "Profile '{}' is signed in as {} <{}> ({})",
                    profile_name,
                    user.username,
                    user.email,
                    controller.service().base_url()
                );
            } else {
                println!("Profile '{profile_name}' is not signed in.");
            }
            Ok(())
        }
        AuthCommands::Logout => {
            controller.logout();
            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
    }
}
