use std::path::Path;

use chrono::Utc;

use crate::cli::AuthCommands;
use crate::commands::common::CommandContext;
use crate::error::CliError;

pub async fn run_auth(
    command: AuthCommands,
    global_profile: Option<&str>,
    data_dir: Option<&Path>,
) -> Result<(), CliError> {
    match command {
        AuthCommands::Login {
            profile,
            tax_id,
            username,
            password,
            remember_me,
        } => {
            let context = CommandContext::load(profile.as_deref().or(global_profile), data_dir)?;
            let session = context
                .auth()
                .login(&tax_id, &username, &password, remember_me)
                .await?;
            let user_label = session.user.user_name.as_deref().unwrap_or(username.trim());
            println!(
                "Signed in profile '{}' as {}",
                context.profile_name, user_label
            );
            Ok(())
        }
        AuthCommands::Status { profile } => {
            let context = CommandContext::load(profile.as_deref().or(global_profile), data_dir)?;
            let auth = context.auth();
            if let Some(session) = auth.current_session()? {
                let user_label = session.user.user_name.as_deref().unwrap_or("(unknown user)");
                println!(
                    "Profile '{}' is signed in as {}",
                    context.profile_name, user_label
                );
                if let Some(expires_at) = session.expires_at.as_deref() {
                    if session.is_expired_at(Utc::now()) {
                        println!("Session expired at {expires_at}.");
                    } else {
                        println!("Session expires at {expires_at}.");
                    }
                }
            } else {
                println!("Profile '{}' is not signed in.", context.profile_name);
            }
            if auth.credentials().remember_me()? {
                println!("Remember me is on.");
            }
            Ok(())
        }
        AuthCommands::Logout { profile } => {
            let context = CommandContext::load(profile.as_deref().or(global_profile), data_dir)?;
            context.auth().logout()?;
            println!("Signed out profile '{}'", context.profile_name);
            Ok(())
        }
    }
}
