use ajanda_core::NotificationDraft;

use crate::cli::AddArgs;
use crate::commands::common::{parse_date_time, CommandContext};
use crate::error::CliError;

pub fn build_draft(
    args: AddArgs,
    session_user: Option<String>,
) -> Result<NotificationDraft, CliError> {
    Ok(NotificationDraft {
        occurs_at: Some(parse_date_time(&args.at)?),
        company: args.company,
        full_name: args.name,
        phone: args.phone,
        mobile: args.mobile,
        description: args.description,
        entered_by: args.user.or(session_user).unwrap_or_default(),
        completed: args.completed,
    })
}

pub async fn run_add(args: AddArgs, context: &CommandContext) -> Result<(), CliError> {
    let reconciler = context.reconciler().await?;
    let session_user = context
        .auth()
        .current_session()?
        .and_then(|session| session.user.user_name);
    let draft = build_draft(args, session_user)?;

    match reconciler.create(draft).await? {
        Some(created) => println!("{}", created.id),
        None => println!("Created"),
    }
    if let Some(error) = reconciler.last_error() {
        tracing::warn!(%error, "Reminder list could not be reloaded");
    }
    Ok(())
}
