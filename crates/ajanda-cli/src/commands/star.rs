use crate::commands::common::CommandContext;
use crate::error::CliError;

pub async fn run_star(id: i64, context: &CommandContext) -> Result<(), CliError> {
    let reconciler = context.reconciler().await?;
    let starred = reconciler.toggle_priority(id)?.contains(&id);

    if starred {
        println!("Starred {id}");
    } else {
        println!("Unstarred {id}");
    }
    Ok(())
}
