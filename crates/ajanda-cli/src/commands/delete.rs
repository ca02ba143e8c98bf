use crate::commands::common::{find_record, CommandContext};
use crate::error::CliError;

pub async fn run_delete(id: i64, context: &CommandContext) -> Result<(), CliError> {
    let reconciler = context.loaded_reconciler().await?;
    let record = find_record(&reconciler, id)?;

    reconciler.delete(&record).await?;
    println!("{}", record.id);
    Ok(())
}
