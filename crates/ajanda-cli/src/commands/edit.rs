use ajanda_core::models::format_occurs_at;
use ajanda_core::NotificationRecord;

use crate::cli::EditArgs;
use crate::commands::common::{find_record, parse_date_time, CommandContext};
use crate::error::CliError;

/// Apply the given flags to `record`; unspecified fields keep their value.
pub fn apply_changes(
    record: &NotificationRecord,
    changes: EditArgs,
) -> Result<NotificationRecord, CliError> {
    let mut edited = record.clone();
    if let Some(at) = changes.at.as_deref() {
        edited.occurs_at = Some(format_occurs_at(parse_date_time(at)?));
    }
    let replace = |field: &mut Option<String>, value: Option<String>| {
        if let Some(value) = value {
            *field = Some(value.trim().to_string());
        }
    };
    replace(&mut edited.company, changes.company);
    replace(&mut edited.full_name, changes.name);
    replace(&mut edited.phone, changes.phone);
    replace(&mut edited.mobile, changes.mobile);
    replace(&mut edited.description, changes.description);
    replace(&mut edited.entered_by, changes.user);
    if changes.completed {
        edited.is_read = Some(true);
    } else if changes.pending {
        edited.is_read = Some(false);
    }
    Ok(edited)
}

pub async fn run_edit(
    id: i64,
    changes: EditArgs,
    context: &CommandContext,
) -> Result<(), CliError> {
    let reconciler = context.loaded_reconciler().await?;
    let record = find_record(&reconciler, id)?;
    let edited = apply_changes(&record, changes)?;

    if edited == record {
        println!("{}", record.id);
        return Ok(());
    }

    reconciler.update(&edited).await?;
    println!("{}", edited.id);
    Ok(())
}
