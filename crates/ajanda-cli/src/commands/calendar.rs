use crate::commands::common::{format_day, format_record_lines, parse_day, CommandContext};
use crate::error::CliError;

pub async fn run_calendar(day: Option<&str>, context: &CommandContext) -> Result<(), CliError> {
    let day = day.map(parse_day).transpose()?;
    let reconciler = context.loaded_reconciler().await?;

    if let Some(day) = day {
        let records = reconciler.records_on(day);
        if records.is_empty() {
            println!("No reminders on {}", format_day(day));
        }
        for line in format_record_lines(&records, &reconciler.priority_ids()) {
            println!("{line}");
        }
    } else {
        for date in reconciler.dates_with_records() {
            let count = reconciler.records_on(date).len();
            println!("{}  {count}", format_day(date));
        }
    }
    Ok(())
}
