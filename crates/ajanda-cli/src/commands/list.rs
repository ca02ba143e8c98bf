use ajanda_core::{NotificationFilter, StatusFilter};

use crate::commands::common::{
    format_record_lines, parse_optional_day, record_to_list_item, CommandContext,
    ReminderListItem,
};
use crate::config_profiles::normalize_text_option;
use crate::error::CliError;

pub struct ListOptions {
    pub name: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub user: Option<String>,
    pub status: String,
    pub limit: Option<usize>,
    pub json: bool,
    pub users: bool,
}

pub fn build_filter(options: &ListOptions) -> Result<NotificationFilter, CliError> {
    Ok(NotificationFilter {
        name_query: normalize_text_option(options.name.clone()),
        from: parse_optional_day(options.from.as_deref())?,
        to: parse_optional_day(options.to.as_deref())?,
        entered_by: normalize_text_option(options.user.clone()),
        status: options.status.parse::<StatusFilter>()?,
    })
}

pub async fn run_list(options: &ListOptions, context: &CommandContext) -> Result<(), CliError> {
    let filter = build_filter(options)?;
    let reconciler = context.loaded_reconciler().await?;

    if options.users {
        let names = reconciler.entered_by_names();
        if options.json {
            println!("{}", serde_json::to_string_pretty(&names)?);
        } else {
            for name in names {
                println!("{name}");
            }
        }
        return Ok(());
    }

    let mut records = reconciler.filtered_sorted(&filter);
    if let Some(limit) = options.limit {
        records.truncate(limit);
    }
    let priority_ids = reconciler.priority_ids();

    if options.json {
        let json_items = records
            .iter()
            .map(|record| record_to_list_item(record, &priority_ids))
            .collect::<Vec<ReminderListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_record_lines(&records, &priority_ids) {
            println!("{line}");
        }
    }

    Ok(())
}
