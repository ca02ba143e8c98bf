use std::collections::BTreeSet;
use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ajanda_core::config::DEFAULT_PAGE_SIZE;
use ajanda_core::models::NotificationId;
use ajanda_core::{
    AlarmScheduler, AlarmSink, AuthService, GatewayConfig, HttpGateway, JsonFileStore,
    NotificationReconciler, NotificationRecord, ScheduledAlarm, TokioAlarmPlatform,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::config_profiles::{
    default_data_dir, normalize_text_option, CliProfile, CliProfilesConfig,
};
use crate::error::CliError;
use crate::keychain::{load_api_password, KeychainStore};

pub const DAY_FORMAT: &str = "%d.%m.%Y";
pub const DATE_TIME_FORMAT: &str = "%d.%m.%Y %H:%M";
const SESSION_FILE_NAME: &str = "session.json";

pub type ProfileStore = KeychainStore<JsonFileStore>;
pub type CliReconciler =
    NotificationReconciler<HttpGateway, TokioAlarmPlatform<ConsoleSink>, ProfileStore>;

/// Prints fired alarms to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl AlarmSink for ConsoleSink {
    fn deliver(&self, alarm: &ScheduledAlarm) {
        tracing::info!(id = alarm.id, "Alarm fired");
        println!("[{}] #{}", alarm.title, alarm.id);
        for line in alarm.body().lines() {
            println!("  {line}");
        }
    }
}

/// Everything a command needs for one profile: backend client and the
/// local session store.
pub struct CommandContext {
    pub profile_name: String,
    pub profile: CliProfile,
    pub gateway: Arc<HttpGateway>,
    pub store: ProfileStore,
}

impl CommandContext {
    pub fn load(profile: Option<&str>, data_dir: Option<&Path>) -> Result<Self, CliError> {
        let config = CliProfilesConfig::load().map_err(CliError::Config)?;
        let profile_name = config.resolve_profile_name(profile);
        let profile = config.profile(&profile_name).cloned().unwrap_or_default();

        let api_password = load_api_password(&profile_name)?
            .or_else(|| normalize_text_option(env::var("AJANDA_API_PASSWORD").ok()));
        let mut gateway_config =
            GatewayConfig::new(profile.api_base_url(), profile.tenant(api_password))?;
        if let Some(page_size) = profile.page_size {
            gateway_config = gateway_config.with_page_size(page_size);
        }
        if let Some(secs) = profile.timeout_secs {
            gateway_config = gateway_config.with_timeout(Duration::from_secs(secs));
        }
        let gateway = Arc::new(HttpGateway::new(gateway_config)?);

        let data_dir = resolve_data_dir(data_dir.map(Path::to_path_buf))?;
        let file_store =
            JsonFileStore::open(data_dir.join(&profile_name).join(SESSION_FILE_NAME))?;
        let store = KeychainStore::new(&profile_name, file_store);

        tracing::debug!(profile = %profile_name, "Loaded CLI profile");
        Ok(Self {
            profile_name,
            profile,
            gateway,
            store,
        })
    }

    pub fn auth(&self) -> AuthService<HttpGateway, ProfileStore> {
        AuthService::new(Arc::clone(&self.gateway), self.store.clone())
    }

    pub fn page_size(&self) -> u32 {
        self.profile.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Reconciler with alarms delivered to the console.
    ///
    /// Signs in with remembered credentials when the stored token is missing
    /// or expired.
    pub async fn reconciler(&self) -> Result<CliReconciler, CliError> {
        if self.auth().ensure_session().await?.is_none() {
            return Err(CliError::NotSignedIn);
        }

        let platform = TokioAlarmPlatform::new(ConsoleSink)?;
        let scheduler = Arc::new(AlarmScheduler::new(platform));
        let mut reconciler =
            NotificationReconciler::new(Arc::clone(&self.gateway), scheduler, self.store.clone())?
                .with_page_size(self.page_size());
        if let Some(concurrency) = self.profile.prefetch_concurrency {
            reconciler = reconciler.with_prefetch_concurrency(concurrency);
        }
        Ok(reconciler)
    }

    /// Reconciler holding a freshly loaded record list.
    pub async fn loaded_reconciler(&self) -> Result<CliReconciler, CliError> {
        let reconciler = self.reconciler().await?;
        reconciler.refresh().await?;
        Ok(reconciler)
    }
}

pub fn resolve_data_dir(cli_data_dir: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(dir) =
        cli_data_dir.or_else(|| env::var_os("AJANDA_DATA_DIR").map(PathBuf::from))
    {
        return Ok(dir);
    }
    default_data_dir().map_err(CliError::Config)
}

pub fn find_record(
    reconciler: &CliReconciler,
    id: NotificationId,
) -> Result<NotificationRecord, CliError> {
    reconciler.record(id).ok_or(CliError::RecordNotFound(id))
}

pub fn parse_day(raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw.trim(), DAY_FORMAT)
        .map_err(|_| CliError::InvalidDate(raw.to_string()))
}

pub fn parse_optional_day(raw: Option<&str>) -> Result<Option<NaiveDate>, CliError> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(parse_day)
        .transpose()
}

pub fn parse_date_time(raw: &str) -> Result<NaiveDateTime, CliError> {
    NaiveDateTime::parse_from_str(raw.trim(), DATE_TIME_FORMAT)
        .map_err(|_| CliError::InvalidDateTime(raw.to_string()))
}

pub fn format_day(date: NaiveDate) -> String {
    date.format(DAY_FORMAT).to_string()
}

pub fn format_occurs_at(record: &NotificationRecord) -> String {
    record.occurs_at_local().map_or_else(
        || "-".to_string(),
        |value| value.format(DATE_TIME_FORMAT).to_string(),
    )
}

#[derive(Debug, Serialize)]
pub struct ReminderListItem {
    pub id: NotificationId,
    pub starred: bool,
    pub company: String,
    pub full_name: String,
    pub phone: String,
    pub mobile: String,
    pub description: String,
    pub occurs_at: Option<String>,
    pub completed: bool,
    pub entered_by: String,
}

pub fn record_to_list_item(
    record: &NotificationRecord,
    priority_ids: &BTreeSet<NotificationId>,
) -> ReminderListItem {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    ReminderListItem {
        id: record.id,
        starred: priority_ids.contains(&record.id),
        company: text(&record.company),
        full_name: text(&record.full_name),
        phone: text(&record.phone),
        mobile: text(&record.mobile),
        description: text(&record.description),
        occurs_at: record.occurs_at.clone(),
        completed: record.is_completed(),
        entered_by: text(&record.entered_by),
    }
}

pub fn format_record_lines(
    records: &[NotificationRecord],
    priority_ids: &BTreeSet<NotificationId>,
) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let star = if priority_ids.contains(&record.id) {
                '*'
            } else {
                ' '
            };
            let when = format_occurs_at(record);
            let company = preview(record.company.as_deref().unwrap_or(""), 20);
            let name = preview(record.full_name.as_deref().unwrap_or(""), 20);
            let status = if record.is_completed() { "done" } else { "open" };
            format!(
                "{star} {:>6}  {when:<16}  {company:<20}  {name:<20}  {status}",
                record.id
            )
        })
        .collect()
}

pub fn preview(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

/// Note text from arguments, piped stdin or the editor, in that order.
pub fn resolve_note_text(text_parts: &[String], initial: &str) -> Result<String, CliError> {
    if let Some(text) = normalize_content(&text_parts.join(" ")) {
        return Ok(text);
    }

    if let Some(text) = read_piped_stdin()? {
        return Ok(text);
    }

    if let Some(text) = capture_editor_input_with_initial(initial)? {
        return Ok(text);
    }

    Err(CliError::EmptyNoteText)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_note_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let note_content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&note_content))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let mut command = Command::new(program);
            command.args(parts).arg(file_path);

            let status = command.status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_note_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("ajanda-note-{}-{now}.txt", std::process::id()))
}
