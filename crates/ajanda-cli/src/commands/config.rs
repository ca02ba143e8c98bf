use std::env;

use ajanda_core::util::is_http_url;

use crate::cli::ConfigCommands;
use crate::config_profiles::{normalize_text_option, CliProfile, CliProfilesConfig};
use crate::error::CliError;
use crate::keychain::{load_api_password, save_api_password};

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            api_base_url,
            period_year,
            branch_name,
            api_username,
            api_password,
            page_size,
            timeout_secs,
            prefetch_concurrency,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            ProfileInput {
                api_base_url,
                period_year,
                branch_name,
                api_username,
                api_password,
                page_size,
                timeout_secs,
                prefetch_concurrency,
            },
            no_activate,
        ),
    }
}

/// Values given on the command line for `config init`.
#[derive(Debug, Default)]
pub struct ProfileInput {
    pub api_base_url: Option<String>,
    pub period_year: Option<String>,
    pub branch_name: Option<String>,
    pub api_username: Option<String>,
    pub api_password: Option<String>,
    pub page_size: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub prefetch_concurrency: Option<usize>,
}

pub fn run_config_init(
    profile_name: Option<&str>,
    input: ProfileInput,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing_profile = config.profile(&profile_name).cloned().unwrap_or_default();

    let merged = merge_profile(&existing_profile, &input, |name| env::var(name).ok());
    validate_profile(&merged)?;
    *config.profile_mut_or_default(&profile_name) = merged;

    let api_password = normalize_text_option(input.api_password)
        .or_else(|| normalize_text_option(env::var("AJANDA_API_PASSWORD").ok()));
    if let Some(secret) = api_password.as_deref() {
        save_api_password(&profile_name, secret)?;
    }

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let profile = config
        .profiles
        .get(&profile_name)
        .ok_or_else(|| CliError::Config("Failed to persist profile".to_string()))?;
    let mut missing_fields = Vec::new();
    if profile.api_username.is_none() {
        missing_fields.push("api_username");
    }
    if load_api_password(&profile_name)?.is_none() {
        missing_fields.push("api_password");
    }
    if missing_fields.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Run `ajanda auth login --tax-id <id> --username <name> --password <password>`."
        );
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    }

    Ok(())
}

/// Explicit value, then `AJANDA_*` environment variable, then the stored
/// profile, per field.
pub fn merge_profile(
    existing: &CliProfile,
    input: &ProfileInput,
    lookup_env: impl Fn(&str) -> Option<String>,
) -> CliProfile {
    let pick = |explicit: &Option<String>, env_name: &str, stored: &Option<String>| {
        normalize_text_option(explicit.clone())
            .or_else(|| normalize_text_option(lookup_env(env_name)))
            .or_else(|| normalize_text_option(stored.clone()))
    };
    CliProfile {
        api_base_url: pick(
            &input.api_base_url,
            "AJANDA_API_BASE_URL",
            &existing.api_base_url,
        ),
        period_year: pick(
            &input.period_year,
            "AJANDA_PERIOD_YEAR",
            &existing.period_year,
        ),
        branch_name: pick(
            &input.branch_name,
            "AJANDA_BRANCH_NAME",
            &existing.branch_name,
        ),
        api_username: pick(
            &input.api_username,
            "AJANDA_API_USERNAME",
            &existing.api_username,
        ),
        page_size: input
            .page_size
            .or(existing.page_size)
            .filter(|size| *size > 0),
        timeout_secs: input
            .timeout_secs
            .or(existing.timeout_secs)
            .filter(|secs| *secs > 0),
        prefetch_concurrency: input
            .prefetch_concurrency
            .or(existing.prefetch_concurrency)
            .filter(|count| *count > 0),
    }
}

pub fn validate_profile(profile: &CliProfile) -> Result<(), CliError> {
    if let Some(url) = profile.api_base_url.as_deref() {
        if !is_http_url(url) {
            return Err(CliError::Config(
                "api_base_url must include http:// or https://".to_string(),
            ));
        }
    }
    if let Some(year) = profile.period_year.as_deref() {
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(CliError::Config(format!(
                "period_year must be a four-digit year, got '{year}'"
            )));
        }
    }
    Ok(())
}
