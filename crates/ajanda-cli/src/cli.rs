use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "ajanda")]
#[command(about = "Agenda reminders from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional directory for the local session store
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// CLI profile name
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List reminders, starred first
    List {
        /// Only names containing this text (case-insensitive)
        #[arg(long, value_name = "TEXT")]
        name: Option<String>,
        /// Earliest date, dd.mm.yyyy
        #[arg(long, value_name = "DATE")]
        from: Option<String>,
        /// Latest date, dd.mm.yyyy
        #[arg(long, value_name = "DATE")]
        to: Option<String>,
        /// Only reminders entered by this user
        #[arg(long, value_name = "NAME")]
        user: Option<String>,
        /// all, completed or pending
        #[arg(long, default_value = "all")]
        status: String,
        /// Number of reminders to show
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Print the distinct entered-by names instead of reminders
        #[arg(long, conflicts_with_all = ["name", "from", "to", "user", "limit"])]
        users: bool,
    },
    /// Create a reminder
    #[command(alias = "new")]
    Add(AddArgs),
    /// Edit an existing reminder
    Edit {
        /// Reminder id
        id: i64,
        #[command(flatten)]
        changes: EditArgs,
    },
    /// Delete a reminder
    Delete {
        /// Reminder id
        id: i64,
    },
    /// Star or unstar a reminder
    Star {
        /// Reminder id
        id: i64,
    },
    /// Show or change the note attached to a reminder
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Days with reminders, or the reminders of one day
    Calendar {
        /// Day to show, dd.mm.yyyy
        #[arg(long, value_name = "DATE")]
        day: Option<String>,
    },
    /// Keep alarms armed and print reminders as they fire
    Watch {
        /// Seconds between refreshes
        #[arg(long, default_value = "300", value_name = "SECONDS")]
        interval: u64,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Sign in to the agenda backend
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(clap::Args)]
pub struct AddArgs {
    /// Company name
    #[arg(long)]
    pub company: String,
    /// Contact full name
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long)]
    pub mobile: String,
    #[arg(long)]
    pub description: String,
    /// When the reminder fires, dd.mm.yyyy HH:MM
    #[arg(long, value_name = "DATETIME")]
    pub at: String,
    /// Entered-by name (defaults to the signed-in user)
    #[arg(long, value_name = "NAME")]
    pub user: Option<String>,
    /// Mark the reminder as completed
    #[arg(long)]
    pub completed: bool,
}

#[derive(clap::Args, Default)]
pub struct EditArgs {
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub mobile: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// New time, dd.mm.yyyy HH:MM
    #[arg(long, value_name = "DATETIME")]
    pub at: Option<String>,
    #[arg(long, value_name = "NAME")]
    pub user: Option<String>,
    /// Mark completed
    #[arg(long, conflicts_with = "pending")]
    pub completed: bool,
    /// Mark pending
    #[arg(long)]
    pub pending: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum NoteCommands {
    /// Print the note of a reminder
    Show {
        /// Reminder id
        id: i64,
    },
    /// Attach a note (reads stdin or opens $EDITOR when no text is given)
    Add {
        /// Reminder id
        id: i64,
        /// Note text
        text: Vec<String>,
    },
    /// Replace the note text (opens $EDITOR when no text is given)
    Edit {
        /// Reminder id
        id: i64,
        /// New note text
        text: Vec<String>,
    },
    /// Remove the note of a reminder
    Delete {
        /// Reminder id
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Backend base URL
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Accounting period year sent at login
        #[arg(long, value_name = "YEAR")]
        period_year: Option<String>,
        /// Branch name sent at login
        #[arg(long, value_name = "NAME")]
        branch_name: Option<String>,
        /// API client user name
        #[arg(long, value_name = "NAME")]
        api_username: Option<String>,
        /// API client password (stored in the OS keychain)
        #[arg(long, value_name = "PASSWORD")]
        api_password: Option<String>,
        /// Records requested per list page
        #[arg(long, value_name = "N")]
        page_size: Option<u32>,
        /// HTTP request timeout
        #[arg(long, value_name = "SECONDS")]
        timeout_secs: Option<u64>,
        /// Notes fetched in parallel after each refresh
        #[arg(long, value_name = "N")]
        prefetch_concurrency: Option<usize>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in and store the session token in the keychain
    Login {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Company tax id
        #[arg(long, value_name = "ID")]
        tax_id: String,
        #[arg(long, value_name = "NAME")]
        username: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
        /// Save credentials for automatic sign-in
        #[arg(long)]
        remember_me: bool,
    },
    /// Show auth status for profile
    Status {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Clear the stored session
    Logout {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}
