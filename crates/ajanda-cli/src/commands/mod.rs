pub mod add;
pub mod auth_cmd;
pub mod calendar;
pub mod common;
pub mod completions;
pub mod config;
pub mod delete;
pub mod edit;
pub mod list;
pub mod note;
pub mod star;
pub mod watch;
