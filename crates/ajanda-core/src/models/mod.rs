//! Data models for Ajanda

mod note;
mod notification;
mod session;

pub use note::NoteRecord;
pub use notification::{
    format_occurs_at, parse_occurs_at, to_local_instant, NotificationDraft, NotificationId,
    NotificationRecord,
};
pub use session::{AuthSession, Credentials, UserInfo};
