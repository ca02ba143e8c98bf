use ajanda_core::models::NotificationId;
use ajanda_core::NoteRecord;

use crate::cli::NoteCommands;
use crate::commands::common::{resolve_note_text, CliReconciler, CommandContext};
use crate::error::CliError;

pub async fn run_note(command: NoteCommands, context: &CommandContext) -> Result<(), CliError> {
    let reconciler = context.reconciler().await?;
    match command {
        NoteCommands::Show { id } => {
            let note = reconciler
                .get_note(id)
                .await?
                .ok_or(CliError::NoteNotFound(id))?;
            if !note_belongs_to(&note, id) {
                tracing::warn!(
                    record = id,
                    note = note.id,
                    parent = ?note.parent_record_id(),
                    "Backend returned a note attached to another record"
                );
            }
            println!("{}", note.text_or_empty());
        }
        NoteCommands::Add { id, text } => {
            let text = resolve_note_text(&text, "")?;
            let note = reconciler.add_note(id, &text).await?;
            println!("{}", note.id);
        }
        NoteCommands::Edit { id, text } => {
            let current = load_note_text(&reconciler, id).await?;
            let text = resolve_note_text(&text, &current)?;
            if text == current {
                println!("{id}");
                return Ok(());
            }
            let note = reconciler.update_note(id, &text).await?;
            println!("{}", note.id);
        }
        NoteCommands::Delete { id } => {
            load_note_text(&reconciler, id).await?;
            reconciler.delete_note(id).await?;
            println!("{id}");
        }
    }
    Ok(())
}

/// Notes without a numeric parent id are taken at face value.
pub fn note_belongs_to(note: &NoteRecord, id: NotificationId) -> bool {
    note.parent_record_id().is_none_or(|parent| parent == id)
}

/// Fetch the note so later edits target the backend's note id.
async fn load_note_text(reconciler: &CliReconciler, id: i64) -> Result<String, CliError> {
    reconciler
        .get_note(id)
        .await?
        .map(|note| note.text_or_empty().to_string())
        .ok_or(CliError::NoteNotFound(id))
}
