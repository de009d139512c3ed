use std::io::Write;

use xnote_core::NoteId;

use crate::commands::common::{
    format_note_detail, format_note_lines, note_to_list_item, Context, NoteListItem,
};
use crate::error::CliError;

pub async fn run_list(
    context: &Context,
    search: Option<&str>,
    as_json: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    context.store.list().await?;
    let notes = context.store.filter(search.unwrap_or_default());

    if as_json {
        let json_items = notes
            .iter()
            .map(note_to_list_item)
            .collect::<Vec<NoteListItem>>();
        writeln!(out, "{}", serde_json::to_string_pretty(&json_items)?)?;
    } else if notes.is_empty() {
        writeln!(out, "No notes found.")?;
    } else {
        for line in format_note_lines(&notes) {
            writeln!(out, "{line}")?;
        }
    }

    Ok(())
}

pub async fn run_show(context: &Context, id: NoteId, out: &mut impl Write) -> Result<(), CliError> {
    let dialog = context.dialog();
    let note = context.open_note(&dialog, id).await?;
    writeln!(out, "{}", format_note_detail(&note))?;
    Ok(())
}
