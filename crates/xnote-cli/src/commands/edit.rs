use std::io::Write;

use xnote_core::dialog::DialogEvent;
use xnote_core::{Error, NoteId};

use crate::commands::common::Context;
use crate::error::CliError;

pub async fn run_add(
    context: &Context,
    title: &str,
    content: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let dialog = context.dialog();
    dialog.open_for_create()?;
    dialog.update_draft(|draft| {
        draft.title = title.to_string();
        draft.content = content.to_string();
    })?;

    match dialog.submit().await? {
        DialogEvent::Created(note) => writeln!(out, "{}", note.id)?,
        other => tracing::warn!(?other, "Unexpected dialog event after create"),
    }
    Ok(())
}

pub async fn run_edit(
    context: &Context,
    id: NoteId,
    title: Option<&str>,
    content: Option<&str>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    if title.is_none() && content.is_none() {
        return Err(CliError::NothingToEdit);
    }

    let dialog = context.dialog();
    context.open_note(&dialog, id).await?;
    dialog.begin_edit()?;
    dialog.update_draft(|draft| {
        if let Some(title) = title {
            draft.title = title.to_string();
        }
        if let Some(content) = content {
            draft.content = content.to_string();
        }
    })?;

    match dialog.submit().await {
        Ok(DialogEvent::Updated(note)) => writeln!(out, "{}", note.id)?,
        Ok(other) => tracing::warn!(?other, "Unexpected dialog event after edit"),
        Err(error) if error.is_not_found() => return Err(CliError::NoteNotFound(id)),
        Err(error) => return Err(error.into()),
    }
    Ok(())
}

pub async fn run_delete(
    context: &Context,
    id: NoteId,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let dialog = context.dialog();
    context.open_note(&dialog, id).await?;

    match dialog.delete().await {
        Ok(_) => writeln!(out, "{id}")?,
        Err(Error::NotFound(_)) => return Err(CliError::NoteNotFound(id)),
        Err(error) => return Err(error.into()),
    }
    Ok(())
}
