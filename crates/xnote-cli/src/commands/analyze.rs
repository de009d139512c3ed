use std::io::Write;

use xnote_core::NoteId;

use crate::commands::common::{not_loaded_to_missing, Context};
use crate::error::CliError;

pub async fn run_analyze(
    context: &Context,
    id: NoteId,
    out: &mut impl Write,
) -> Result<(), CliError> {
    context.store.list().await?;
    let sentiment = context
        .analysis()
        .analyze(id)
        .await
        .map_err(|error| match error {
            xnote_core::Error::NotFound(_) => CliError::NoteNotFound(id),
            other => not_loaded_to_missing(other, id),
        })?;
    writeln!(out, "{id}: {sentiment}")?;
    Ok(())
}
