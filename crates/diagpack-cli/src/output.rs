//! Confirmation rendering.

use std::io::Write;

use anyhow::anyhow;
use clap::ValueEnum;
use serde_json::json;

use crate::client::{CliError, CliResult};

pub(crate) const SUCCESS_MESSAGE: &str = "Report is successfully created";

/// Format of the message printed after a successful command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub(crate) fn render_confirmation<W>(format: OutputFormat, out: &mut W) -> CliResult<()>
where
    W: Write + ?Sized,
{
    let line = match format {
        OutputFormat::Text => SUCCESS_MESSAGE.to_string(),
        OutputFormat::Json => serde_json::to_string(&json!({ "msg": SUCCESS_MESSAGE }))
            .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?,
    };
    writeln!(out, "{line}")
        .map_err(|err| CliError::failure(anyhow!("failed to write output: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn text_confirmation_is_plain_line() -> Result<()> {
        let mut out = Vec::new();
        render_confirmation(OutputFormat::Text, &mut out)
            .map_err(|err| anyhow!(err.display_message()))?;
        assert_eq!(String::from_utf8(out)?, "Report is successfully created\n");
        Ok(())
    }

    #[test]
    fn json_confirmation_wraps_message() -> Result<()> {
        let mut out = Vec::new();
        render_confirmation(OutputFormat::Json, &mut out)
            .map_err(|err| anyhow!(err.display_message()))?;
        let value: serde_json::Value = serde_json::from_slice(&out)?;
        assert_eq!(value, json!({"msg": SUCCESS_MESSAGE}));
        Ok(())
    }
}
