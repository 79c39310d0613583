//! Shared client utilities and error types for the CLI.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use anyhow::anyhow;
use diagpack_bundle::{BundleError, ErrorKind};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use url::Url;

use crate::cli::Cli;

pub(crate) const HEADER_API_KEY: &str = "x-diagpack-api-key";
pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<BundleError> for CliError {
    fn from(error: BundleError) -> Self {
        match error.kind() {
            ErrorKind::Validation => Self::validation(error.to_string()),
            _ => Self::failure(error),
        }
    }
}

/// Dependencies constructed from CLI options and environment fallbacks.
#[derive(Clone)]
pub(crate) struct CliDependencies {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
}

impl CliDependencies {
    /// Build the HTTP client shared by every backend call of this invocation.
    ///
    /// Only connection establishment is bounded; log streams may take as long
    /// as they need.
    pub(crate) fn from_cli(cli: &Cli, trace_id: &str) -> CliResult<Self> {
        let api_key = parse_api_key(cli.api_key.clone())?;

        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            CliError::failure(anyhow!("trace identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);
        if let Some(credential) = api_key {
            let mut value = HeaderValue::from_str(&credential.header_value())
                .map_err(|_| CliError::validation("API key contains invalid characters"))?;
            value.set_sensitive(true);
            default_headers.insert(HEADER_API_KEY, value);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(cli.connect_timeout))
            .default_headers(default_headers)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: cli.api_url.clone(),
        })
    }
}

/// API key credential parsed from CLI flags or environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ApiKeyCredential {
    pub(crate) key_id: String,
    pub(crate) secret: String,
}

impl ApiKeyCredential {
    #[must_use]
    pub(crate) fn header_value(&self) -> String {
        format!("{}:{}", self.key_id, self.secret)
    }
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Parse the API key provided to the CLI.
pub(crate) fn parse_api_key(input: Option<String>) -> CliResult<Option<ApiKeyCredential>> {
    let Some(raw) = input else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    let (key_id, secret) = trimmed
        .split_once(':')
        .ok_or_else(|| CliError::validation("API key must be provided as key_id:secret"))?;

    if key_id.trim().is_empty() || secret.trim().is_empty() {
        return Err(CliError::validation(
            "API key components cannot be empty strings",
        ));
    }

    Ok(Some(ApiKeyCredential {
        key_id: key_id.trim().to_string(),
        secret: secret.trim().to_string(),
    }))
}
