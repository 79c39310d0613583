//! Identifier resolution.

use diagpack_core::{DiagnosticSource, OperationId};
use tracing::{debug, warn};

use crate::error::{BundleError, BundleResult};
use crate::model::{BundleRequest, ResolvedContext};

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Check that the request names a command, without touching the backend.
pub(crate) fn require_identifier(request: &BundleRequest) -> BundleResult<()> {
    if non_empty(request.operation_id.as_deref()).is_some()
        || non_empty(request.operation_name.as_deref()).is_some()
    {
        Ok(())
    } else {
        Err(missing_identifier())
    }
}

const fn missing_identifier() -> BundleError {
    BundleError::InvalidInput {
        field: "operation",
        reason: "an identifier must be provided",
        value: None,
    }
}

/// Turn the request's identifier into the operation id and file prefix.
///
/// An operation id is used as-is. A name is looked up through the backend and
/// kept as the prefix. When no command carries the name, a restore with that
/// name is checked so physical restores get a dedicated error.
///
/// # Errors
///
/// Returns a validation error when neither identifier is set,
/// [`BundleError::Unsupported`] for physical restores,
/// [`BundleError::NotFound`] when nothing matches, and a wrapped backend
/// error for any other lookup failure.
pub async fn resolve_context<S>(source: &S, request: &BundleRequest) -> BundleResult<ResolvedContext>
where
    S: DiagnosticSource + ?Sized,
{
    if let Some(id) = non_empty(request.operation_id.as_deref()) {
        return Ok(ResolvedContext::new(OperationId::new(id), id));
    }

    let Some(name) = non_empty(request.operation_name.as_deref()) else {
        return Err(missing_identifier());
    };

    match source.resolve_id_by_name(name).await {
        Ok(id) if id.is_empty() => Err(BundleError::NotFound {
            what: "command",
            value: Some(name.to_string()),
        }),
        Ok(id) => {
            debug!(name, operation_id = %id, "resolved command name");
            Ok(ResolvedContext::new(id, name))
        }
        Err(err) if err.is_not_found() => Err(classify_missing_command(source, name).await),
        Err(err) => Err(BundleError::backend("find operation id by name", err)),
    }
}

async fn classify_missing_command<S>(source: &S, name: &str) -> BundleError
where
    S: DiagnosticSource + ?Sized,
{
    match source.fetch_restore_by_name(name).await {
        Ok(restore) if !restore.is_logical() => BundleError::Unsupported {
            operation: "physical restore diagnostics",
            value: Some(restore.kind.as_str().to_string()),
        },
        Ok(_) => BundleError::NotFound {
            what: "command",
            value: Some(name.to_string()),
        },
        Err(err) => {
            if !err.is_not_found() {
                warn!(name, error = %err, "restore lookup failed while classifying missing command");
            }
            BundleError::NotFound {
                what: "command",
                value: Some(name.to_string()),
            }
        }
    }
}
