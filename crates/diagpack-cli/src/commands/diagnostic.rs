use std::io;

use diagpack_bundle::{BundleRequest, DiagnosticBundler};
use diagpack_core::DiagnosticSource;
use tracing::info;

use crate::cli::DiagnosticArgs;
use crate::client::{CliError, CliResult};
use crate::output::{OutputFormat, render_confirmation};

pub(crate) async fn handle_diagnostic<S>(
    source: S,
    args: DiagnosticArgs,
    output: OutputFormat,
) -> CliResult<()>
where
    S: DiagnosticSource,
{
    if args.path.as_os_str().is_empty() {
        return Err(CliError::validation("--path must not be empty"));
    }

    let request = BundleRequest {
        operation_id: args.opid,
        operation_name: args.name,
        output_path: args.path,
        produce_archive: args.archive,
    };
    let summary = DiagnosticBundler::new(source).generate(request).await?;
    info!(
        operation_id = %summary.operation_id,
        directory = %summary.directory.display(),
        files = summary.files.len(),
        archived = summary.archive.is_some(),
        "diagnostic report written"
    );

    render_confirmation(output, &mut io::stdout().lock())
}
