//! Command implementations.

use fob_lambda::LambdaBundler;
use tracing::{error, info, warn};

use crate::cli::BuildArgs;
use crate::error::{CliError, Result};

/// Run `fob-lambda build`.
///
/// Fails when the build is rejected or when any entry failed to compile.
pub async fn build_execute(args: BuildArgs) -> Result<()> {
    let request = args.to_request();
    let bundler = LambdaBundler::from_env()?;
    let result = bundler.build(request).await?;

    for warning in result.warnings() {
        warn!("{}", warning);
    }
    for diagnostic in result.errors() {
        error!("{}", diagnostic);
    }
    if result.has_errors() {
        return Err(CliError::CompilationFailed {
            errors: result.errors().count(),
        });
    }

    for bundle in result.bundles() {
        info!(bundle = %bundle.path.display(), "wrote");
    }
    for archive in result.archives() {
        info!(archive = %archive.display(), "zipped");
    }
    info!(
        bundles = result.bundles().len(),
        archives = result.archives().len(),
        "done"
    );
    Ok(())
}
