//! Caller-supplied configuration transformation.

use std::sync::Arc;

use crate::config::CompilationConfig;
use crate::{Error, Result};

/// Rewrites the assembled [`CompilationConfig`] before it is compiled.
///
/// Called exactly once per build, after the configuration is fully assembled
/// and before the compiler runs. The returned configuration is the one that
/// compiles. Returning an error aborts the build.
///
/// Any `Fn(CompilationConfig) -> anyhow::Result<CompilationConfig>` closure is
/// a transformer:
///
/// ```
/// use fob_lambda::{CompilationConfig, ConfigTransformer};
///
/// let keep_sdk_external = |mut config: CompilationConfig| -> anyhow::Result<CompilationConfig> {
///     config.externals.externalize("aws-sdk");
///     Ok(config)
/// };
/// # fn assert_transformer(_: &impl ConfigTransformer) {}
/// # assert_transformer(&keep_sdk_external);
/// ```
pub trait ConfigTransformer: Send + Sync {
    fn transform(&self, config: CompilationConfig) -> anyhow::Result<CompilationConfig>;
}

impl<F> ConfigTransformer for F
where
    F: Fn(CompilationConfig) -> anyhow::Result<CompilationConfig> + Send + Sync,
{
    fn transform(&self, config: CompilationConfig) -> anyhow::Result<CompilationConfig> {
        self(config)
    }
}

/// Shared handle to a transformer, as stored on a request.
pub type SharedTransformer = Arc<dyn ConfigTransformer>;

/// Run the optional transformer and re-check the configuration it returns.
pub(crate) fn apply(
    transformer: Option<&SharedTransformer>,
    config: CompilationConfig,
) -> Result<CompilationConfig> {
    let Some(transformer) = transformer else {
        return Ok(config);
    };

    let transformed = transformer.transform(config).map_err(Error::Transformer)?;
    transformed.validate()?;
    Ok(transformed)
}
