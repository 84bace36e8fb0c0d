//! Command-line interface definition.
//!
//! - `fob-lambda build <ENTRY>...` - bundle handlers, optionally zipped

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fob_lambda::{BuildMode, BuildRequest, NodeVersion, SUPPORTED_NODE_VERSIONS};

/// Bundle serverless function handlers into deployable artifacts
#[derive(Parser, Debug)]
#[command(
    name = "fob-lambda",
    version,
    about = "Bundle serverless function handlers into deployable artifacts"
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bundle one or more entrypoints
    Build(BuildArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Entry files or handler directories, optionally as `path:outputName`
    #[arg(required = true, value_name = "ENTRY")]
    pub entries: Vec<String>,

    /// Output directory (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Service name passed through to the build configuration
    #[arg(short, long, default_value = "lambda")]
    pub service: String,

    /// Runtime version to transpile for (default: lowest supported)
    #[arg(long, value_name = "VERSION", value_parser = parse_node_version)]
    pub node_version: Option<String>,

    /// Write `<bundle>.zip` next to every bundle
    #[arg(long)]
    pub zip: bool,

    /// Skip minification
    #[arg(long)]
    pub development: bool,
}

impl BuildArgs {
    /// Unset flags stay unset so environment settings still apply.
    pub fn to_request(&self) -> BuildRequest {
        let mut request = BuildRequest::new(self.entries.clone()).service_name(self.service.clone());
        if let Some(dir) = &self.out_dir {
            request = request.output_path(dir.clone());
        }
        if let Some(version) = &self.node_version {
            request = request.node_version(version.clone());
        }
        if self.zip {
            request = request.zip(true);
        }
        if self.development {
            request = request.mode(BuildMode::Development);
        }
        request
    }
}

fn parse_node_version(value: &str) -> Result<String, String> {
    NodeVersion::parse(value)
        .map(|version| version.as_str().to_string())
        .map_err(|_| {
            format!(
                "unsupported node version '{}' (expected one of: {})",
                value,
                SUPPORTED_NODE_VERSIONS.join(", ")
            )
        })
}
