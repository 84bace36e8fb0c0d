//! Rolldown-backed compiler.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use either::Either;
use rolldown::{
    BundlerBuilder, BundlerOptions, InputItem, IsExternal, OutputFormat, Platform,
    RawMinifyOptions, ResolveOptions, SourceMapType,
};
use rolldown_common::{BundlerTransformOptions, Output};
use tracing::{debug, warn};

use super::writer::OutputWriter;
use super::{Compiler, CompilerOutput, EmittedBundle};
use crate::config::{CompilationConfig, Externals, engine_name};
use crate::diagnostics::{self, Diagnostic};
use crate::{Error, Result};

/// Export conditions used when resolving packages for the Node runtime.
const NODE_CONDITIONS: [&str; 4] = ["node", "import", "module", "default"];

/// [`Compiler`] driving one Rolldown pass per build.
///
/// All entries go into a single `BundlerOptions` as CommonJS for the Node
/// platform. Entry chunks are written at their configured output names, shared
/// chunks at the names Rolldown chose.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolldownCompiler;

impl RolldownCompiler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Compiler for RolldownCompiler {
    async fn compile(&self, config: &CompilationConfig) -> Result<CompilerOutput> {
        let options = bundler_options(config);

        let mut bundler = BundlerBuilder::default()
            .with_options(options)
            .build()
            .map_err(|e| Error::Engine(format!("{:?}", e)))?;

        let bundle = match bundler.generate().await {
            Ok(bundle) => bundle,
            Err(errors) => {
                let diagnostics = diagnostics::from_engine_error(&errors);
                debug!(count = diagnostics.len(), "compilation reported errors");
                return Ok(CompilerOutput::failed(diagnostics));
            }
        };

        let mut diagnostics = Vec::with_capacity(bundle.warnings.len());
        for warning in &bundle.warnings {
            let diagnostic = diagnostics::from_engine_warning(warning);
            warn!(message = %diagnostic.message, "compilation warning");
            diagnostics.push(diagnostic);
        }

        let EmitPlan {
            writer,
            bundles,
            missing,
        } = plan_output(config, &bundle.assets)?;
        for name in missing {
            diagnostics.push(Diagnostic::error(format!(
                "no bundle was emitted for entry '{}'",
                name
            )));
        }

        let files = tokio::task::spawn_blocking(move || writer.commit())
            .await
            .map_err(|e| Error::Write(format!("write task failed: {}", e)))??;

        Ok(CompilerOutput {
            diagnostics,
            bundles,
            files,
        })
    }
}

fn bundler_options(config: &CompilationConfig) -> BundlerOptions {
    let input = config
        .entries
        .iter()
        .map(|(name, source)| InputItem {
            name: Some(engine_name(name)),
            import: source.to_string_lossy().into_owned(),
        })
        .collect();

    let externals: Vec<String> = config.externals.modules().map(str::to_string).collect();

    let transform = BundlerTransformOptions {
        target: Some(Either::Left(config.target.node.engine_target())),
        ..Default::default()
    };

    BundlerOptions {
        input: Some(input),
        cwd: Some(config.context.clone()),
        external: Some(IsExternal::from(externals)),
        format: Some(OutputFormat::Cjs),
        platform: Some(Platform::Node),
        sourcemap: config.needs_source_maps().then_some(SourceMapType::Hidden),
        minify: config.minify.then(|| RawMinifyOptions::from(true)),
        transform: Some(transform),
        resolve: Some(configure_resolution(
            &config.context,
            &config.resolve_extensions,
        )),
        ..Default::default()
    }
}

/// Module resolution: Node conditions and `node_modules` lookup walking up
/// from the context directory.
fn configure_resolution(context: &Path, extensions: &[String]) -> ResolveOptions {
    let mut modules = Vec::new();
    let mut current = Some(context);
    while let Some(dir) = current {
        modules.push(dir.join("node_modules").to_string_lossy().into_owned());
        current = dir.parent();
    }
    modules.push("node_modules".to_string());

    ResolveOptions {
        main_fields: Some(vec!["module".to_string(), "main".to_string()]),
        condition_names: Some(NODE_CONDITIONS.iter().map(|c| (*c).to_string()).collect()),
        extensions: Some(extensions.to_vec()),
        modules: Some(modules),
        symlinks: Some(true),
        ..Default::default()
    }
}

/// Point `require` calls of externals at their configured reference.
fn rewrite_externals(code: &str, externals: &Externals) -> String {
    let mut code = code.to_string();
    for (module, reference) in externals.iter() {
        if module == reference {
            continue;
        }
        for quote in ['"', '\''] {
            let from = format!("require({quote}{module}{quote})");
            let to = format!("require({quote}{reference}{quote})");
            code = code.replace(&from, &to);
        }
    }
    code
}

struct EmitPlan {
    writer: OutputWriter,
    bundles: Vec<EmittedBundle>,
    /// Entries the engine produced no chunk for.
    missing: Vec<String>,
}

struct PlannedEntry {
    engine_file: String,
    path: PathBuf,
    source_map: Option<PathBuf>,
}

/// Decide where every emitted file goes and queue it on a writer.
fn plan_output(config: &CompilationConfig, outputs: &[Output]) -> Result<EmitPlan> {
    let by_engine_name: HashMap<String, &str> = config
        .entries
        .keys()
        .map(|name| (engine_name(name), name.as_str()))
        .collect();
    let by_source: HashMap<&Path, &str> = config
        .entries
        .iter()
        .map(|(name, source)| (source.as_path(), name.as_str()))
        .collect();

    let mut writer = OutputWriter::new(&config.output_path)?;
    let mut entries: HashMap<&str, PlannedEntry> = HashMap::new();
    let mut chunk_paths: HashMap<String, PathBuf> = HashMap::new();
    let mut chunk_imports: HashMap<String, Vec<String>> = HashMap::new();

    for output in outputs {
        match output {
            Output::Chunk(chunk) => {
                let engine_file = chunk.filename.to_string();
                let entry_name = if chunk.is_entry {
                    by_engine_name.get(chunk.name.as_str()).copied().or_else(|| {
                        chunk.facade_module_id.as_ref().and_then(|id| {
                            by_source.get(Path::new(&id.to_string())).copied()
                        })
                    })
                } else {
                    None
                };

                let mut code = rewrite_externals(&chunk.code, &config.externals);

                let path = match entry_name {
                    Some(name) => {
                        let mut source_map = None;
                        let wants_map = config
                            .entries
                            .get(name)
                            .is_some_and(|source| config.wants_source_map(source));
                        if let (true, Some(map)) = (wants_map, chunk.map.as_ref()) {
                            let map_name = format!("{}.map", name);
                            let map_file = Path::new(&map_name)
                                .file_name()
                                .map(|f| f.to_string_lossy().into_owned())
                                .unwrap_or_else(|| map_name.clone());
                            if !code.ends_with('\n') {
                                code.push('\n');
                            }
                            code.push_str(&format!("//# sourceMappingURL={}\n", map_file));
                            source_map = Some(writer.add(&map_name, map.to_json_string())?);
                        }

                        let path = writer.add(name, code)?;
                        entries.insert(
                            name,
                            PlannedEntry {
                                engine_file: engine_file.clone(),
                                path: path.clone(),
                                source_map,
                            },
                        );
                        path
                    }
                    None => writer.add(&engine_file, code)?,
                };

                chunk_paths.insert(engine_file.clone(), path);
                chunk_imports.insert(
                    engine_file,
                    chunk.imports.iter().map(|s| s.to_string()).collect(),
                );
            }
            Output::Asset(asset) => {
                let filename = asset.filename.to_string();
                // Maps are written per entry above, and only where wanted.
                if filename.ends_with(".map") {
                    continue;
                }
                writer.add(&filename, asset.source.as_bytes().to_vec())?;
            }
        }
    }

    let mut bundles = Vec::with_capacity(entries.len());
    let mut missing = Vec::new();
    for name in config.entries.keys() {
        let Some(planned) = entries.remove(name.as_str()) else {
            debug!(entry = %name, "no chunk emitted for entry");
            missing.push(name.clone());
            continue;
        };
        let companions = companions_of(&planned.engine_file, &chunk_imports, &chunk_paths);
        bundles.push(EmittedBundle {
            name: name.clone(),
            path: planned.path,
            source_map: planned.source_map,
            companions,
        });
    }

    Ok(EmitPlan {
        writer,
        bundles,
        missing,
    })
}

/// Chunks reachable from `root` through static imports, excluding `root`.
fn companions_of(
    root: &str,
    imports: &HashMap<String, Vec<String>>,
    paths: &HashMap<String, PathBuf>,
) -> Vec<PathBuf> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = vec![root];
    let mut companions = Vec::new();

    while let Some(current) = stack.pop() {
        if !seen.insert(current) {
            continue;
        }
        if current != root {
            if let Some(path) = paths.get(current) {
                companions.push(path.clone());
            }
        }
        if let Some(next) = imports.get(current) {
            stack.extend(next.iter().map(String::as_str));
        }
    }

    companions.sort();
    companions
}
