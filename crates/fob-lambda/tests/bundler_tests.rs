//! Orchestration tests with a recording compiler: no Rolldown involved.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fob_lambda::{
    BuildMode, BuildRequest, CompilationConfig, CompilerOutput, Diagnostic, EmittedBundle, Error,
    NodeVersion, Settings,
};
use helpers::{FlakyFs, RecordingCompiler, bundler, fixture, fixtures_dir, zip_members};
use tempfile::TempDir;

#[tokio::test]
async fn test_transformer_runs_once_before_compile() {
    let temp = TempDir::new().unwrap();
    let compiler = RecordingCompiler::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let request = BuildRequest::new(fixture("lambda_service.js"))
        .output_path(temp.path())
        .service_name("test-service")
        .config_transformer(move |mut config: CompilationConfig| -> anyhow::Result<CompilationConfig> {
            counter.fetch_add(1, Ordering::SeqCst);
            config.externals.externalize("koa-router");
            Ok(config)
        });

    bundler()
        .with_compiler(compiler.clone())
        .build(request)
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(compiler.calls(), 1);
    let config = compiler.last_config().unwrap();
    assert_eq!(config.externals.get("koa-router"), Some("koa-router"));
    assert_eq!(config.service_name, "test-service");
}

#[tokio::test]
async fn test_transformer_error_never_compiles() {
    let temp = TempDir::new().unwrap();
    let compiler = RecordingCompiler::new();

    let request = BuildRequest::new(fixture("lambda_service.js"))
        .output_path(temp.path())
        .config_transformer(|_config: CompilationConfig| -> anyhow::Result<CompilationConfig> {
            anyhow::bail!("no externals allowed here")
        });

    let err = bundler()
        .with_compiler(compiler.clone())
        .build(request)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transformer(_)));
    assert_eq!(compiler.calls(), 0);
}

#[tokio::test]
async fn test_default_node_version_is_lowest() {
    let temp = TempDir::new().unwrap();
    let compiler = RecordingCompiler::new();

    bundler()
        .with_compiler(compiler.clone())
        .build(BuildRequest::new(fixture("lambda_service.js")).output_path(temp.path()))
        .await
        .unwrap();

    let config = compiler.last_config().unwrap();
    assert_eq!(config.target.node, NodeVersion::lowest());
    assert_eq!(config.target.node.as_str(), "18.20");
}

#[tokio::test]
async fn test_custom_node_version_reaches_config() {
    let temp = TempDir::new().unwrap();
    let compiler = RecordingCompiler::new();

    bundler()
        .with_compiler(compiler.clone())
        .build(
            BuildRequest::new(fixture("lambda_service.js"))
                .output_path(temp.path())
                .node_version("20.18"),
        )
        .await
        .unwrap();

    assert_eq!(compiler.last_config().unwrap().target.node.as_str(), "20.18");
}

#[tokio::test]
async fn test_unsupported_node_version_rejects_before_compile() {
    let temp = TempDir::new().unwrap();
    let compiler = RecordingCompiler::new();

    let err = bundler()
        .with_compiler(compiler.clone())
        .build(
            BuildRequest::new(fixture("lambda_service.js"))
                .output_path(temp.path())
                .node_version("6.10"),
        )
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(compiler.calls(), 0);
}

#[tokio::test]
async fn test_missing_entry_rejects_before_compile() {
    let temp = TempDir::new().unwrap();
    let compiler = RecordingCompiler::new();

    let err = bundler()
        .with_compiler(compiler.clone())
        .build(BuildRequest::new(fixture("nope.js")).output_path(temp.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::EntryNotFound { .. }));
    assert_eq!(compiler.calls(), 0);
}

#[tokio::test]
async fn test_settings_mode_and_request_override() {
    let temp = TempDir::new().unwrap();
    let compiler = RecordingCompiler::new();
    let development = Settings {
        mode: BuildMode::Development,
        ..Settings::default()
    };
    let bundler = bundler()
        .with_compiler(compiler.clone())
        .with_settings(development);

    bundler
        .build(BuildRequest::new(fixture("lambda_service.js")).output_path(temp.path()))
        .await
        .unwrap();
    let config = compiler.last_config().unwrap();
    assert_eq!(config.mode, BuildMode::Development);
    assert!(!config.minify);

    bundler
        .build(
            BuildRequest::new(fixture("lambda_service.js"))
                .output_path(temp.path())
                .mode(BuildMode::Production),
        )
        .await
        .unwrap();
    assert!(compiler.last_config().unwrap().minify);
}

#[tokio::test]
async fn test_default_output_path_is_working_directory() {
    let temp = TempDir::new().unwrap();
    let compiler = RecordingCompiler::new();
    let fs = FlakyFs::default().with_cwd(temp.path());

    bundler()
        .with_compiler(compiler.clone())
        .with_file_system(Arc::new(fs))
        .build(BuildRequest::new(fixture("lambda_service.js")))
        .await
        .unwrap();

    let config = compiler.last_config().unwrap();
    assert_eq!(config.output_path, temp.path());
    assert_eq!(
        config.entries.get("lambda_service.js"),
        Some(&fixtures_dir().join("lambda_service.js"))
    );
}

#[tokio::test]
async fn test_compile_errors_resolve_with_has_errors() {
    let temp = TempDir::new().unwrap();
    let compiler = RecordingCompiler::returning(CompilerOutput::failed(vec![
        Diagnostic::error("Unexpected token in syntax_error.js"),
    ]));

    let result = bundler()
        .with_compiler(compiler)
        .build(
            BuildRequest::new(fixture("syntax_error.js"))
                .output_path(temp.path())
                .zip(true),
        )
        .await
        .unwrap();

    assert!(result.has_errors());
    assert!(!result.has_warnings());
    assert!(result.archives().is_empty());
}

#[tokio::test]
async fn test_zip_archives_emitted_bundles() {
    let temp = TempDir::new().unwrap();
    let bundle_path = temp.path().join("lambda").join("service.js");
    std::fs::create_dir_all(bundle_path.parent().unwrap()).unwrap();
    std::fs::write(&bundle_path, "exports.handle = async () => ({});").unwrap();

    let compiler = RecordingCompiler::returning(CompilerOutput {
        diagnostics: Vec::new(),
        bundles: vec![EmittedBundle {
            name: "lambda/service.js".to_string(),
            path: bundle_path.clone(),
            source_map: None,
            companions: Vec::new(),
        }],
        files: vec![bundle_path.clone()],
    });

    let result = bundler()
        .with_compiler(compiler)
        .build(
            BuildRequest::new(format!("{}:lambda/service.js", fixture("lambda_service.js")))
                .output_path(temp.path())
                .zip(true),
        )
        .await
        .unwrap();

    let archive = temp.path().join("lambda").join("service.js.zip");
    assert_eq!(result.archives(), &[archive.clone()]);
    assert_eq!(zip_members(&archive), vec!["lambda/service.js"]);
}

#[tokio::test]
async fn test_zip_from_settings() {
    let temp = TempDir::new().unwrap();
    let bundle_path = temp.path().join("a.js");
    std::fs::write(&bundle_path, "1").unwrap();

    let compiler = RecordingCompiler::returning(CompilerOutput {
        bundles: vec![EmittedBundle {
            name: "a.js".to_string(),
            path: bundle_path,
            source_map: None,
            companions: Vec::new(),
        }],
        ..Default::default()
    });
    let settings = Settings {
        zip: true,
        ..Settings::default()
    };

    let result = bundler()
        .with_compiler(compiler)
        .with_settings(settings)
        .build(BuildRequest::new(format!("{}:a.js", fixture("lambda_graphql.js"))).output_path(temp.path()))
        .await
        .unwrap();

    assert_eq!(result.archives().len(), 1);
}

#[tokio::test]
async fn test_archive_failure_is_fatal() {
    let temp = TempDir::new().unwrap();
    let bundle_path = temp.path().join("a.js");
    std::fs::write(&bundle_path, "1").unwrap();
    std::fs::create_dir(temp.path().join("a.js.zip")).unwrap();

    let compiler = RecordingCompiler::returning(CompilerOutput {
        bundles: vec![EmittedBundle {
            name: "a.js".to_string(),
            path: bundle_path,
            source_map: None,
            companions: Vec::new(),
        }],
        ..Default::default()
    });

    let err = bundler()
        .with_compiler(compiler)
        .build(
            BuildRequest::new(format!("{}:a.js", fixture("lambda_graphql.js")))
                .output_path(temp.path())
                .zip(true),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Archive { .. }));
}
