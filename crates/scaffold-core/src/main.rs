//! `scaffold` command-line entry point

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use scaffold_core::{ModelConfig, Pipeline, PipelineConfig, PipelineError, RepositorySource};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

fn cli() -> Command {
    Command::new("scaffold")
        .version(scaffold_core::VERSION)
        .about("Generate test scaffolds with traceable rationale from a source repository")
        .arg(
            Arg::new("repo")
                .value_name("REPO")
                .required(true)
                .help("Local directory or git URL to analyze"),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .value_name("ID")
                .help("Enrich findings with this language model"),
        )
        .arg(
            Arg::new("model-endpoint")
                .long("model-endpoint")
                .value_name("URL")
                .help("Base URL of the model server"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Directory receiving tests and the report"),
        )
        .arg(
            Arg::new("target")
                .long("target")
                .value_name("LANG")
                .action(ArgAction::Append)
                .help("Target language; repeat for several (default: every language found)"),
        )
        .arg(
            Arg::new("concurrency")
                .long("concurrency")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Files summarized and model queries issued in parallel"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file; flags override its values"),
        )
        .arg(
            Arg::new("revision")
                .long("revision")
                .value_name("REV")
                .help("Branch or tag to clone"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("More logging; repeat for more"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .action(ArgAction::SetTrue)
                .help("Log as JSON lines"),
        )
}

fn init_tracing(verbosity: u8, json: bool) {
    use tracing_subscriber::EnvFilter;

    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn config_from(matches: &ArgMatches) -> anyhow::Result<PipelineConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => PipelineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(output) = matches.get_one::<PathBuf>("output") {
        config = config.with_output_dir(output.clone());
    }
    if let Some(targets) = matches.get_many::<String>("target") {
        config = config.with_targets(targets.cloned());
    }
    if let Some(concurrency) = matches.get_one::<usize>("concurrency") {
        config = config.with_concurrency(*concurrency);
    }
    if let Some(revision) = matches.get_one::<String>("revision") {
        config = config.with_revision(revision.clone());
    }
    if let Some(id) = matches.get_one::<String>("model") {
        let model = ModelConfig {
            id: id.clone(),
            ..config.model.clone().unwrap_or_default()
        };
        config = config.with_model(model);
    }
    if let Some(endpoint) = matches.get_one::<String>("model-endpoint") {
        match config.model.as_mut() {
            Some(model) => model.endpoint = endpoint.clone(),
            None => bail!("--model-endpoint requires --model or a [model] section in the configuration"),
        }
    }
    Ok(config)
}

async fn run(matches: &ArgMatches) -> anyhow::Result<u8> {
    let config = config_from(matches)?;
    let reference = matches.get_one::<String>("repo").context("missing repository")?;

    let source = match RepositorySource::parse(reference, config.revision.clone()) {
        Ok(source) => source,
        Err(err) => {
            let err = PipelineError::from(err);
            eprintln!("error: {err}");
            return Ok(err.exit_code());
        }
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    info!(source = %source, output = %config.output_dir.display(), "starting run");
    match Pipeline::new(config).run(source, &cancel).await {
        Ok(outcome) => {
            println!("report: {}", outcome.report_path.display());
            println!("test files: {}", outcome.test_files.len());
            if !outcome.diagnostics.is_empty() {
                println!("diagnostics: {}", outcome.diagnostics.len());
            }
            for target in &outcome.unsupported {
                eprintln!("error: unsupported target language: {target}");
            }
            Ok(outcome.exit_code())
        }
        Err(failure) => {
            eprintln!("error: {failure}");
            if let Some(report) = &failure.report_path {
                println!("partial report: {}", report.display());
            }
            if !failure.diagnostics.is_empty() {
                println!("diagnostics: {}", failure.diagnostics.len());
            }
            Ok(failure.exit_code())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_count("verbose"), matches.get_flag("json-logs"));

    match run(&matches).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}
