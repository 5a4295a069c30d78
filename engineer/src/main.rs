//! `engineer` CLI: generate, improve and run code for a project directory.
//!
//! State lives in `<project>/.engineer/store.json` and is written back after
//! every run, including runs where a step failed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::info;

use engineer::core::store::RootStore;
use engineer::core::stores::{Layout, ProjectStores};
use engineer::exit_codes;
use engineer::io::client::{CommandClient, deserialize_messages};
use engineer::io::config::{EngineConfig, load_config};
use engineer::io::findings::load_findings;
use engineer::io::init::{InitOptions, ProjectPaths, init_project};
use engineer::io::operator::TerminalOperator;
use engineer::io::prompt::seed_preprompts;
use engineer::io::store_file::{load_root, write_root};
use engineer::pipeline::{TOKEN_USAGE_KEY, run_steps};
use engineer::steps::execute::{
    EXECUTE_OUTPUT_LIMIT_KEY, EXECUTE_TIMEOUT_KEY, PROJECT_PATH_KEY, WORKSPACE_PATH_KEY,
};
use engineer::steps::improve::FINDINGS_KEY;
use engineer::steps::steps_for;
use engineer::{logging, session};

const MODEL_ENV: &str = "ENGINEER_MODEL";

#[derive(Parser)]
#[command(
    name = "engineer",
    version,
    about = "Generate, improve and run code from a prompt, one step at a time"
)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.engineer/` with a default config and editable preprompts.
    Init {
        project_path: PathBuf,
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
    /// Run the steps of a mode against a project.
    Run(RunArgs),
    /// List logged steps, or print the transcript of one.
    Logs {
        project_path: PathBuf,
        step: Option<String>,
    },
}

#[derive(Args)]
struct RunArgs {
    project_path: PathBuf,

    /// Step mode: default, improve-code, execute-only, use-feedback, evaluate.
    #[arg(short, long)]
    steps: Option<String>,

    /// Improve existing code instead of generating it.
    #[arg(short, long)]
    improve: bool,

    /// Model name passed to the model command (falls back to ENGINEER_MODEL).
    #[arg(short, long)]
    model: Option<String>,

    #[arg(short, long)]
    temperature: Option<f64>,

    /// Seed the store from this JSON document instead of store.json.
    #[arg(long)]
    body: Option<String>,

    /// Scanner report whose failed checks become improvement requests.
    #[arg(long)]
    findings: Option<PathBuf>,

    /// Set an input entry. JSON objects and arrays are parsed; anything else is text.
    #[arg(long = "input", value_name = "KEY=VALUE", value_parser = parse_input_pair)]
    inputs: Vec<(String, Value)>,

    /// Run run.sh without asking.
    #[arg(short = 'y', long)]
    yes: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let code = match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run(command: Command) -> Result<i32> {
    match command {
        Command::Init {
            project_path,
            force,
        } => cmd_init(&project_path, force),
        Command::Run(args) => cmd_run(args),
        Command::Logs { project_path, step } => cmd_logs(&project_path, step.as_deref()),
    }
}

fn cmd_init(project_path: &Path, force: bool) -> Result<i32> {
    let paths = init_project(project_path, &InitOptions { force })?;
    println!("initialized {}", paths.state_dir.display());
    Ok(exit_codes::OK)
}

fn cmd_run(args: RunArgs) -> Result<i32> {
    let paths = ProjectPaths::new(&args.project_path);
    let mut config = load_config(&paths.config_path)?;
    apply_overrides(&mut config, &args);
    config.validate()?;
    let mode = config.step_mode()?.with_improve(args.improve);
    let steps = steps_for(mode);

    let root = match &args.body {
        Some(body) => {
            let value: Value = serde_json::from_str(body).context("parse --body json")?;
            RootStore::from_value(value).context("load --body")?
        }
        None => load_root(&paths.store_path)?,
    };
    let stores = ProjectStores::open(&root, Layout::for_mode(mode));
    seed_preprompts(&stores.preprompts);
    record_metadata(&stores, &paths, &config);
    for (key, value) in args.inputs {
        stores.input.set(key, value);
    }
    if let Some(path) = &args.findings {
        let findings = load_findings(path)?;
        stores.input.set(
            FINDINGS_KEY,
            serde_json::to_value(&findings).context("encode findings")?,
        );
    }

    let mut operator = TerminalOperator::stdio();
    session::start(&stores, mode, &mut operator)?;
    session::approve_execution(&stores, steps, &mut operator, args.yes)?;
    let mut client = CommandClient::new(config.model.clone())?;

    info!(mode = %mode, project = %paths.root.display(), "run started");
    let result = run_steps(&mut client, &stores, steps);
    if let Err(write_err) = write_root(&paths.store_path, &root) {
        if let Err(step_err) = &result {
            eprintln!("step failed: {step_err:#}");
        }
        return Err(write_err);
    }

    match result {
        Ok(summary) => {
            println!("{mode}: completed {}", summary.completed.join(", "));
            Ok(exit_codes::OK)
        }
        Err(err) => {
            eprintln!("step failed: {err:#}");
            Ok(exit_codes::STEP_FAILED)
        }
    }
}

fn cmd_logs(project_path: &Path, step: Option<&str>) -> Result<i32> {
    let paths = ProjectPaths::new(project_path);
    if !paths.store_path.exists() {
        return Err(anyhow!("no store at {}", paths.store_path.display()));
    }
    let root = load_root(&paths.store_path)?;
    let logs = ProjectStores::open(&root, Layout::Standard).logs;

    match step {
        None => {
            for key in logs.keys() {
                println!("{key}");
            }
        }
        Some(TOKEN_USAGE_KEY) => match logs.get_required(TOKEN_USAGE_KEY)? {
            Value::String(csv) => print!("{csv}"),
            other => println!("{other}"),
        },
        Some(name) => {
            let transcript = deserialize_messages(&logs.get_required(name)?)
                .with_context(|| format!("decode transcript of '{name}'"))?;
            for message in transcript {
                println!("--- {}\n{}", message.role.as_str(), message.content);
            }
        }
    }
    Ok(exit_codes::OK)
}

/// CLI flags win over `ENGINEER_MODEL`, which wins over the config file.
fn apply_overrides(config: &mut EngineConfig, args: &RunArgs) {
    if let Some(steps) = &args.steps {
        config.steps = steps.clone();
    }
    if let Some(model) = args
        .model
        .clone()
        .or_else(|| std::env::var(MODEL_ENV).ok().filter(|m| !m.trim().is_empty()))
    {
        config.model.name = model;
    }
    if let Some(temperature) = args.temperature {
        config.model.temperature = temperature;
    }
}

fn record_metadata(stores: &ProjectStores, paths: &ProjectPaths, config: &EngineConfig) {
    let metadata = &stores.project_metadata;
    metadata.set(PROJECT_PATH_KEY, paths.root.to_string_lossy().into_owned());
    metadata.set(
        WORKSPACE_PATH_KEY,
        paths.workspace_dir.to_string_lossy().into_owned(),
    );
    metadata.set(EXECUTE_TIMEOUT_KEY, config.execute.timeout_secs);
    metadata.set(EXECUTE_OUTPUT_LIMIT_KEY, config.execute.output_limit_bytes);
}

fn parse_input_pair(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err("input key must not be empty".to_string());
    }
    let trimmed = value.trim_start();
    let parsed = if trimmed.starts_with('{') || trimmed.starts_with('[') {
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
    } else {
        Value::String(value.to_string())
    };
    Ok((key.to_string(), parsed))
}
