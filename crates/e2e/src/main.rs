//! dexcheck: run the data-driven E2E suite
//!
//! Exit codes: 0 when every case passes (flaky included), 1 when any case
//! fails, 2 on a fatal error such as a missing secret or unreadable fixture.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dexcheck_e2e::config::{running_in_ci, Config, Settings};
use dexcheck_e2e::fixture;
use dexcheck_e2e::harness::{DataPolicy, EncryptedKeyHook, Suite, WorkbookProvider};
use dexcheck_e2e::runner::{CaseFilter, RunnerConfig, TestRunner};
use dexcheck_e2e::specs;
use dexcheck_e2e::E2eResult;

#[derive(Parser, Debug)]
#[command(name = "dexcheck")]
#[command(about = "Data-driven E2E checks for the creature catalog, post store and wiki")]
struct Args {
    /// Settings file (missing file means defaults)
    #[arg(short, long, default_value = "e2e.yaml")]
    config: PathBuf,

    /// Run only this project
    #[arg(short, long)]
    project: Option<String>,

    /// Run only cases whose name contains this text
    #[arg(short, long)]
    grep: Option<String>,

    /// Maximum concurrent cases
    #[arg(short, long)]
    workers: Option<usize>,

    /// Retries per failing case
    #[arg(short, long)]
    retries: Option<u32>,

    /// Per-attempt timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Fixture workbook path
    #[arg(long)]
    data: Option<PathBuf>,

    /// reload-per-test or suite-scoped
    #[arg(long)]
    data_policy: Option<DataPolicy>,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// List registered cases and exit
    #[arg(long)]
    list: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.debug, args.json_logs);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    let result = rt.block_on(async_main(args));
    if let Err(e) = &result {
        error!("{}", e);
        eprintln!("Error: {}", e);
    }
    std::process::exit(exit_code(&result));
}

/// 0 all passed, 1 a case or the report failed, 2 the run could not start
fn exit_code(result: &E2eResult<bool>) -> i32 {
    match result {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) if e.is_fatal() => 2,
        Err(_) => 1,
    }
}

fn init_tracing(debug: bool, json: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let config = Config::resolve()?;
    info!("dexcheck v{} ({} environment)", env!("CARGO_PKG_VERSION"), config.environment);

    let mut settings = Settings::load_or_default(&args.config)?;
    if let Some(timeout_ms) = args.timeout_ms {
        settings.runner.timeout_ms = timeout_ms;
    }
    if args.workers.is_some() {
        settings.runner.workers = args.workers;
    }
    if args.retries.is_some() {
        settings.runner.retries = args.retries;
    }
    if let Some(output) = args.output {
        settings.runner.output_dir = output;
    }
    if let Some(data) = args.data {
        settings.data.fixture_path = data;
    }
    if let Some(policy) = args.data_policy {
        settings.data.policy = policy;
    }

    let records = fixture::load(&settings.data.fixture_path)?;
    info!(
        "Loaded {} record(s) from {}",
        records.len(),
        settings.data.fixture_path.display()
    );

    let provider = WorkbookProvider::new(&settings.data.fixture_path, settings.data.policy);
    let mut suite = Suite::new(Arc::new(provider));
    info!("Test data policy: {:?}", suite.data_policy());
    suite.before_each(EncryptedKeyHook::new(&config));
    specs::register_all(&mut suite, &records, &settings, &config);

    let mut runner_config = RunnerConfig::from_settings(&settings.runner, running_in_ci());
    runner_config.filter = CaseFilter {
        project: args.project,
        grep: args.grep,
    };
    if let Some(project) = runner_config.filter.project.as_deref() {
        if !specs::PROJECTS.contains(&project) {
            warn!("Unknown project '{}'; known: {}", project, specs::PROJECTS.join(", "));
        }
    }
    let runner = TestRunner::new(runner_config);

    if args.list {
        for case in runner.selected(&suite) {
            println!("[{}] {}", case.project, case.name);
        }
        return Ok(true);
    }

    let results = runner.run(&suite).await;
    runner.write_results(&results)?;

    Ok(results.success())
}
