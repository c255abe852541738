//! ramr CLI: explain, validate and run relational-algebra plan files.

use clap::{Parser, Subcommand};
use ramr_core::config::{EngineConfig, ExecEnv};
use ramr_exec::Engine;
use ramr_planner::{compile, parse_yaml_pipeline, rules, ParsedPipeline};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ramr")]
#[command(about = "Relational algebra over map/reduce stages", long_about = None)]
struct Cli {
    /// Log filter, e.g. `info` or `ramr_exec=debug` (falls back to RUST_LOG)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize, compile and execute a plan file
    Run {
        /// Path to the plan YAML file
        #[arg(short, long)]
        plan: PathBuf,

        /// Directory holding `<Relation>.json` inputs (overrides config)
        #[arg(long)]
        data_dir: Option<String>,

        /// Execution environment: local, distributed or mock (overrides config)
        #[arg(long)]
        env: Option<ExecEnv>,

        /// Maximum stages running at once (overrides config)
        #[arg(long)]
        max_parallel: Option<usize>,

        /// Keep tmpN outputs after the run
        #[arg(long)]
        keep_intermediates: bool,
    },

    /// Check that a plan file parses and compiles
    Validate {
        /// Path to the plan YAML file
        #[arg(short, long)]
        plan: PathBuf,
    },

    /// Show the optimized plan and its stages (EXPLAIN)
    Explain {
        /// Path to the plan YAML file
        #[arg(short, long)]
        plan: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());

    let outcome = match cli.command {
        Commands::Run {
            plan,
            data_dir,
            env,
            max_parallel,
            keep_intermediates,
        } => run_plan(&plan, data_dir, env, max_parallel, keep_intermediates),
        Commands::Validate { plan } => validate_plan(&plan),
        Commands::Explain { plan } => explain_plan(&plan),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(filter: Option<&str>) {
    let filter = filter
        .and_then(|f| EnvFilter::try_new(f).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load(path: &PathBuf) -> Result<ParsedPipeline, Box<dyn std::error::Error>> {
    let yaml_content = fs::read_to_string(path)?;
    Ok(parse_yaml_pipeline(&yaml_content)?)
}

fn run_plan(
    plan_path: &PathBuf,
    data_dir: Option<String>,
    env: Option<ExecEnv>,
    max_parallel: Option<usize>,
    keep_intermediates: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = load(plan_path)?;

    // env < plan file < flags
    let mut config = EngineConfig::from_env();
    parsed.config.apply_to(&mut config);
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    if let Some(env) = env {
        config.exec_env = env;
    }
    if let Some(parallel) = max_parallel {
        config.max_parallel_tasks = parallel;
    }
    if keep_intermediates {
        config.keep_intermediates = true;
    }

    let engine = Engine::new(config)?;
    let output = engine.run_plan(parsed.plan, &parsed.dictionary)?;

    for record in &output.records {
        println!("{}", record.to_line()?);
    }

    let manifest = &output.manifest;
    tracing::info!(
        records = manifest.output_records,
        stages = manifest.stages_run,
        duration_ms = manifest.duration_ms(),
        plan_hash = %manifest.plan_hash,
        "plan executed"
    );
    Ok(())
}

fn validate_plan(plan_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = load(plan_path)?;
    let optimized = rules::optimize(parsed.plan, &parsed.dictionary);
    let graph = compile(&optimized)?;
    println!("✓ Plan is valid ({} stages)", graph.len());
    Ok(())
}

fn explain_plan(plan_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = load(plan_path)?;
    println!("Logical Plan");
    println!("============");
    println!("{}", parsed.plan);
    println!();

    let split = rules::break_up_selections(parsed.plan);
    println!("After break_up_selections:\n  {}", split);
    let pushed = rules::push_down_selections(split, &parsed.dictionary);
    println!("After push_down_selections:\n  {}", pushed);
    let merged = rules::merge_selections(pushed);
    println!("After merge_selections:\n  {}", merged);
    let optimized = rules::introduce_joins(merged);
    println!("After introduce_joins:\n  {}", optimized);
    println!();

    let graph = compile(&optimized)?;
    println!("Stages");
    println!("======");
    println!("{}", graph);
    println!();
    println!("Waves:");
    for (i, wave) in graph.waves().iter().enumerate() {
        let steps: Vec<String> = wave.iter().map(|s| s.get().to_string()).collect();
        println!("  {}. [{}]", i + 1, steps.join(", "));
    }
    Ok(())
}
