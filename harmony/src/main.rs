//! Browser acceptance test interpreter.
//!
//! Loads a suite directory (plan files plus `testcases/` task files), runs
//! every plan and prints a failure summary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use harmony::core::resolver::dependency_order;
use harmony::core::summary::summarize;
use harmony::driver::memory::{self, MemoryDriverFactory};
use harmony::exit_codes;
use harmony::io::config::{CONFIG_FILE, RunnerConfig, load_config, write_config};
use harmony::io::console::{self, render_summary};
use harmony::io::loader::load_suite;
use harmony::io::report::{Report, write_report};
use harmony::library::register_builtin;
use harmony::logging;
use harmony::runner::{Context, Runner};

#[derive(Parser)]
#[command(
    name = "harmony",
    version,
    about = "YAML-driven browser acceptance test interpreter"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every test plan in a suite directory.
    Run {
        /// Suite directory holding plan files and `harmony.toml`.
        dir: PathBuf,
        /// Write a JSON report here (overrides `report_path`).
        #[arg(short, long)]
        report: Option<PathBuf>,
    },
    /// Print the resolved task order of every plan without running it.
    Order {
        dir: PathBuf,
    },
    /// Write a default `harmony.toml` and task directory.
    Init {
        dir: PathBuf,
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run { dir, report } => cmd_run(&dir, report),
        Command::Order { dir } => cmd_order(&dir),
        Command::Init { dir, force } => cmd_init(&dir, force),
    }
}

fn cmd_run(dir: &Path, report: Option<PathBuf>) -> Result<i32> {
    let cfg = load_config(&dir.join(CONFIG_FILE))?;
    let suite = load_suite(dir, &cfg)?;

    let mut ctx = Context::new();
    ctx.tasks = suite.tasks;
    register_builtin(&mut ctx.directives, cfg.poll_interval())?;
    ctx.drivers
        .register(memory::ENVIRONMENT, MemoryDriverFactory::default());
    console::register(&mut ctx.callbacks);

    let results = Runner::new(&ctx).run(&suite.plans)?;
    let summary = summarize(&results);
    print!("{}", render_summary(&summary));

    let report_path = report.or_else(|| cfg.report_path.as_ref().map(|path| dir.join(path)));
    if let Some(path) = report_path {
        write_report(
            &path,
            &Report {
                summary: &summary,
                results: &results,
            },
        )?;
        info!(path = %path.display(), "report written");
    }

    Ok(if summary.is_clean() {
        exit_codes::OK
    } else {
        exit_codes::FAILED
    })
}

fn cmd_order(dir: &Path) -> Result<i32> {
    let cfg = load_config(&dir.join(CONFIG_FILE))?;
    let suite = load_suite(dir, &cfg)?;
    for plan in &suite.plans {
        println!("{}:", plan.name);
        for task in dependency_order(&plan.tasks, |name| suite.tasks.setup_tasks_of(name)) {
            println!("  {task}");
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_init(dir: &Path, force: bool) -> Result<i32> {
    let path = dir.join(CONFIG_FILE);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let cfg = RunnerConfig::default();
    write_config(&path, &cfg)?;
    let tasks_dir = dir.join(&cfg.tasks_dir);
    fs::create_dir_all(&tasks_dir)
        .with_context(|| format!("create directory {}", tasks_dir.display()))?;
    Ok(exit_codes::OK)
}
