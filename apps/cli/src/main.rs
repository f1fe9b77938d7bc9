#![deny(warnings)]

//! Headless CLI: load a CPF configuration, simulate until retirement and report.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use cpf_core::Config;
use cpf_runtime::{run_until_retirement, AccountState, Snapshot};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "properties.json";

#[derive(Debug)]
struct Args {
    config: PathBuf,
    start: Option<NaiveDate>,
    monthly: bool,
    json: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: PathBuf::from(DEFAULT_CONFIG),
        start: None,
        monthly: false,
        json: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                args.config = it.next().map(PathBuf::from).context("--config needs a path")?
            }
            "--start" => {
                let s = it.next().context("--start needs a date")?;
                let date = NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .with_context(|| format!("invalid --start date {s:?}, expected YYYY-MM-DD"))?;
                args.start = Some(date);
            }
            "--monthly" => args.monthly = true,
            "--json" => args.json = true,
            "--version" => {
                println!("cpf-cli {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            other => bail!(
                "unknown argument {other:?}\n\
                 usage: cpf-cli [--config PATH] [--start YYYY-MM-DD] [--monthly] [--json]"
            ),
        }
    }
    Ok(args)
}

fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading configuration {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let config: Config = if is_yaml {
        serde_yaml::from_str(&text)
            .with_context(|| format!("parsing YAML configuration {}", path.display()))?
    } else {
        serde_json::from_str(&text)
            .with_context(|| format!("parsing JSON configuration {}", path.display()))?
    };
    Ok(cpf_core::validate(config)?)
}

fn print_text(snaps: &[Snapshot], monthly: bool) {
    for (i, snap) in snaps.iter().enumerate() {
        if monthly || snap.month == 12 || i + 1 == snaps.len() {
            println!("{snap}");
        }
    }
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    let start = args
        .start
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    info!(config = %args.config.display(), %start, "starting CLI");

    let config = load_config(&args.config)?;
    let mut state = AccountState::new(&config, start)?;
    let initial = state.snapshot();
    let snaps = run_until_retirement(&mut state)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snaps)?);
        return Ok(());
    }

    println!("Start | {initial}");
    print_text(&snaps, args.monthly);
    let reached = snaps
        .iter()
        .find(|s| s.sa_balance >= s.frs)
        .map(|s| format!("{}-{:02} (age {})", s.year, s.month, s.age))
        .unwrap_or_else(|| "not reached".to_string());
    println!(
        "Summary | months: {} | age: {} | oa: {:.2} | sa: {:.2} | ma: {:.2} | frs: {:.2} | SA reached FRS: {}",
        snaps.len(),
        state.age(),
        state.oa_balance(),
        state.sa_balance(),
        state.ma_balance(),
        state.frs(),
        reached
    );

    Ok(())
}
