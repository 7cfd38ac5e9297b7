//! marble CLI - binary entry point.
//!
//! # Architecture
//!
//! ```text
//! main() -> parse_args() -> run()
//!                            |
//!                            v
//!              Relay::mount(sandbox) -> set_params -> poll until
//!              svg-ready | surface stopped | deadline -> SVG out
//! ```
//!
//! The rendered SVG goes to stdout (or `--out`), so logs go to a file under
//! `~/.marble/logs/` and never to the standard streams.

use std::{
    env,
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use marble_config::MarbleConfig;
use marble_relay::Relay;
use marble_types::VizParams;

/// Poll cadence while waiting for the sandbox.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Events handled per poll.
const EVENT_BUDGET: usize = 64;

/// Slack past the visualization window before the run is abandoned. The
/// relay itself never times out; the deadline is this binary's policy.
const DEADLINE_GRACE: Duration = Duration::from_secs(2);

const USAGE: &str = "\
marble - visualize reactive-stream code as an animated SVG diagram

Usage:
  marble list
  marble run <example-or-file> [--solution] [--out FILE] [--time-window MS]

Commands:
  list    Show the built-in example catalog
  run     Visualize a catalog example (by key) or a code file

Options:
  --solution         Also render the example's reference solution
  --out FILE         Write the SVG to FILE instead of stdout
  --time-window MS   Override the visualization time window
";

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    if let Some((path, file)) = open_log_file() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();
        tracing::info!(path = %path.display(), "logging initialized");
        return;
    }

    // No writable log location: prefer no logs over corrupting the SVG
    // stream on stdout.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> Option<(PathBuf, std::fs::File)> {
    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && fs::create_dir_all(parent).is_err()
        {
            continue;
        }
        if let Ok(file) = OpenOptions::new().create(true).append(true).open(&candidate) {
            return Some((candidate, file));
        }
    }
    None
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(config_path) = marble_config::config_path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("marble.log"));
    }
    candidates.push(PathBuf::from(".marble").join("logs").join("marble.log"));
    candidates
}

#[derive(Debug, PartialEq, Eq)]
enum CliCommand {
    List,
    Run(RunArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    target: String,
    solution: bool,
    out: Option<PathBuf>,
    time_window: Option<u64>,
}

fn parse_args(args: &[String]) -> Result<CliCommand> {
    let mut iter = args.iter();
    match iter.next().map(String::as_str) {
        Some("list") => Ok(CliCommand::List),
        Some("run") => {
            let mut target = None;
            let mut solution = false;
            let mut out = None;
            let mut time_window = None;

            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--solution" => solution = true,
                    "--out" => {
                        let value = iter.next().context("--out requires a file path")?;
                        out = Some(PathBuf::from(value));
                    }
                    "--time-window" => {
                        let value = iter.next().context("--time-window requires a value")?;
                        let ms: u64 = value
                            .parse()
                            .with_context(|| format!("invalid time window '{value}'"))?;
                        if ms == 0 {
                            bail!("time window must be positive");
                        }
                        time_window = Some(ms);
                    }
                    other if other.starts_with("--") => bail!("unknown option '{other}'"),
                    other => {
                        if target.replace(other.to_string()).is_some() {
                            bail!("run takes a single example key or file path");
                        }
                    }
                }
            }

            let target = target.context("run requires an example key or file path")?;
            Ok(CliCommand::Run(RunArgs {
                target,
                solution,
                out,
                time_window,
            }))
        }
        _ => bail!("{USAGE}"),
    }
}

/// Resolve the run target: catalog key first, then file path.
fn resolve_params(args: &RunArgs, default_time_window: u64) -> Result<VizParams> {
    if let Some(example) = marble_catalog::get(&args.target) {
        let solution = if args.solution {
            Some(
                example
                    .solution()
                    .with_context(|| {
                        format!("example '{}' has no reference solution", args.target)
                    })?
                    .to_string(),
            )
        } else {
            None
        };
        let time_window = args.time_window.unwrap_or_else(|| example.time_window());
        return VizParams::new(time_window, example.code(), solution)
            .context("catalog entry produced invalid parameters");
    }

    if args.solution {
        bail!("--solution only applies to catalog examples");
    }
    let code = fs::read_to_string(&args.target)
        .with_context(|| format!("'{}' is neither a catalog key nor a readable file", args.target))?;
    let time_window = args.time_window.unwrap_or(default_time_window);
    VizParams::new(time_window, code, None)
        .with_context(|| format!("'{}' holds no visualizable code", args.target))
}

fn list() {
    for example in marble_catalog::all() {
        let solution = if example.solution().is_some() {
            "  [solution]"
        } else {
            ""
        };
        println!("{:24}{}{}", example.key(), example.name(), solution);
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let config = MarbleConfig::load()?;
    let Some(sandbox) = config.sandbox().cloned() else {
        let hint = marble_config::config_path()
            .map_or_else(|| "~/.marble/config.toml".to_string(), |p| p.display().to_string());
        bail!("no sandbox configured; add a [sandbox] section to {hint} or set MARBLE_SANDBOX");
    };

    let params = resolve_params(&args, config.time_window())?;
    let time_window = Duration::from_millis(params.time_window());

    let svg_slot: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&svg_slot);
    let mut relay = Relay::mount(
        sandbox,
        Box::new(move |svg| {
            *sink.lock().expect("svg slot poisoned") = Some(svg.to_string());
        }),
    )?;

    relay.set_params(Some(params.into_shared())).await?;

    let deadline = tokio::time::Instant::now() + time_window + DEADLINE_GRACE;
    let mut ticks = tokio::time::interval(POLL_INTERVAL);
    ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let svg = loop {
        ticks.tick().await;
        relay.poll_events(EVENT_BUDGET);

        if let Some(svg) = svg_slot.lock().expect("svg slot poisoned").take() {
            break svg;
        }
        if !relay.is_mounted() {
            let detail = relay
                .error()
                .map_or_else(String::new, |error| format!(": {error}"));
            relay.unmount().await;
            bail!("sandbox exited before the diagram settled{detail}");
        }
        if tokio::time::Instant::now() >= deadline {
            let detail = relay
                .error()
                .map_or_else(String::new, |error| format!(": {error}"));
            relay.unmount().await;
            bail!("no diagram within the time window{detail}");
        }
    };

    if let Some(error) = relay.error() {
        tracing::warn!("diagram settled with an error on display: {error}");
    }
    relay.unmount().await;

    match args.out {
        Some(path) => fs::write(&path, svg)
            .with_context(|| format!("writing SVG to {}", path.display()))?,
        None => println!("{svg}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    match parse_args(&args)? {
        CliCommand::List => {
            list();
            Ok(())
        }
        CliCommand::Run(run_args) => run(run_args).await,
    }
}
