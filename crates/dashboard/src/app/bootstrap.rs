use std::env;
use std::path::PathBuf;

use minemap_engine::ViewMode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Mode {
    Live,
    Replay { trajectory: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AppWiring {
    pub(crate) mode: Mode,
    pub(crate) view: ViewMode,
    pub(crate) seed: Option<u64>,
}

#[derive(Debug, PartialEq)]
enum Invocation {
    Help,
    Run(AppWiring),
}

/// Parses the command line and sets up logging. `Ok(None)` means usage was
/// printed and there is nothing to run.
pub(crate) fn build_app() -> Result<Option<AppWiring>, String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let wiring = match parse_args(&args)? {
        Invocation::Help => {
            print_usage();
            return Ok(None);
        }
        Invocation::Run(wiring) => wiring,
    };

    init_tracing();
    info!("=== Minemap Startup ===");
    Ok(Some(wiring))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut mode = None;
    let mut view = ViewMode::Plan;
    let mut seed = None;

    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => return Ok(Invocation::Help),
            "--3d" => {
                view = ViewMode::Perspective;
                index += 1;
            }
            "--seed" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --seed".to_string())?;
                seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("invalid --seed value '{value}' (expected u64)"))?,
                );
                index += 2;
            }
            "live" if mode.is_none() => {
                mode = Some(Mode::Live);
                index += 1;
            }
            "replay" if mode.is_none() => {
                let path = args
                    .get(index + 1)
                    .filter(|value| !value.starts_with("--"))
                    .ok_or_else(|| "replay requires a trajectory file path".to_string())?;
                mode = Some(Mode::Replay {
                    trajectory: PathBuf::from(path),
                });
                index += 2;
            }
            other => {
                return Err(format!("unknown argument '{other}'\n\n{}", usage_text()));
            }
        }
    }

    Ok(Invocation::Run(AppWiring {
        mode: mode.unwrap_or(Mode::Live),
        view,
        seed,
    }))
}

fn print_usage() {
    println!("{}", usage_text());
}

fn usage_text() -> String {
    [
        "minemap - live site map and trajectory replay",
        "",
        "Usage:",
        "  minemap [live] [--3d] [--seed <u64>]",
        "  minemap replay <trajectory.json> [--3d]",
        "",
        "Live keys: WASD/arrows pan, Q/E orbit, +/- zoom, F alarm filter, Esc quit",
        "Replay keys: Space play/pause, Left/Right step, Home/End seek, [ ] speed",
        "",
        "Environment:",
        "  MINEMAP_ROOT            project root holding config/",
        "  MINEMAP_FEED_PERIOD_MS  feed poll period override",
        "  MINEMAP_SLOW_FRAME_MS   artificial per-frame delay",
        "  RUST_LOG                log filter (default info)",
    ]
    .join("\n")
}
