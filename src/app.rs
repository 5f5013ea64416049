//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - initializes logging and resolves settings
//! - loads (and refreshes) the requested window
//! - prints tables
//! - writes optional exports

use std::time::Duration;

use clap::Parser;

use crate::cli::{BootstrapArgs, Command, CurveArgs, GlobalArgs, SpreadArgs, WindowArgs};
use crate::config::{DataConfig, Settings};
use crate::data::{DateInput, TreasuryClient};
use crate::domain::SpreadPair;
use crate::error::AppError;

pub mod pipeline;

const SUBCOMMANDS: [&str; 5] = ["frame", "spreads", "curves", "bootstrap", "datasets"];

/// Flags that consume the next token as their value.
const VALUE_FLAGS: [&str; 15] = [
    "-d",
    "--date",
    "--dataset",
    "-n",
    "--lookback",
    "-m",
    "--maturity",
    "--export",
    "--export-json",
    "-p",
    "--pair",
    "--last",
    "--year",
    "--config",
    "--timeout",
];

/// Entry point for the `yields` binary.
pub fn run() -> Result<(), AppError> {
    // We want `yields` and `yields -d 20190614` to behave like `yields frame ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    init_logging(cli.global.verbose);

    let settings = resolve_settings(&cli.global)?;
    let config = DataConfig::load(&settings.config_path)?;

    match cli.command {
        Command::Frame(args) => handle_frame(&config, &settings, args),
        Command::Spreads(args) => handle_spreads(&config, &settings, args),
        Command::Curves(args) => handle_curves(&config, &settings, args),
        Command::Bootstrap(args) => handle_bootstrap(&config, &settings, args),
        Command::Datasets => {
            print!("{}", crate::report::format_datasets(&config));
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .try_init();
}

fn resolve_settings(global: &GlobalArgs) -> Result<Settings, AppError> {
    let mut settings = Settings::from_env()?;
    if let Some(path) = &global.config {
        settings.config_path = path.clone();
    }
    if let Some(secs) = global.timeout {
        settings.http_timeout = Duration::from_secs(secs);
    }
    log::debug!(
        "config={} timeout={:?}",
        settings.config_path.display(),
        settings.http_timeout
    );
    Ok(settings)
}

fn load(config: &DataConfig, settings: &Settings, args: &WindowArgs) -> Result<pipeline::Window, AppError> {
    let client = TreasuryClient::new(settings.http_timeout)?;
    pipeline::load_window(
        config,
        client,
        args.date.clone().map(DateInput::from),
        &args.dataset,
        args.lookback,
        &args.maturity,
    )
}

fn handle_frame(config: &DataConfig, settings: &Settings, args: WindowArgs) -> Result<(), AppError> {
    let window = load(config, settings, &args)?;

    println!(
        "{}",
        crate::report::format_run_summary(&window.dataset, window.as_of, &window.frame)
    );
    print!("{}", crate::report::format_frame(&window.frame));

    export(&args, &window)
}

fn handle_spreads(config: &DataConfig, settings: &Settings, args: SpreadArgs) -> Result<(), AppError> {
    let mut window = load(config, settings, &args.window)?;

    let pairs = if args.pairs.is_empty() {
        SpreadPair::defaults()
    } else {
        args.pairs
    };
    let with_spreads = crate::report::compute_spreads(&window.frame, &pairs)?;
    window.frame = with_spreads.select(&crate::report::spread_columns(&pairs))?;

    println!(
        "{}",
        crate::report::format_run_summary(&window.dataset, window.as_of, &window.frame)
    );
    print!("{}", crate::report::format_spreads(&window.frame));

    export(&args.window, &window)
}

fn handle_curves(config: &DataConfig, settings: &Settings, args: CurveArgs) -> Result<(), AppError> {
    let window = load(config, settings, &args.window)?;
    let snapshot = crate::report::curve_snapshot(&window.frame, args.last);

    println!(
        "{}",
        crate::report::format_run_summary(&window.dataset, window.as_of, &window.frame)
    );
    print!("{}", crate::report::format_curves(&snapshot));

    export(&args.window, &window)
}

fn handle_bootstrap(config: &DataConfig, settings: &Settings, args: BootstrapArgs) -> Result<(), AppError> {
    let client = TreasuryClient::new(settings.http_timeout)?;
    let rows = pipeline::bootstrap(config, client, &args.dataset, args.year)?;
    println!(
        "Created {} with {rows} row(s).",
        config.local_path(&args.dataset)?.display()
    );
    Ok(())
}

fn export(args: &WindowArgs, window: &pipeline::Window) -> Result<(), AppError> {
    if let Some(path) = &args.export {
        crate::io::export::write_frame_csv(path, &window.frame)?;
    }
    if let Some(path) = &args.export_json {
        crate::io::frame_file::write_frame_json(path, &window.frame, &window.dataset, window.as_of)?;
    }
    Ok(())
}

/// Rewrite argv so `yields` defaults to `yields frame`.
///
/// Rules:
/// - `yields`                       -> `yields frame`
/// - `yields -d 20190614 ...`       -> `yields frame -d 20190614 ...`
/// - `yields --help/--version/-h`   -> unchanged (show top-level help/version)
/// - argv whose first positional is a subcommand -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("frame".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let names_subcommand = first_positional(&argv).is_some_and(|a| SUBCOMMANDS.contains(&a));
    if names_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "frame flags".
    if arg1.starts_with('-') {
        argv.insert(1, "frame".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

/// First token after the program name that is neither a flag nor a flag's value.
fn first_positional(argv: &[String]) -> Option<&str> {
    let mut tokens = argv.iter().skip(1);
    while let Some(token) = tokens.next() {
        if !token.starts_with('-') {
            return Some(token.as_str());
        }
        if VALUE_FLAGS.contains(&token.as_str()) {
            tokens.next();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_frame() {
        assert_eq!(rewrite_args(argv(&["yields"])), argv(&["yields", "frame"]));
        assert_eq!(
            rewrite_args(argv(&["yields", "-d", "20190614"])),
            argv(&["yields", "frame", "-d", "20190614"])
        );
    }

    #[test]
    fn flag_values_named_like_subcommands_still_default_to_frame() {
        assert_eq!(
            rewrite_args(argv(&["yields", "--dataset", "curves", "-d", "20190614"])),
            argv(&["yields", "frame", "--dataset", "curves", "-d", "20190614"])
        );
        assert_eq!(
            rewrite_args(argv(&["yields", "--config", "spreads", "-v"])),
            argv(&["yields", "frame", "--config", "spreads", "-v"])
        );
    }

    #[test]
    fn explicit_subcommands_and_help_are_untouched() {
        for args in [
            argv(&["yields", "spreads", "-n", "10"]),
            argv(&["yields", "--config", "x.toml", "curves"]),
            argv(&["yields", "--help"]),
            argv(&["yields", "datasets"]),
            argv(&["yields", "-v", "--timeout", "5", "bootstrap", "--year", "2019"]),
        ] {
            assert_eq!(rewrite_args(args.clone()), args);
        }
    }
}
