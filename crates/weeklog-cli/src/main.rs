// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use runtime::{JournalSource, SourceRuntime, StaticSource};
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;
use weeklog_tui::{AppRuntime, UiOptions};

const LOG_FILTER_ENV: &str = "WEEKLOG_LOG";

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let utc_offset = weeklog_app::local_offset();
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `weeklog --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    init_logging(&config)?;

    let ui_options = UiOptions {
        utc_offset,
        ..config.ui_options().with_context(|| {
            format!(
                "invalid [sync]/[list] values in {}",
                options.config_path.display()
            )
        })?
    };

    let journal_path = options.journal_path.clone().or_else(|| config.journal_path());
    let mut runtime = match journal_path {
        Some(path) if !options.demo => {
            SourceRuntime::new(JournalSource::new(path, ui_options.week_start))
        }
        _ => SourceRuntime::new(StaticSource::new(
            ui_options.week_start,
            config.demo_latency()?,
        )),
    };

    let today = weeklog_app::today_at(utc_offset);
    info!(
        source = runtime.source_name(),
        week_start = ui_options.week_start.as_str(),
        "starting weeklog"
    );

    if options.check_only {
        let list = runtime.fetch_week(today).with_context(|| {
            format!(
                "load the current week from the {} source -- check [storage].journal_path or pass --journal",
                runtime.source_name()
            )
        })?;
        println!(
            "ok: {} source, {} entries this week",
            runtime.source_name(),
            list.total_entries()
        );
        return Ok(());
    }

    weeklog_tui::run_app(today, ui_options, &mut runtime)
}

/// Installs a file subscriber when `[log].path` is set. `WEEKLOG_LOG` takes
/// precedence over `[log].level`.
fn init_logging(config: &Config) -> Result<()> {
    let Some(path) = config.log_path() else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_new(config.log_level()))
        .with_context(|| format!("invalid log level {:?}", config.log_level()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    journal_path: Option<PathBuf>,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        journal_path: None,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--journal" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--journal requires a file path"))?;
                options.journal_path = Some(PathBuf::from(value.as_ref()));
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    if options.demo && options.journal_path.is_some() {
        return Err(anyhow!("--demo and --journal cannot be combined"));
    }

    Ok(options)
}

fn print_help() {
    println!("weeklog");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --journal <path>         Read entries from a JSON journal");
    println!("  --demo                   Show the built-in placeholder week");
    println!("  --check                  Validate config and load the current week");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args};
    use anyhow::Result;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/weeklog-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                journal_path: None,
                print_config_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_and_journal_paths() -> Result<()> {
        let options = parse_cli_args(
            vec![
                "--config",
                "/custom/config.toml",
                "--journal",
                "/data/journal.json",
            ],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        assert_eq!(
            options.journal_path,
            Some(PathBuf::from("/data/journal.json"))
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));

        let error = parse_cli_args(vec!["--journal"], default_options_path())
            .expect_err("missing journal value should fail");
        assert!(error.to_string().contains("--journal requires a file path"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(!options.demo);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_rejects_demo_with_journal() {
        let error = parse_cli_args(
            vec!["--demo", "--journal", "/data/journal.json"],
            default_options_path(),
        )
        .expect_err("demo with journal should fail");
        assert!(error.to_string().contains("cannot be combined"));
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }
}
