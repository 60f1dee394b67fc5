// File: ./src/cli.rs
//! Command-line parsing and dispatch shared by the `snapcal` binary and its tests.
use crate::config::Config;
use crate::context::AppContext;
use crate::export;
use crate::identity::IdentityProvider;
use crate::inference::{EncodedImage, SidecarRecognizer};
use crate::model::{DateOrder, EventExtractor};
use crate::pipeline::{PipelineError, ScanOutcome, ScanPipeline};
use crate::storage::{EventStore, LocalStorage};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Extract {
        path: PathBuf,
        day_first: bool,
        save: bool,
    },
    Scan {
        path: PathBuf,
    },
    List,
    Export,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub root: Option<PathBuf>,
    pub command: Command,
}

/// Parses `args` without the binary name.
pub fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut root = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-r" | "--root" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("{} requires a path", arg))?;
                root = Some(PathBuf::from(value));
            }
            _ => rest.push(arg.as_str()),
        }
    }

    let command = match rest.as_slice() {
        [] | ["-h"] | ["--help"] | ["help"] => Command::Help,
        ["extract", path, flags @ ..] => {
            let mut day_first = false;
            let mut save = false;
            for flag in flags {
                match *flag {
                    "--day-first" => day_first = true,
                    "--save" => save = true,
                    other => anyhow::bail!("Unknown option for extract: {}", other),
                }
            }
            Command::Extract {
                path: PathBuf::from(path),
                day_first,
                save,
            }
        }
        ["scan", path] => Command::Scan {
            path: PathBuf::from(path),
        },
        ["list"] => Command::List,
        ["export"] => Command::Export,
        other => anyhow::bail!("Unknown command: {}", other.join(" ")),
    };

    Ok(CliArgs { root, command })
}

fn print_outcome(out: &mut dyn Write, outcome: &ScanOutcome) -> Result<()> {
    if let Some(notice) = &outcome.notice {
        log::warn!("{}", notice);
    }
    writeln!(out, "{}", serde_json::to_string_pretty(&outcome.events)?)?;
    Ok(())
}

fn map_pipeline_error(e: PipelineError) -> anyhow::Error {
    match e {
        PipelineError::Unauthenticated => {
            anyhow::anyhow!("No user configured. Set `user_id` in the config file.")
        }
        other => anyhow::Error::new(other),
    }
}

/// Executes `cli.command`, writing results to `out`.
pub fn run(
    cli: &CliArgs,
    ctx: &dyn AppContext,
    config: &Config,
    now: DateTime<Utc>,
    out: &mut dyn Write,
) -> Result<()> {
    let identity = config.identity();

    match &cli.command {
        Command::Help => {
            print_help(out, "snapcal")?;
        }
        Command::Extract {
            path,
            day_first,
            save,
        } => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read text file {:?}", path))?;
            let order = if *day_first {
                DateOrder::DayFirst
            } else {
                config.date_order
            };
            let extractor = EventExtractor::new(order);
            if *save {
                let pipeline = ScanPipeline::new(
                    SidecarRecognizer::new(parent_dir(path)),
                    LocalStorage::new(ctx),
                    extractor,
                );
                let outcome = pipeline
                    .scan_text(&identity, &text, now)
                    .map_err(map_pipeline_error)?;
                print_outcome(out, &outcome)?;
            } else {
                let events = extractor.extract(&text, now);
                writeln!(out, "{}", serde_json::to_string_pretty(&events)?)?;
            }
        }
        Command::Scan { path } => {
            let image = EncodedImage::from_path(path)?;
            let pipeline = ScanPipeline::new(
                SidecarRecognizer::new(parent_dir(path)),
                LocalStorage::new(ctx),
                EventExtractor::new(config.date_order),
            );
            let outcome = pipeline
                .scan(&identity, &image, now)
                .map_err(map_pipeline_error)?;
            print_outcome(out, &outcome)?;
        }
        Command::List => {
            let user = identity
                .current_user()
                .ok_or_else(|| map_pipeline_error(PipelineError::Unauthenticated))?;
            for event in LocalStorage::new(ctx).list(&user)? {
                let record = &event.record;
                let day = record
                    .parsed_date()
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| record.date.clone());
                writeln!(
                    out,
                    "{} {:<5} {}",
                    day,
                    record.time.as_deref().unwrap_or(""),
                    record.title
                )?;
            }
        }
        Command::Export => {
            let user = identity
                .current_user()
                .ok_or_else(|| map_pipeline_error(PipelineError::Unauthenticated))?;
            let events = LocalStorage::new(ctx).list(&user)?;
            writeln!(
                out,
                "{}",
                export::to_ics_string(&events, &config.export_calendar_name)
            )?;
        }
    }
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn print_help(out: &mut dyn Write, binary_name: &str) -> Result<()> {
    writeln!(
        out,
        "Snapcal v{} - Turn photographed flyers into calendar events",
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(out)?;
    writeln!(out, "USAGE:")?;
    writeln!(out, "    {} [--root <path>] <command>", binary_name)?;
    writeln!(out)?;
    writeln!(out, "COMMANDS:")?;
    writeln!(
        out,
        "    extract <file.txt> [--day-first] [--save]   Print events found in recognized text"
    )?;
    writeln!(
        out,
        "    scan <image>                                Recognize an image (sidecar .txt) and save its events"
    )?;
    writeln!(
        out,
        "    list                                        List saved events"
    )?;
    writeln!(
        out,
        "    export                                      Write saved events as .ics to stdout"
    )?;
    writeln!(out)?;
    writeln!(out, "OPTIONS:")?;
    writeln!(
        out,
        "    -r, --root <path>     Use a different directory for config and data."
    )?;
    writeln!(out, "    -h, --help            Show this help message.")?;
    writeln!(out)?;
    writeln!(out, "RECOGNIZED MARKERS (case-insensitive):")?;
    writeln!(out, "    title: / event:             Starts a new event")?;
    writeln!(out, "    date: or 04/10/2025         Event date (month first unless --day-first)")?;
    writeln!(out, "    time: or 14:30              Event time, kept as written")?;
    writeln!(out, "    description: / details:     Event description")?;
    writeln!(out)?;
    writeln!(out, "ENVIRONMENT:")?;
    writeln!(out, "    SNAPCAL_LOG           Log level override (error, warn, info, debug, trace)")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_args(&args(&[])).unwrap().command, Command::Help);
        assert_eq!(parse_args(&args(&["list"])).unwrap().command, Command::List);

        let cli = parse_args(&args(&["--root", "/tmp/x", "extract", "a.txt", "--save"])).unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/x")));
        assert_eq!(
            cli.command,
            Command::Extract {
                path: PathBuf::from("a.txt"),
                day_first: false,
                save: true,
            }
        );

        let cli = parse_args(&args(&["scan", "flyer.png", "-r", "/data"])).unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/data")));
        assert_eq!(
            cli.command,
            Command::Scan {
                path: PathBuf::from("flyer.png")
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&["frobnicate"])).is_err());
        assert!(parse_args(&args(&["extract", "a.txt", "--loud"])).is_err());
        assert!(parse_args(&args(&["--root"])).is_err());
        assert!(parse_args(&args(&["scan"])).is_err());
    }

    #[test]
    fn test_parent_dir_of_bare_file() {
        assert_eq!(parent_dir(Path::new("flyer.png")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("/a/b.png")), PathBuf::from("/a"));
    }
}
