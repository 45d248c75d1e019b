use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;

use birthday_core::{
    apply_all, build_plan, find_by_name, review, verify_digest, Authorizer, CalendarTextParser,
    Config, ConfigOverrides, ContactRecord, Error, NormalizeOptions, PageCursor, Plan,
    SnapshotAuthorizer, WriteMode,
};

mod logging;
mod render;

/// Normalize contact birthdays to structured dates
///
/// Every birthday becomes a {year, month, day} date; an unknown year becomes
/// the default year. Run `plan` first, review it, then `apply --commit
/// --confirm <digest>` to write the exact same changes back.
#[derive(Parser)]
#[command(name = "birthday-cli", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

#[derive(Args)]
struct GlobalOpts {
    /// JSON config file (default_year, do_update, page_size, person_fields);
    /// BIRTHDAY_* environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Year written when a birthday has no real year
    #[arg(long, global = true)]
    default_year: Option<i32>,

    /// Contacts requested per page
    #[arg(long, global = true)]
    page_size: Option<u32>,

    /// Treat this as the current calendar year instead of the local clock
    #[arg(long, global = true)]
    current_year: Option<i32>,

    /// Print nothing on stdout
    #[arg(short, long, global = true)]
    quiet: bool,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Dry run: show every change that would be written
    Plan {
        /// Contact snapshot (JSON with a "connections" array)
        snapshot: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Regenerate the plan and write it back
    Apply {
        /// Contact snapshot (JSON with a "connections" array)
        snapshot: PathBuf,
        /// Commit the changes (otherwise a dry run unless do_update is set)
        #[arg(long)]
        commit: bool,
        /// Digest printed by `plan`; required to commit
        #[arg(long)]
        confirm: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the stored record of one contact
    Review {
        /// Contact snapshot
        snapshot: PathBuf,
        /// Resource name, e.g. people/c123
        resource_name: String,
    },

    /// List contacts whose first name entry matches
    Find {
        /// Contact snapshot
        snapshot: PathBuf,
        /// Display, given, or family name
        name: String,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.global.verbose, cli.global.quiet);
    if cli.global.quiet {
        colored::control::set_override(false);
    }

    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            2
        }
    };

    process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32, Error> {
    let quiet = cli.global.quiet;
    match cli.command {
        Commands::Plan { snapshot, json } => {
            let config = load_config(&cli.global)?;
            let options = normalize_options(&cli.global, &config);
            let (plan, _) = plan_for(&snapshot, &config, &options)?;
            if !quiet {
                if json {
                    print_json(&render::plan_json(&plan))?;
                } else {
                    render::print_plan(&plan);
                }
            }
            Ok(0)
        }

        Commands::Apply {
            snapshot,
            commit,
            confirm,
            json,
        } => {
            let config = load_config(&cli.global)?;
            let options = normalize_options(&cli.global, &config);
            let mode = if commit {
                WriteMode::Commit
            } else {
                config.write_mode()
            };

            let (plan, mut cursor) = plan_for(&snapshot, &config, &options)?;
            if !quiet && !json {
                render::print_plan(&plan);
                println!();
            }

            if mode == WriteMode::Commit {
                let Some(expected) = confirm else {
                    eprintln!(
                        "{} refusing to commit without --confirm <digest>; run `plan` and review it first",
                        "error:".red().bold()
                    );
                    return Ok(1);
                };
                if let Err(e) = verify_digest(&plan.report.proposals, &expected) {
                    eprintln!("{} {}", "error:".red().bold(), e);
                    return Ok(1);
                }
            }

            let service = cursor
                .service_mut()
                .ok_or_else(|| Error::Service("no authorized session".to_string()))?;
            let summary = apply_all(service, &plan.report.proposals, mode);
            if !quiet {
                if json {
                    let mut out = render::summary_json(&summary);
                    out["plan"] = render::plan_json(&plan);
                    print_json(&out)?;
                } else {
                    render::print_summary(&summary);
                }
            }
            Ok(if summary.failed() > 0 { 1 } else { 0 })
        }

        Commands::Review {
            snapshot,
            resource_name,
        } => {
            let config = load_config(&cli.global)?;
            let mut service = SnapshotAuthorizer::new(snapshot).authorize()?;
            let record = review(&mut service, &resource_name, &config.person_fields)?;
            if !quiet {
                print_json(&record)?;
            }
            Ok(0)
        }

        Commands::Find { snapshot, name } => {
            let config = load_config(&cli.global)?;
            let records = fetch_all(&snapshot, &config)?;
            let found = find_by_name(&records, &name);
            if !quiet {
                print_json(&found)?;
            }
            Ok(if found.is_empty() { 1 } else { 0 })
        }

        Commands::Version => {
            if !quiet {
                println!(
                    "birthday-cli {} (birthday-core {})",
                    env!("CARGO_PKG_VERSION"),
                    birthday_core::VERSION
                );
            }
            Ok(0)
        }
    }
}

fn load_config(opts: &GlobalOpts) -> Result<Config, Error> {
    let overrides = ConfigOverrides {
        default_year: opts.default_year,
        page_size: opts.page_size,
    };
    let config = Config::load_layered(opts.config.as_deref(), &overrides)?;
    debug!(?config, "configuration loaded");
    Ok(config)
}

fn normalize_options(opts: &GlobalOpts, config: &Config) -> NormalizeOptions {
    match opts.current_year {
        Some(year) => config.normalize_options(year),
        None => NormalizeOptions::for_today(config.default_year),
    }
}

fn plan_for(
    snapshot: &Path,
    config: &Config,
    options: &NormalizeOptions,
) -> Result<(Plan, PageCursor<SnapshotAuthorizer>), Error> {
    let mut cursor = PageCursor::new(SnapshotAuthorizer::new(snapshot), config.list_request());
    let plan = build_plan(&mut cursor, options, &CalendarTextParser::new())?;
    Ok((plan, cursor))
}

fn fetch_all(snapshot: &Path, config: &Config) -> Result<Vec<ContactRecord>, Error> {
    let mut cursor = PageCursor::new(SnapshotAuthorizer::new(snapshot), config.list_request());
    let mut records = Vec::new();
    for page in cursor.pages()? {
        records.extend(page?.connections);
    }
    Ok(records)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
