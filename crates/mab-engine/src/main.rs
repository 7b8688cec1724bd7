use anyhow::{anyhow, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use mab_core::{plan_income, RunType, SessionId};
use mab_engine::logging::{self, LogFormat};
use mab_engine::{
    executor_settings, render_records, render_summary, select_scenarios, BatchEnd, BatchRunner,
    ChromiumLauncher, EngineConfig,
};
use mab_store::{JsonlRunStore, RunStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Exit status when the operator interrupted the batch
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() {
    logging::init(LogFormat::from_env_value(
        std::env::var("LOG_FORMAT").ok().as_deref(),
    ));

    let cli = Command::new("mab-bench")
        .version(mab_engine::VERSION)
        .about("Mortgage affordability benchmark against the broker Portal")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(
            Command::new("run")
                .about("Run a benchmark batch")
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .value_parser(["normal", "credit", "full"])
                        .help("Catalogue filter (overrides RUN_MODE)"),
                )
                .arg(
                    Arg::new("catalogue")
                        .long("catalogue")
                        .value_parser(value_parser!(PathBuf))
                        .help("Scenario catalogue replacing the embedded one"),
                )
                .arg(
                    Arg::new("scenario")
                        .long("scenario")
                        .action(ArgAction::Append)
                        .help("Run only this scenario id (repeatable)"),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize))
                        .help("Stop after this many scenarios"),
                )
                .arg(
                    Arg::new("accept-partials")
                        .long("accept-partials")
                        .action(ArgAction::SetTrue)
                        .help("Count partial-coverage results as successful"),
                )
                .arg(
                    Arg::new("headless")
                        .long("headless")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("headed")
                        .help("Force a headless browser"),
                )
                .arg(
                    Arg::new("headed")
                        .long("headed")
                        .action(ArgAction::SetTrue)
                        .help("Force a visible browser"),
                )
                .arg(
                    Arg::new("store")
                        .long("store")
                        .value_parser(value_parser!(PathBuf))
                        .help("Run store directory"),
                )
                .arg(
                    Arg::new("no-screenshots")
                        .long("no-screenshots")
                        .action(ArgAction::SetTrue)
                        .help("Disable waypoint screenshots"),
                ),
        )
        .subcommand(
            Command::new("plan")
                .about("Print income plans and wait budgets without a browser")
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .value_parser(["normal", "credit", "full"])
                        .help("Catalogue filter (overrides RUN_MODE)"),
                )
                .arg(
                    Arg::new("catalogue")
                        .long("catalogue")
                        .value_parser(value_parser!(PathBuf))
                        .help("Scenario catalogue replacing the embedded one"),
                )
                .arg(
                    Arg::new("scenario")
                        .long("scenario")
                        .action(ArgAction::Append)
                        .help("Only this scenario id (repeatable)"),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Show stored results")
                .arg(
                    Arg::new("session")
                        .long("session")
                        .help("Session id; lists all run summaries when omitted"),
                )
                .arg(
                    Arg::new("store")
                        .long("store")
                        .value_parser(value_parser!(PathBuf))
                        .help("Run store directory"),
                ),
        );

    let matches = cli.get_matches();
    let code = match dispatch(&matches).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "mab-bench failed");
            eprintln!("error: {e:#}");
            1
        }
    };
    std::process::exit(code);
}

async fn dispatch(matches: &ArgMatches) -> anyhow::Result<i32> {
    let config_path = matches.get_one::<PathBuf>("config").cloned();
    match matches.subcommand() {
        Some(("run", args)) => run(config_path, args).await,
        Some(("plan", args)) => plan(config_path, args),
        Some(("report", args)) => report(config_path, args).await,
        _ => Err(anyhow!("unknown subcommand")),
    }
}

async fn run(config_path: Option<PathBuf>, args: &ArgMatches) -> anyhow::Result<i32> {
    let mut config = apply_selection(
        EngineConfig::load(config_path.as_deref()).context("loading configuration")?,
        args,
    )?;
    if let Some(limit) = args.get_one::<usize>("limit") {
        config = config.with_limit(*limit);
    }
    if args.get_flag("accept-partials") {
        config = config.with_accept_partials(true);
    }
    if args.get_flag("headless") {
        config = config.with_headless(true);
    } else if args.get_flag("headed") {
        config = config.with_headless(false);
    }
    if let Some(dir) = args.get_one::<PathBuf>("store") {
        config = config.with_store_dir(dir.clone());
    }
    if args.get_flag("no-screenshots") {
        config = config.with_screenshot_dir(None);
    }
    config.validate_for_run()?;

    let scenarios = select_scenarios(&config)?;
    let store = JsonlRunStore::open(&config.store.dir)
        .await
        .with_context(|| format!("opening run store {}", config.store.dir.display()))?;
    let runner = BatchRunner::new(
        ChromiumLauncher::new(config.browser_settings()),
        Arc::new(store),
        executor_settings(&config),
        config.credentials()?.clone(),
    )
    .with_run_type(config.batch.run_type)
    .with_screenshot_dir(config.store.screenshot_dir.clone());

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; stopping after the current scenario");
            let _ = cancel_tx.send(true);
        }
    });

    let outcome = runner.run(&scenarios, cancel_rx).await?;
    println!("{}", render_records(&outcome.records));
    println!("{}", render_summary(&outcome.summary));

    Ok(match outcome.end {
        BatchEnd::Completed => 0,
        BatchEnd::Cancelled => EXIT_CANCELLED,
        BatchEnd::Fatal(_) => 1,
    })
}

fn plan(config_path: Option<PathBuf>, args: &ArgMatches) -> anyhow::Result<i32> {
    let config = apply_selection(
        EngineConfig::load(config_path.as_deref()).context("loading configuration")?,
        args,
    )?;
    for scenario in select_scenarios(&config)? {
        println!(
            "{} ({}, case {})",
            scenario.id,
            scenario.case_kind,
            scenario.case_ref
        );
        match plan_income(scenario.case_kind, scenario.total_income) {
            Ok(plan) => {
                for line in plan.audit_lines() {
                    println!("  {line}");
                }
            }
            Err(e) => println!("  plan rejected: {e}"),
        }
        println!(
            "  wait budget {}s",
            config.waiter.budget_for(&scenario).as_secs()
        );
    }
    Ok(0)
}

/// Apply the scenario-selection flags shared by `run` and `plan`
fn apply_selection(mut config: EngineConfig, args: &ArgMatches) -> anyhow::Result<EngineConfig> {
    if let Some(mode) = args.get_one::<String>("mode") {
        let run_type: RunType = mode.parse().map_err(|e: String| anyhow!(e))?;
        config = config.with_run_type(run_type);
    }
    if let Some(path) = args.get_one::<PathBuf>("catalogue") {
        config = config.with_catalogue(path.clone());
    }
    if let Some(ids) = args.get_many::<String>("scenario") {
        config = config.with_scenarios(ids.cloned().collect());
    }
    Ok(config)
}

async fn report(config_path: Option<PathBuf>, args: &ArgMatches) -> anyhow::Result<i32> {
    let dir = match args.get_one::<PathBuf>("store") {
        Some(dir) => dir.clone(),
        None => {
            EngineConfig::load(config_path.as_deref())
                .context("loading configuration")?
                .store
                .dir
        }
    };
    let store = JsonlRunStore::open(&dir)
        .await
        .with_context(|| format!("opening run store {}", dir.display()))?;

    match args.get_one::<String>("session") {
        Some(raw) => {
            let session_id: SessionId = raw
                .parse()
                .with_context(|| format!("invalid session id {raw}"))?;
            let stored = store.load_session(session_id).await?;
            println!("{}", render_records(&stored.records));
            match &stored.summary {
                Some(summary) => println!("{}", render_summary(summary)),
                None => println!("No summary stored; the batch did not finish"),
            }
        }
        None => {
            for summary in store.summaries().await? {
                println!("{}", render_summary(&summary));
            }
        }
    }
    Ok(0)
}
