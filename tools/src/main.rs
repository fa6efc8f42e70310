//! quote-runner: headless rating runner for the rating engine.
//!
//! Usage:
//!   quote-runner --scenarios data/scenarios/sample_scenarios.json --db quotes.db
//!   quote-runner --synthetic 200 --seed 12345
//!   quote-runner --options disability_income
//!   quote-runner --db quotes.db --replay <run_id>
//!   quote-runner --ipc-mode

use anyhow::{Context, Result};
use rating_core::{
    config::EngineConfig,
    engine::RatingEngine,
    input::Overrides,
    output::RateOutput,
    run::RunStatus,
    scenario::Scenario,
    store::RatingStore,
};
use std::env;
use std::io::{self, BufRead, Write};

mod synthetic;

/// One entry of a --scenarios file.
#[derive(serde::Deserialize)]
struct ScenarioRequest {
    scenario: Scenario,
    #[serde(default)]
    overrides: Overrides,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Rate {
        scenario: Scenario,
        #[serde(default)]
        overrides: Overrides,
        #[serde(default)]
        user_id: Option<String>,
    },
    Options {
        product_type: String,
    },
    Replay {
        run_id: String,
    },
    Summary {
        scenario_id: String,
    },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let synthetic = parse_arg(&args, "--synthetic", 0usize);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let scenarios_path = flag_value(&args, "--scenarios");
    let options_for = flag_value(&args, "--options");
    let replay_run = flag_value(&args, "--replay");
    let user_id = flag_value(&args, "--user");

    let config = EngineConfig::load(data_dir)?;
    log::info!(
        "quote-runner: loaded {} rate tables from {data_dir}",
        config.rate_tables.len()
    );
    let store = if db == ":memory:" {
        RatingStore::in_memory()?
    } else {
        RatingStore::open(db)?
    };
    store.migrate()?;
    let engine = RatingEngine::build(&config, store)?;

    if ipc_mode {
        return run_ipc_loop(&engine);
    }

    if let Some(product_type) = options_for {
        match engine.get_product_options(product_type) {
            Some(options) => println!("{}", serde_json::to_string_pretty(&options)?),
            None => println!("{product_type}: not configured"),
        }
        return Ok(());
    }

    if let Some(run_id) = replay_run {
        let report = engine.replay_run(run_id)?;
        println!("=== REPLAY ===");
        println!("  run_id:           {}", report.run_id);
        println!("  input hash match: {}", report.input_hash_matches);
        println!("  output match:     {}", report.output_matches);
        println!("  stored modal:     {:.2}", report.stored.premium_modal);
        println!("  replayed modal:   {:.2}", report.replayed.premium_modal);
        return Ok(());
    }

    println!("quote-runner");
    println!("  engine:    {}", engine.engine_version());
    println!("  products:  {}", engine.registered_products().join(", "));
    println!("  db:        {db}");
    println!("  data_dir:  {data_dir}");
    println!();

    let requests = match scenarios_path {
        Some(path) => load_requests(path)?,
        None => {
            let count = if synthetic == 0 { 10 } else { synthetic };
            println!("  generating {count} synthetic scenarios (seed {seed})");
            synthetic::generate(seed, count, config.clock.today())
                .into_iter()
                .map(|scenario| ScenarioRequest {
                    scenario,
                    overrides: Overrides::new(),
                    user_id: None,
                })
                .collect()
        }
    };

    for request in &requests {
        let user = request.user_id.as_deref().or(user_id);
        let output = engine.rate_scenario(&request.scenario, &request.overrides, user);
        print_quote(&request.scenario, &output);
    }

    print_summary(&engine, &requests)
}

fn load_requests(path: &str) -> Result<Vec<ScenarioRequest>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Cannot read {path}"))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid scenario file {path}"))
}

fn run_ipc_loop(engine: &RatingEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let Some(reply) = handle_ipc(engine, cmd)? else {
            break;
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

/// Answer one IPC command; `None` means quit. Per-command failures are
/// replied as `{"error": ...}` so the session stays open.
fn handle_ipc(engine: &RatingEngine, cmd: IpcCommand) -> Result<Option<serde_json::Value>> {
    let reply = match cmd {
        IpcCommand::Quit => return Ok(None),
        IpcCommand::Rate { scenario, overrides, user_id } => {
            let output = engine.rate_scenario(&scenario, &overrides, user_id.as_deref());
            serde_json::to_value(&output)?
        }
        IpcCommand::Options { product_type } => {
            serde_json::to_value(engine.get_product_options(&product_type))?
        }
        IpcCommand::Replay { run_id } => match engine.replay_run(&run_id) {
            Ok(report) => serde_json::to_value(&report)?,
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        },
        IpcCommand::Summary { scenario_id } => match engine.store().scenario_summary(&scenario_id) {
            Ok(summary) => serde_json::to_value(&summary)?,
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        },
    };
    Ok(Some(reply))
}

fn print_quote(scenario: &Scenario, output: &RateOutput) {
    if output.eligible {
        println!(
            "  {:<16} {:<18} {:>10.2} {}",
            scenario.scenario_id,
            scenario.product_type,
            output.snapshot().premium_modal,
            output.payment_mode.unwrap_or_default()
        );
    } else {
        println!(
            "  {:<16} {:<18} {:>10} {}",
            scenario.scenario_id,
            scenario.product_type,
            "-",
            output.ineligible_reason.as_deref().unwrap_or_default()
        );
    }
}

fn print_summary(engine: &RatingEngine, requests: &[ScenarioRequest]) -> Result<()> {
    let store = engine.store();
    let completed = store.run_count_by_status(RunStatus::Completed)?;
    let ineligible = store.run_count_by_status(RunStatus::Ineligible)?;
    let errors = store.run_count_by_status(RunStatus::Error)?;

    println!();
    println!("=== RUN SUMMARY ===");
    println!("  scenarios rated: {}", requests.len());
    println!("  ledger rows:     {}", store.run_count()?);
    println!("  completed:       {completed}");
    println!("  ineligible:      {ineligible}");
    println!("  errors:          {errors}");

    let mut best: Vec<(String, f64)> = Vec::new();
    for request in requests {
        let id = &request.scenario.scenario_id;
        if best.iter().any(|(seen, _)| seen == id) {
            continue;
        }
        if let Some(premium) = store
            .scenario_summary(id)?
            .and_then(|s| s.best_quoted_premium)
        {
            best.push((id.clone(), premium));
        }
    }
    best.sort_by(|a, b| a.1.total_cmp(&b.1));

    println!();
    println!("=== LOWEST MONTHLY QUOTES ===");
    if best.is_empty() {
        println!("  (No completed quotes)");
    } else {
        for (id, premium) in best.iter().take(5) {
            println!("  {id:<16} ${premium:.2}/mo");
        }
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
