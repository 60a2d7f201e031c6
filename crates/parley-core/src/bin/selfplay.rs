//! Runs a scripted negotiation scenario and prints the report as JSON.
//!
//! Usage: parley-selfplay [scenario.yaml] [--rules negotiation.yaml] [--stable]

use parley_core::{load_rules, run_selfplay, RulesSource, Scenario, SelfPlayConfig};

struct Args {
    scenario: Option<String>,
    rules: Option<String>,
    stable: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        scenario: None,
        rules: None,
        stable: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--rules" => {
                args.rules = Some(it.next().ok_or("--rules needs a path")?);
            }
            "--stable" => args.stable = true,
            other if other.starts_with("--") => return Err(format!("unknown flag {other}")),
            _ => args.scenario = Some(arg),
        }
    }
    Ok(args)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("parley_core=info")
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    };

    let rules_source = match args.rules {
        Some(path) => RulesSource::Path(path),
        None => RulesSource::Embedded,
    };
    let rules = match load_rules(rules_source) {
        Ok(rules) => rules,
        Err(e) => {
            tracing::error!("Failed to load rules: {}", e);
            std::process::exit(1);
        }
    };

    let scenario = match args.scenario.as_deref() {
        Some(path) => Scenario::load(path),
        None => Scenario::embedded(),
    };
    let scenario = match scenario {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to load scenario: {}", e);
            std::process::exit(1);
        }
    };

    let mut config = SelfPlayConfig::from_scenario(&scenario);
    config.jitter = !args.stable;

    let report = match run_selfplay(&rules, &config, &scenario) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Self-play failed: {}", e);
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!("Failed to encode report: {}", e);
            std::process::exit(1);
        }
    }
}
