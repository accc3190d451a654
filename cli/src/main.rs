//! Dockhand - Entry Point
//!
//! One-shot remote deployment: collect the run configuration, execute the
//! stage pipeline against the target host, report, exit 0 or 1.

use std::collections::HashMap;
use std::env;

use colored::Colorize;
use tracing::info;

use dockhand::config::{prompt, DeployConfig, Profile};
use dockhand::logs::{init_logging, LogOptions};
use dockhand::pipeline::{DeployContext, DeployReport, Sequencer};
use dockhand::stages::{cleanup_pipeline, deploy_pipeline};
use dockhand::utils::version_info;

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --cleanup
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        println!(
            "{}",
            serde_json::to_string_pretty(&version_info()).unwrap()
        );
        return;
    }

    // Collect the run configuration: profile file, then arguments, then
    // interactive prompts for whatever is still missing.
    let mut profile = match cli_args.get("profile") {
        Some(path) => match Profile::load(std::path::Path::new(path)) {
            Ok(profile) => profile,
            Err(e) => {
                eprintln!("[ERROR] {}", e);
                std::process::exit(1);
            }
        },
        None => Profile::default(),
    };

    if let Err(e) = profile.apply_args(&cli_args) {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }

    if let Err(e) = prompt::fill_missing(&mut profile) {
        eprintln!("[ERROR] Input collection aborted: {}", e);
        std::process::exit(1);
    }

    let config = match DeployConfig::from_profile(profile) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging; the guard must outlive the run so the file layer
    // flushes before exit.
    let log_options = LogOptions {
        log_level: config.log_level.clone(),
        ..Default::default()
    };
    let guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("[ERROR] Failed to initialize logging: {}", e);
            std::process::exit(1);
        }
    };

    let cleanup = cli_args.contains_key("cleanup");
    let exit_code = run(config, cleanup).await;

    drop(guard);
    std::process::exit(exit_code);
}

async fn run(config: DeployConfig, cleanup: bool) -> i32 {
    let stages = if cleanup {
        cleanup_pipeline()
    } else {
        deploy_pipeline(&config)
    };
    let sequencer = Sequencer::new(stages);
    let mut ctx = DeployContext::new(config);

    info!(
        "Starting {} run {} against {}",
        if cleanup { "cleanup" } else { "deployment" },
        ctx.run_id,
        ctx.session.login()
    );

    let report = sequencer.run(&mut ctx).await;
    print_report(&report);
    if report.succeeded() {
        0
    } else {
        1
    }
}

fn print_report(report: &DeployReport) {
    println!();
    for stage in &report.completed {
        let mut line = format!("  {} {}", "ok".green(), stage.stage);
        if let Some(detail) = &stage.detail {
            line.push_str(&format!(" - {}", detail));
        }
        println!("{}", line);
        for warning in &stage.warnings {
            println!("     {} {}", "warn".yellow(), warning);
        }
    }

    let elapsed = (report.finished_at - report.started_at).num_seconds();
    match &report.failure {
        Some((stage, error)) => {
            println!("  {} {} - {}", "failed".red(), stage, error);
            println!(
                "\n{} (run {}, {}s)",
                "Deployment failed".red(),
                report.run_id,
                elapsed
            );
        }
        None => {
            println!(
                "\n{} (run {}, {}s, {} warnings)",
                "Completed".green(),
                report.run_id,
                elapsed,
                report.warning_count()
            );
        }
    }
}
