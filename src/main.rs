//! valkey-topology-check - Detect Valkey deployment topology
//!
//! Connects to one primary, works out whether it runs standalone, with
//! replicas, under sentinel or as a cluster, and checks that a probe write
//! shows up on every replica.

use anyhow::{Context, Result};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use valkey_topology_check::client::ConnectionFactory;
use valkey_topology_check::config::{CliArgs, DetectConfig, OutputFormat};
use valkey_topology_check::detect::DetectionRun;
use valkey_topology_check::report::{DetectionReport, TracingSink};

const EXIT_FATAL: i32 = 1;
const EXIT_PROBE_FAILED: i32 = 2;

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn print_banner(config: &DetectConfig) {
    if config.quiet || config.output_format == OutputFormat::Json {
        return;
    }

    println!("valkey-topology-check v{}", env!("CARGO_PKG_VERSION"));
    println!("====================================");
    println!("Target: {}", config.target);
    println!(
        "Verify: {}, Cluster keys: {}, Probe TTL: {}s",
        config.verify, config.probe.cluster_keys, config.probe.ttl_secs
    );
    println!("====================================\n");
}

fn emit_report(config: &DetectConfig, report: &DetectionReport) -> Result<()> {
    if let Some(ref path) = config.output_path {
        info!("Writing report to: {:?}", path);
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    match config.output_format {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text if !config.quiet => print!("\n{}", report.render_text()),
        OutputFormat::Text => {}
    }
    Ok(())
}

fn run() -> Result<i32> {
    let args = CliArgs::parse_args();
    setup_logging(args.verbose, args.quiet);

    let config =
        DetectConfig::from_cli(&args).map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    print_banner(&config);

    let factory = ConnectionFactory::from_config(&config);
    let mut run = DetectionRun::new(&config, &factory, TracingSink);

    let report = match run.execute() {
        Ok(report) => report,
        Err(e) if e.is_fatal() => {
            error!("Detection aborted ({}): {}", run.state(), e);
            return Ok(EXIT_FATAL);
        }
        Err(e) => return Err(e).context("Detection failed"),
    };

    emit_report(&config, &report)?;

    Ok(if report.has_failures() {
        EXIT_PROBE_FAILED
    } else {
        0
    })
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Error: {:#}", e);
            std::process::exit(EXIT_FATAL);
        }
    }
}
