use clap::{Args, Parser};
use config::Config;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod config;
mod lifecycle;
mod metrics_defs;
mod observability;

#[derive(Parser)]
#[command(name = "collector", version, about = "Telemetry collector")]
enum CliCommand {
    /// Serve the configured pipelines. SIGHUP reloads the configuration.
    Run(ConfigArgs),
    /// Check a configuration file and exit
    Validate(ConfigArgs),
    /// Print every metric the collector emits
    ListMetrics,
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long, short, default_value = "collector.yaml")]
    config: PathBuf,
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();

    match &cli {
        CliCommand::Run(args) => run_collector(&args.config),
        CliCommand::Validate(args) => match Config::load(&args.config) {
            Ok(_) => {
                println!("{}: ok", args.config.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {e}", args.config.display());
                ExitCode::FAILURE
            }
        },
        CliCommand::ListMetrics => {
            let defs = receiver::metrics_defs::ALL_METRICS
                .iter()
                .chain(metrics_defs::ALL_METRICS);
            for def in defs {
                println!(
                    "{}\t{}\t{}",
                    def.name,
                    def.metric_type.as_str(),
                    def.description
                );
            }
            ExitCode::SUCCESS
        }
    }
}

fn run_collector(path: &Path) -> ExitCode {
    let config = match Config::load(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };

    let _sentry = observability::init_logging(config.logging.as_ref());
    if let Some(metrics) = &config.metrics {
        if let Err(e) = observability::init_metrics(metrics) {
            tracing::error!(error = %e, "metrics disabled");
        }
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "could not start runtime");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(lifecycle::run(path, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "collector stopped with error");
            ExitCode::FAILURE
        }
    }
}
