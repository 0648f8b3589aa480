use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use avaluo_engine::app::valuation_use_case::ValuationUseCase;
use avaluo_engine::config::EngineConfig;
use avaluo_engine::error::ValuationError;
use avaluo_engine::infra::{JsonFileOutput, JsonFileSource};
use avaluo_engine::logging;
use avaluo_engine::observability;
use avaluo_engine::pipeline::ValuationPipeline;
use avaluo_engine::types::{RentabilitySource, ValuationReport};

const CONFIG_ENV_VAR: &str = "AVALUO_CONFIG";

#[derive(Parser)]
#[command(name = "avaluo")]
#[command(about = "Comparable aggregation and valuation engine for real-estate appraisals")]
#[command(version = "0.1.0")]
struct Cli {
    /// Engine configuration (TOML). Falls back to $AVALUO_CONFIG, then to built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for JSON log files
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Value a property from a request file (target, comparables, market signals)
    Value {
        /// Valuation request JSON
        #[arg(long)]
        input: PathBuf,
        /// Where the report JSON is written
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
        /// Print a Prometheus snapshot of the run's metrics
        #[arg(long)]
        print_metrics: bool,
    },
    /// Validate the configuration and print the effective settings
    CheckConfig,
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let from_env = std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from);
    match path.map(Path::to_path_buf).or(from_env) {
        Some(path) => {
            info!("Loading engine configuration from {}", path.display());
            Ok(EngineConfig::load(&path)?)
        }
        None => {
            info!("No configuration file given, using defaults");
            Ok(EngineConfig::default())
        }
    }
}

fn print_summary(report: &ValuationReport, saved_to: &Path) {
    let result = &report.result;
    let stages = &report.stages;

    println!("\n📊 Valuation {}:", report.run_id);
    println!(
        "   Target: {:.1} m²{}",
        report.target.area,
        if report.target.is_lot { " (lot)" } else { "" }
    );
    println!(
        "   Comparables: {} received → {} normalized → {} unique → {} in range ({}) → {} final",
        stages.received,
        stages.normalized,
        stages.deduplicated,
        stages.in_range,
        stages.range_stage.as_str(),
        stages.final_count
    );
    println!(
        "   Yield: {:.4}%/month ({:?})",
        report.yield_rate.value * 100.0,
        report.yield_rate.origin
    );
    if let Some(direct) = result.direct_sale_value {
        println!("   Direct sale value: {:.0}", direct);
    }
    if let Some(rentability) = result.rentability_value {
        let synthetic = if result.rentability_source == RentabilitySource::SyntheticFromDirect {
            " (synthetic)"
        } else {
            ""
        };
        println!("   Rentability value: {:.0}{}", rentability, synthetic);
    }
    println!(
        "   Final value: {:.0} ({})",
        result.final_value,
        result.final_value_source.as_str()
    );
    println!("   Range: {:.0} – {:.0}", result.range_min, result.range_max);
    println!("   Price per m²: {:.0}", result.price_per_area_used);
    println!(
        "   Confidence: {} (quality {:.2}, dispersion {:.2})",
        result.confidence.level,
        result.confidence.quality_score,
        result.confidence.dispersion_coefficient
    );
    println!("   Report: {}", saved_to.display());
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = logging::init_logging(&cli.log_dir);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Value {
            input,
            output_dir,
            print_metrics,
        } => {
            let metrics_handle = if print_metrics {
                Some(observability::init().map_err(|e| anyhow!(e))?)
            } else {
                None
            };

            println!("🏠 Running valuation for {}...", input.display());

            let source = JsonFileSource::new(&input);
            let target = source.load_request().await?.target.clone();

            let use_case = ValuationUseCase::new(
                Box::new(source),
                ValuationPipeline::with_config(config),
                Box::new(JsonFileOutput::new(&output_dir)),
            );

            match use_case.value_property(&target).await {
                Ok(report) => {
                    let saved_to = JsonFileOutput::new(&output_dir).report_path(&report);
                    print_summary(&report, &saved_to);
                }
                Err(e) => {
                    match e.downcast_ref::<ValuationError>() {
                        Some(ve) if ve.is_insufficient_data() => {
                            println!("❌ Not enough market data to value this property: {}", ve);
                        }
                        _ => {
                            error!("Valuation failed: {:#}", e);
                            println!("❌ Valuation failed: {:#}", e);
                        }
                    }
                    return Err(e);
                }
            }

            if let Some(handle) = metrics_handle {
                println!("\n📈 Metrics:\n{}", handle.render());
            }
        }
        Commands::CheckConfig => {
            let rendered = config.to_toml_string()?;
            println!("✅ Configuration is valid\n");
            println!("{}", rendered);
        }
    }

    Ok(())
}
