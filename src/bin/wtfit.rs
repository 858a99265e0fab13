use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::{error, info};

use wtfit_rs::io::{read_observed_csv, save_curves_csv};
use wtfit_rs::{
    init_logger, FitConfiguration, FitEngine, FitListener, LmConfig, ProgressEvent, Result,
};

#[derive(Parser)]
#[command(name = "wtfit")]
#[command(about = "Fit a well-test model to pressure and derivative data")]
struct Args {
    /// Fit configuration JSON (model id, parameters, weight)
    #[arg(short, long)]
    config: PathBuf,

    /// Observed data CSV with columns time, delta_p, derivative
    #[arg(short, long)]
    data: PathBuf,

    /// Where to write the result JSON (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Optional CSV export of the fitted curves
    #[arg(long)]
    curves: Option<PathBuf>,

    /// Maximum number of accepted iterations, overriding --lm-config
    #[arg(short, long)]
    max_iterations: Option<usize>,

    /// Derivative channel weight in [0, 1], overriding the configuration
    #[arg(short, long)]
    weight: Option<f64>,

    /// Optional LmConfig JSON with the remaining tuning constants
    #[arg(long)]
    lm_config: Option<PathBuf>,
}

struct LogProgress;

impl FitListener for LogProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        info!(
            iteration = event.iteration,
            error = event.error,
            lambda = event.lambda,
            "progress {:>3}%",
            event.progress
        );
    }
}

/// Tuning constants from `--lm-config` (or the defaults), with explicit
/// command-line flags taking precedence.
fn tuning(args: &Args) -> Result<LmConfig> {
    let mut lm_config = match &args.lm_config {
        Some(path) => serde_json::from_str::<LmConfig>(&std::fs::read_to_string(path)?)?,
        None => LmConfig::default(),
    };
    if let Some(max_iterations) = args.max_iterations {
        lm_config.max_iterations = max_iterations;
    }
    Ok(lm_config)
}

fn run(args: Args) -> Result<bool> {
    let mut configuration = FitConfiguration::load(&args.config)?;
    if let Some(weight) = args.weight {
        configuration.weight = weight;
    }
    let observed = read_observed_csv(&args.data)?;
    let time = observed.time().clone();

    let lm_config = tuning(&args)?;

    info!(
        model = %configuration.model_id,
        samples = observed.len(),
        "loaded {} and {}",
        args.config.display(),
        args.data.display()
    );

    let mut engine = FitEngine::with_builtin_models().with_config(lm_config);
    engine.add_listener(Arc::new(LogProgress));

    let start = Instant::now();
    let result = engine.start_fit(configuration, observed)?.wait()?;
    info!("fit finished in {:.1} ms", start.elapsed().as_secs_f64() * 1e3);
    info!("\n{}", result);

    let json = result.to_json_string()?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)?;
            info!("result written to {}", path.display());
        }
        None => println!("{}", json),
    }
    if let Some(path) = args.curves.as_ref().filter(|_| !result.curves.pressure.is_empty()) {
        save_curves_csv(path, &time, &result)?;
        info!("curves written to {}", path.display());
    }

    Ok(result.converged)
}

fn main() -> ExitCode {
    init_logger();

    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            error!("{}", err);
            ExitCode::from(2)
        }
    }
}
