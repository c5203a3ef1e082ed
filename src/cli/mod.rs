// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap, loads the config once and hands
// it to the Layer 2 use case for the chosen subcommand.
//
//   shopping-classifier [--config cfg.json] train    --data-root ... --out-dir ...
//   shopping-classifier [--config cfg.json] predict  --data-root ... --model-root ...
//                                                    --test-root ... --test-div ...
//                                                    --out-path ... [--readable]
//   shopping-classifier evaluate --predictions ... --answers ...

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, PredictArgs, TrainArgs};
use std::path::PathBuf;

use crate::infra::config::AppConfig;

#[derive(Parser, Debug)]
#[command(
    name = "shopping-classifier",
    version,
    about = "Train a product category classifier and predict b/m/s/d codes."
)]
pub struct Cli {
    /// JSON config file; built-in defaults apply when omitted
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config = AppConfig::load_or_default(self.config.as_deref())?;
        match self.command {
            Commands::Train(args)    => run_train(&config, args),
            Commands::Predict(args)  => run_predict(&config, args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(config: &AppConfig, args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Training on '{}'", args.data_root.display());
    let summary = TrainUseCase::new(config, &args.data_root, &args.out_dir).execute()?;

    println!(
        "Training complete after {} epoch(s). Model saved to '{}'.",
        summary.epochs_run(),
        args.out_dir.display(),
    );
    Ok(())
}

fn run_predict(config: &AppConfig, args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let written = PredictUseCase::new(
        config,
        &args.data_root,
        &args.model_root,
        &args.test_root,
        args.test_div.as_str(),
        &args.out_path,
        args.readable,
    )
    .execute()?;

    println!("Wrote {} predictions to '{}'.", written, args.out_path.display());
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;
    use crate::domain::taxonomy::Level;

    let report = EvaluateUseCase::new(&args.predictions, &args.answers).execute()?;
    for level in Level::ALL {
        println!("{}-Accuracy: {:.4}", level, report.accuracy_of(level));
    }
    println!("score: {:.4}", report.score);
    Ok(())
}
