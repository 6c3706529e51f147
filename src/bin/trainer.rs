//! Offline pipeline CLI: dataset preparation, feature engineering, model
//! training and evaluation as subcommands.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use credrisk::classifier::{GbdtClassifier, GbdtParams};
use credrisk::dataset::load_csv;
use credrisk::encoder_store::SledEncoderStore;
use credrisk::evaluation::{evaluate, write_report};
use credrisk::training;

#[derive(Parser, Debug)]
#[clap(author, version, about = "credrisk offline pipeline", long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Filter raw columns, drop unlabeled rows, fill missing values
    Prep {
        #[clap(long)]
        input: PathBuf,
        #[clap(long)]
        output: PathBuf,
    },
    /// Derive model features and the default flag
    Engineer {
        #[clap(long)]
        input: PathBuf,
        #[clap(long)]
        output: PathBuf,
    },
    /// Fit the classifier and persist model, manifest and encoder table
    Train {
        #[clap(long)]
        input: PathBuf,
        #[clap(long)]
        model: PathBuf,
        #[clap(long)]
        encoders: PathBuf,
        #[clap(long, default_value_t = 5)]
        max_depth: u32,
        #[clap(long, default_value_t = 200)]
        iterations: usize,
        #[clap(long, default_value_t = 0.1)]
        shrinkage: f64,
        #[clap(long, default_value_t = 42)]
        seed: u64,
    },
    /// Score a labeled dataset with a stored model and write the report
    Evaluate {
        #[clap(long)]
        model: PathBuf,
        #[clap(long)]
        data: PathBuf,
        #[clap(long)]
        encoders: PathBuf,
        #[clap(long)]
        report: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();

    match args.command {
        Command::Prep { input, output } => {
            let rows = training::prepare(&input, &output)
                .with_context(|| format!("preparing {}", input.display()))?;
            println!("Prepared {rows} rows -> {}", output.display());
        }
        Command::Engineer { input, output } => {
            let rows = training::engineer(&input, &output)
                .with_context(|| format!("engineering {}", input.display()))?;
            println!("Engineered {rows} rows -> {}", output.display());
        }
        Command::Train {
            input,
            model,
            encoders,
            max_depth,
            iterations,
            shrinkage,
            seed,
        } => {
            let params = GbdtParams {
                max_depth,
                iterations,
                shrinkage,
                ..GbdtParams::default()
            };
            let outcome = training::train(&input, &model, &encoders, params, seed)
                .with_context(|| format!("training on {}", input.display()))?;
            println!(
                "Training complete | AUC: {:.3}, Accuracy: {:.3}",
                outcome.auc, outcome.accuracy
            );
            println!("Model saved at: {}", model.display());
        }
        Command::Evaluate {
            model,
            data,
            encoders,
            report,
        } => {
            let classifier = GbdtClassifier::load(&model)
                .with_context(|| format!("loading model {}", model.display()))?;
            let store = SledEncoderStore::open(&encoders)
                .with_context(|| format!("opening encoder store {}", encoders.display()))?;
            let table = store.load().context("loading encoder table")?;
            let set = load_csv(&data).with_context(|| format!("loading {}", data.display()))?;

            let result = evaluate(&classifier, &table, set).context("evaluating model")?;
            write_report(&result, &report)
                .with_context(|| format!("writing {}", report.display()))?;
            println!(
                "Evaluation complete | AUC: {:.3} over {} rows. Report saved to {}",
                result.auc,
                result.rows,
                report.display()
            );
        }
    }

    Ok(())
}
