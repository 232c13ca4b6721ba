use clap::{Parser, Subcommand, ValueEnum};
use framegate::{report, Classifier, Config, FeatureTable, FrameStream};
use std::path::{Path, PathBuf};

/// Speech/music frame gating: train classifiers, evaluate streams, and
/// search gating parameters under an accuracy-degradation budget
#[derive(Parser)]
#[command(name = "framegate")]
#[command(about = "Speech/music frame classification with compute-reduction gating")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModelKind {
    Kernel,
    Mixture,
    Weighted,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a classifier and evaluate the baseline pipeline over streams
    Evaluate {
        /// Labeled feature table (JSON)
        table: PathBuf,

        /// Frame streams (JSON array)
        streams: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Classifier kind
        #[arg(long, value_enum, default_value = "kernel")]
        model: ModelKind,

        /// Quiet output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Train a classifier and search gating parameters under the budget
    Search {
        /// Labeled feature table (JSON)
        table: PathBuf,

        /// Labeled evaluation streams (JSON array)
        streams: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Classifier kind
        #[arg(long, value_enum, default_value = "kernel")]
        model: ModelKind,

        /// Quiet output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show default configuration
    ShowConfig,
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(p) => Ok(framegate::config::load_config(p)?),
        None => Ok(Config::default()),
    }
}

fn load_table(path: &Path) -> anyhow::Result<FeatureTable> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn load_streams(path: &Path) -> anyhow::Result<Vec<FrameStream>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn train_model(
    kind: ModelKind,
    table: &FeatureTable,
    config: &Config,
    quiet: bool,
) -> anyhow::Result<Box<dyn Classifier>> {
    let model: Box<dyn Classifier> = match kind {
        ModelKind::Kernel => Box::new(framegate::train_kernel_classifier(table, &config.kernel)?),
        ModelKind::Mixture => Box::new(framegate::train_mixture_classifier(
            table,
            &config.mixture,
        )?),
        ModelKind::Weighted => Box::new(framegate::train_weighted_classifier(
            table,
            &config.weighting,
            &config.kernel,
        )?),
    };
    if !model.converged() && !quiet {
        eprintln!("Warning: training hit the iteration cap before convergence tolerance");
    }
    Ok(model)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate {
            table,
            streams,
            output,
            config,
            model,
            quiet,
        } => {
            let config = load_config(config)?;
            let table = load_table(&table)?;
            let streams = load_streams(&streams)?;
            let model = train_model(model, &table, &config, quiet)?;

            let mut results = Vec::new();
            for stream in &streams {
                let run = framegate::run_decision_pipeline(
                    model.as_ref(),
                    stream,
                    &framegate::PipelineConfig::baseline(),
                )?;
                if !quiet {
                    println!(
                        "{}: accuracy {:.4}, classifier on {:.1}% of frames",
                        stream.name,
                        run.metrics.overall_accuracy(),
                        run.metrics.invoked_fraction() * 100.0
                    );
                }
                results.push((stream.name.clone(), run.metrics));
            }
            report::write_evaluation_report(&results, &output)?;
            if !quiet {
                println!("Results saved to {}", output.display());
            }
        }
        Commands::Search {
            table,
            streams,
            output,
            config,
            model,
            quiet,
        } => {
            let config = load_config(config)?;
            let table = load_table(&table)?;
            let streams = load_streams(&streams)?;
            let model = train_model(model, &table, &config, quiet)?;

            let outcome = framegate::search_params_under_constraint(
                model.as_ref(),
                &streams,
                &config.search.grid,
                config.search.max_degradation,
            )?;
            match outcome.best_candidate() {
                Some(best) => {
                    if !quiet {
                        println!(
                            "Best candidate saves {:.1}% of classifier invocations ({:.2}% degradation)",
                            (1.0 - best.invoked_fraction) * 100.0,
                            best.degradation * 100.0
                        );
                    }
                }
                None => {
                    if !quiet {
                        println!("No candidate satisfies the degradation constraint");
                    }
                }
            }
            report::write_search_report(&outcome, &output)?;
            if !quiet {
                println!("Results saved to {}", output.display());
            }
        }
        Commands::ValidateConfig { config } => {
            let config = framegate::config::load_config(config)?;
            println!("Configuration is valid");
            if let Ok(json) = serde_json::to_string_pretty(&config) {
                println!("{}", json);
            }
        }
        Commands::ShowConfig => {
            let config = Config::default();
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
    }

    Ok(())
}
