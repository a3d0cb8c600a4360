//! Next subcommand - rank the symbols following a prefix.

use crate::cli::FstArgs;
use crate::config::ModelConfig;
use eyre::{Context, Result};
use lvsr_bricks::config::BricksConfig;
use lvsr_bricks::fst::ops::{FstProbabilitiesOp, ProbabilityOp};
use lvsr_bricks::readout::fusion::lm_probabilities;
use lvsr_bricks::recurrent::scan;
use lvsr_bricks::transducer::FstTransition;
use lvsr_bricks::types::{Value, Values, require};
use ndarray::{Array2, array};
use std::path::PathBuf;

/// CLI arguments for next-symbol ranking.
#[derive(clap::Args, Debug)]
pub struct Args {
    #[command(flatten)]
    pub model: FstArgs,

    /// Number of symbols to print
    #[arg(short = 'k', long = "top", default_value_t = 5)]
    pub top: usize,

    /// Language-model scale (default: from --config, else 1)
    #[arg(long)]
    pub beta: Option<f32>,

    /// JSON brick configuration supplying the fusion settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Prefix symbols, in order
    pub symbols: Vec<String>,
}

/// Resolved configuration for next-symbol ranking.
#[derive(Debug)]
pub struct Config {
    pub model: ModelConfig,
    pub ids: Vec<i64>,
    pub top: usize,
    pub beta: f32,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        let fusion_beta = match &args.config {
            Some(path) => BricksConfig::from_file(path)
                .wrap_err_with(|| format!("failed to load config: {:?}", path.display()))?
                .fusion
                .map(|fusion| fusion.beta),
            None => None,
        };

        let model = ModelConfig::try_from(args.model)?;
        let ids = model.symbol_ids(&args.symbols)?;
        Ok(Self {
            model,
            ids,
            top: args.top,
            beta: args.beta.or(fusion_beta).unwrap_or(1.0),
        })
    }
}

pub fn execute(config: Config) -> Result<()> {
    for (symbol, prob) in rank(&config)? {
        println!("{symbol}\t{prob:.6}");
    }
    Ok(())
}

/// The `top` symbols by fused probability after consuming the prefix.
pub fn rank(config: &Config) -> Result<Vec<(String, f32)>> {
    let model = &config.model;
    let cell = FstTransition::new(model.fst.clone(), model.remap.clone());

    let inputs: Vec<Values> = config
        .ids
        .iter()
        .map(|&id| Values::from([("inputs".to_string(), Value::Index(array![id]))]))
        .collect();
    let outputs = scan(&cell, &inputs, None, Values::new()).wrap_err("transducer walk failed")?;

    let weights: Array2<f32> = match outputs.last() {
        Some(last) => require(last, "logprobs")?.as_float("logprobs")?.to_owned(),
        None => FstProbabilitiesOp::new(model.fst.clone(), model.remap.clone())
            .apply(array![cell.start()].view())
            .wrap_err("failed to score the start state")?,
    };

    let probs = lm_probabilities(weights.view(), config.beta);
    let mut ranked: Vec<(usize, f32)> = probs.row(0).iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(config.top);

    tracing::debug!(prefix = config.ids.len(), beta = config.beta, "ranked next symbols");
    Ok(ranked
        .into_iter()
        .map(|(id, prob)| {
            let symbol = model.vocab.symbol(id).unwrap_or_default().to_string();
            (symbol, prob)
        })
        .collect())
}
