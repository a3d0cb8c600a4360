//! Score subcommand - walk the transducer over a symbol sequence.

use crate::cli::FstArgs;
use crate::config::ModelConfig;
use eyre::{Context, Result};
use lvsr_bricks::fst::ops::{FstProbabilitiesOp, ProbabilityOp};
use lvsr_bricks::recurrent::scan;
use lvsr_bricks::transducer::FstTransition;
use lvsr_bricks::types::{Value, Values, require};
use ndarray::array;

/// CLI arguments for sequence scoring.
#[derive(clap::Args, Debug)]
pub struct Args {
    #[command(flatten)]
    pub model: FstArgs,

    /// Symbols to score, in order
    #[arg(required = true)]
    pub symbols: Vec<String>,
}

/// Resolved configuration for sequence scoring.
#[derive(Debug)]
pub struct Config {
    pub model: ModelConfig,
    pub symbols: Vec<String>,
    pub ids: Vec<i64>,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        let model = ModelConfig::try_from(args.model)?;
        let ids = model.symbol_ids(&args.symbols)?;
        Ok(Self {
            model,
            symbols: args.symbols,
            ids,
        })
    }
}

/// One consumed symbol.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub symbol: String,
    pub state: i64,
    pub cost: f32,
}

pub fn execute(config: Config) -> Result<()> {
    let steps = score(&config)?;

    for (t, step) in steps.iter().enumerate() {
        println!("{t}\t{}\t{}\t{:.4}", step.symbol, step.state, step.cost);
    }
    let total: f32 = steps.iter().map(|step| step.cost).sum();
    println!("total\t{total:.4}");

    Ok(())
}

/// Cost of each symbol given the state reached before it.
pub fn score(config: &Config) -> Result<Vec<Step>> {
    let model = &config.model;
    let cell = FstTransition::new(model.fst.clone(), model.remap.clone());
    let probabilities = FstProbabilitiesOp::new(model.fst.clone(), model.remap.clone());

    let inputs: Vec<Values> = config
        .ids
        .iter()
        .map(|&id| Values::from([("inputs".to_string(), Value::Index(array![id]))]))
        .collect();
    let outputs = scan(&cell, &inputs, None, Values::new()).wrap_err("transducer walk failed")?;

    // Scores before the first symbol come from the start state.
    let mut scores = probabilities
        .apply(array![cell.start()].view())
        .wrap_err("failed to score the start state")?;

    let mut steps = Vec::with_capacity(outputs.len());
    for ((output, &id), symbol) in outputs.iter().zip(&config.ids).zip(&config.symbols) {
        let state = require(output, "states")?.as_index("states")?[0];
        steps.push(Step {
            symbol: symbol.clone(),
            state,
            cost: scores[[0, id as usize]],
        });
        scores = require(output, "logprobs")?.as_float("logprobs")?.to_owned();
        tracing::debug!(symbol = %symbol, state, "consumed symbol");
    }

    Ok(steps)
}
