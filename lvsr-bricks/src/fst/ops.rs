//! Batched transition and probability operators over a transducer.

use crate::error::{BrickError, Result};
use crate::fst::LanguageModelFst;
use crate::fst::remap::RemapTable;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::sync::Arc;

/// Next state per example from `(states, input symbols)`.
pub trait TransitionOp {
    fn apply(&self, states: ArrayView1<'_, i64>, inputs: ArrayView1<'_, i64>) -> Result<Array1<i64>>;
}

/// Emission scores per example from `states`, `(batch, vocabulary)`.
pub trait ProbabilityOp {
    fn apply(&self, states: ArrayView1<'_, i64>) -> Result<Array2<f32>>;
}

impl<F> TransitionOp for F
where
    F: Fn(ArrayView1<'_, i64>, ArrayView1<'_, i64>) -> Result<Array1<i64>>,
{
    fn apply(&self, states: ArrayView1<'_, i64>, inputs: ArrayView1<'_, i64>) -> Result<Array1<i64>> {
        self(states, inputs)
    }
}

impl<F> ProbabilityOp for F
where
    F: Fn(ArrayView1<'_, i64>) -> Result<Array2<f32>>,
{
    fn apply(&self, states: ArrayView1<'_, i64>) -> Result<Array2<f32>> {
        self(states)
    }
}

/// Steps every example through the transducer on its remapped input symbol.
///
/// The end-of-sequence symbol leaves the state unchanged.
#[derive(Clone, Debug)]
pub struct FstTransitionOp {
    fst: LanguageModelFst,
    remap: Arc<RemapTable>,
}

impl FstTransitionOp {
    pub fn new(fst: LanguageModelFst, remap: Arc<RemapTable>) -> Self {
        Self { fst, remap }
    }
}

impl TransitionOp for FstTransitionOp {
    fn apply(&self, states: ArrayView1<'_, i64>, inputs: ArrayView1<'_, i64>) -> Result<Array1<i64>> {
        if states.len() != inputs.len() {
            return Err(BrickError::DimensionMismatch {
                brick: "fst_transition_op".to_string(),
                what: "input batch size",
                expected: states.len(),
                got: inputs.len(),
            }
            .into());
        }

        states
            .iter()
            .zip(inputs.iter())
            .map(|(&state, &input)| -> Result<i64> {
                let current = self.fst.state(state)?;
                let symbol = self.remap.symbol(input)?;
                if self.remap.is_eos(symbol) {
                    return Ok(state);
                }
                let (next, _) = self.fst.transition(current, self.remap.label(symbol))?;
                Ok(i64::from(next))
            })
            .collect()
    }
}

/// Negative log-probability of every network symbol in each example's state.
///
/// Unreachable symbols score `+inf`.
#[derive(Clone, Debug)]
pub struct FstProbabilitiesOp {
    fst: LanguageModelFst,
    remap: Arc<RemapTable>,
}

impl FstProbabilitiesOp {
    pub fn new(fst: LanguageModelFst, remap: Arc<RemapTable>) -> Self {
        Self { fst, remap }
    }
}

impl ProbabilityOp for FstProbabilitiesOp {
    fn apply(&self, states: ArrayView1<'_, i64>) -> Result<Array2<f32>> {
        let mut weights = Array2::zeros((states.len(), self.remap.len()));

        for (mut row, &state) in weights.axis_iter_mut(Axis(0)).zip(states.iter()) {
            let state = self.fst.state(state)?;
            for (symbol, weight) in row.iter_mut().enumerate() {
                *weight = if self.remap.is_eos(symbol) {
                    self.fst.final_cost(state)?
                } else {
                    self.fst.cost(state, self.remap.label(symbol))?
                };
            }
        }

        Ok(weights)
    }
}
