//! Recurrent cell walking a transducer in step with the network.

use crate::error::{BrickError, Result};
use crate::fst::LanguageModelFst;
use crate::fst::ops::{FstProbabilitiesOp, FstTransitionOp, ProbabilityOp, TransitionOp};
use crate::fst::remap::RemapTable;
use crate::init::InitConfig;
use crate::traits::{Brick, RecurrentCell};
use crate::types::{Value, Values, require};
use ndarray::{Array1, Array2, ArrayView1, Zip};
use rand::rngs::StdRng;
use std::sync::Arc;

/// Transducer state carried through the recurrent loop.
///
/// Each step advances every example on its input symbol, then scores the
/// whole output vocabulary from the reached state. The `"logprobs"` output
/// holds negative log-probabilities, one column per network symbol.
#[derive(Clone, Debug)]
pub struct FstTransition<T = FstTransitionOp, P = FstProbabilitiesOp> {
    start: i64,
    out_dim: usize,
    transition: T,
    probability: P,
}

impl FstTransition {
    /// Step through `fst`, reading network symbols through `remap`.
    pub fn new(fst: LanguageModelFst, remap: Arc<RemapTable>) -> Self {
        Self {
            start: i64::from(fst.start()),
            out_dim: remap.len(),
            transition: FstTransitionOp::new(fst.clone(), Arc::clone(&remap)),
            probability: FstProbabilitiesOp::new(fst, remap),
        }
    }
}

impl<T: TransitionOp, P: ProbabilityOp> FstTransition<T, P> {
    /// Build from arbitrary operators over a vocabulary of `out_dim` symbols.
    pub fn with_ops(start: i64, out_dim: usize, transition: T, probability: P) -> Self {
        Self {
            start,
            out_dim,
            transition,
            probability,
        }
    }

    pub fn start(&self) -> i64 {
        self.start
    }
}

/// Blend advanced and held states by the mask, then cast back to ids.
fn hold_masked(
    next: Array1<i64>,
    prev: ArrayView1<'_, i64>,
    mask: ArrayView1<'_, f32>,
) -> Result<Array1<i64>> {
    let batch_size = prev.len();
    for (what, got) in [("transition batch size", next.len()), ("mask batch size", mask.len())] {
        if got != batch_size {
            return Err(BrickError::DimensionMismatch {
                brick: "fst_transition".to_string(),
                what,
                expected: batch_size,
                got,
            }
            .into());
        }
    }

    let mut blended = next;
    Zip::from(&mut blended)
        .and(&prev)
        .and(&mask)
        .for_each(|next, &prev, &m| {
            let m = f64::from(m);
            *next = (m * *next as f64 + (1.0 - m) * prev as f64) as i64;
        });
    Ok(blended)
}

// Parameter-free: the transducer is fixed at construction.
impl<T: TransitionOp, P: ProbabilityOp> Brick for FstTransition<T, P> {
    fn name(&self) -> &str {
        "fst_transition"
    }

    fn allocate(&mut self) -> Result<()> {
        Ok(())
    }

    fn initialize(&mut self, _config: &InitConfig, _rng: &mut StdRng) -> Result<()> {
        Ok(())
    }
}

impl<T: TransitionOp, P: ProbabilityOp> RecurrentCell for FstTransition<T, P> {
    fn sequences(&self) -> &[&'static str] {
        &["inputs", "mask"]
    }

    fn states(&self) -> &[&'static str] {
        &["states", "logprobs"]
    }

    fn get_dim(&self, name: &str) -> Result<usize> {
        match name {
            "states" | "inputs" | "mask" => Ok(0),
            "logprobs" => Ok(self.out_dim),
            _ => Err(BrickError::UnknownName {
                brick: "fst_transition".to_string(),
                name: name.to_string(),
            }
            .into()),
        }
    }

    fn initial_states(&self, batch_size: usize) -> Result<Values> {
        Ok(Values::from([
            (
                "states".to_string(),
                Value::Index(Array1::from_elem(batch_size, self.start)),
            ),
            (
                "logprobs".to_string(),
                Value::Float(Array2::zeros((batch_size, self.out_dim))),
            ),
        ]))
    }

    fn step(
        &self,
        inputs: &Values,
        states: &Values,
        mask: Option<ArrayView1<'_, f32>>,
    ) -> Result<Values> {
        let symbols = require(inputs, "inputs")?.as_index("inputs")?;
        let current = require(states, "states")?.as_index("states")?;

        let mut next = self.transition.apply(current, symbols)?;
        if let Some(mask) = mask {
            next = hold_masked(next, current, mask)?;
        }
        let logprobs = self.probability.apply(next.view())?;

        tracing::trace!(states = ?next, "transducer step");
        Ok(Values::from([
            ("states".to_string(), Value::Index(next)),
            ("logprobs".to_string(), Value::Float(logprobs)),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fst::tests::bigram;
    use ndarray::array;

    fn cell() -> FstTransition {
        FstTransition::new(bigram(), Arc::new(RemapTable::new(vec![1, 2, 0], Some(2))))
    }

    #[test]
    fn reports_dims() {
        let cell = cell();

        assert_eq!(cell.get_dim("states").unwrap(), 0);
        assert_eq!(cell.get_dim("inputs").unwrap(), 0);
        assert_eq!(cell.get_dim("logprobs").unwrap(), 3);
        assert!(cell.get_dim("readouts").is_err());
    }

    #[test]
    fn initial_states_start_at_start_state() {
        let initial = cell().initial_states(4).unwrap();

        assert_eq!(initial["states"], Value::Index(array![0_i64, 0, 0, 0]));
        assert_eq!(initial["logprobs"], Value::Float(Array2::zeros((4, 3))));
    }

    #[test]
    fn step_scores_the_reached_state() {
        let cell = cell();
        let inputs = Values::from([("inputs".to_string(), Value::Index(array![0_i64]))]);
        let states = cell.initial_states(1).unwrap();

        let out = cell.step(&inputs, &states, None).unwrap();

        assert_eq!(out["states"], Value::Index(array![1_i64]));
        let logprobs = out["logprobs"].as_float("logprobs").unwrap();
        // From the `a` history: b directly, a and </s> through backoff.
        let expected = [3.5_f32, 0.25, 5.0];
        for (got, want) in logprobs.row(0).iter().zip(expected) {
            assert!((got - want).abs() < 1e-5);
        }
    }

    #[test]
    fn mask_blends_per_example() {
        let cell = cell();
        let inputs = Values::from([("inputs".to_string(), Value::Index(array![0_i64, 0]))]);
        let states = cell.initial_states(2).unwrap();
        let mask = array![1.0_f32, 0.0];

        let out = cell.step(&inputs, &states, Some(mask.view())).unwrap();

        assert_eq!(out["states"], Value::Index(array![1_i64, 0]));
    }

    #[test]
    fn injected_operators_drive_the_cell() {
        fn advance(states: ArrayView1<'_, i64>, inputs: ArrayView1<'_, i64>) -> Result<Array1<i64>> {
            Ok(&states + &inputs)
        }
        fn flat(states: ArrayView1<'_, i64>) -> Result<Array2<f32>> {
            Ok(Array2::ones((states.len(), 2)))
        }

        let cell = FstTransition::with_ops(10, 2, advance, flat);
        let inputs = Values::from([("inputs".to_string(), Value::Index(array![3_i64]))]);
        let states = cell.initial_states(1).unwrap();

        let out = cell.step(&inputs, &states, None).unwrap();

        assert_eq!(out["states"], Value::Index(array![13_i64]));
    }

    #[test]
    fn short_transition_output_is_an_error() {
        fn drop_last(states: ArrayView1<'_, i64>, _inputs: ArrayView1<'_, i64>) -> Result<Array1<i64>> {
            Ok(states.slice(ndarray::s![..-1]).to_owned())
        }
        fn flat(states: ArrayView1<'_, i64>) -> Result<Array2<f32>> {
            Ok(Array2::ones((states.len(), 2)))
        }

        let cell = FstTransition::with_ops(0, 2, drop_last, flat);
        let inputs = Values::from([("inputs".to_string(), Value::Index(array![0_i64, 0]))]);
        let states = cell.initial_states(2).unwrap();
        let mask = array![1.0_f32, 1.0];

        let err = cell.step(&inputs, &states, Some(mask.view())).unwrap_err();

        assert!(matches!(
            err,
            crate::error::Error::Brick(BrickError::DimensionMismatch {
                what: "transition batch size",
                expected: 2,
                got: 1,
                ..
            })
        ));
    }
}
