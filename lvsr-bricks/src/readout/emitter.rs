//! Softmax emitter over readout scores.

use crate::error::{BrickError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;

/// Categorical distribution parameterized by unnormalized scores.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoftmaxEmitter;

impl SoftmaxEmitter {
    /// Row-wise log-softmax, shifted by the row maximum for stability.
    pub fn log_probs(&self, readouts: ArrayView2<'_, f32>) -> Array2<f32> {
        let mut out = readouts.to_owned();
        for mut row in out.axis_iter_mut(Axis(0)) {
            let max = row.fold(f32::NEG_INFINITY, |m, &x| m.max(x));
            let log_sum = row.mapv(|x| (x - max).exp()).sum().ln() + max;
            row.mapv_inplace(|x| x - log_sum);
        }
        out
    }

    /// Row-wise softmax.
    pub fn probs(&self, readouts: ArrayView2<'_, f32>) -> Array2<f32> {
        self.log_probs(readouts).mapv(f32::exp)
    }

    /// Categorical cross-entropy of `outputs` under each row.
    pub fn cost(
        &self,
        readouts: ArrayView2<'_, f32>,
        outputs: ArrayView1<'_, i64>,
    ) -> Result<Array1<f32>> {
        if outputs.len() != readouts.nrows() {
            return Err(BrickError::DimensionMismatch {
                brick: "softmax_emitter".to_string(),
                what: "outputs batch size",
                expected: readouts.nrows(),
                got: outputs.len(),
            }
            .into());
        }

        let log_probs = self.log_probs(readouts);
        log_probs
            .axis_iter(Axis(0))
            .zip(outputs.iter())
            .map(|(row, &output)| -> Result<f32> {
                let index = usize::try_from(output)
                    .ok()
                    .filter(|&i| i < row.len())
                    .ok_or(BrickError::OutputOutOfRange {
                        index: output,
                        size: row.len(),
                    })?;
                Ok(-row[index])
            })
            .collect()
    }

    /// Sample one output per row.
    pub fn emit(&self, readouts: ArrayView2<'_, f32>, rng: &mut StdRng) -> Result<Array1<i64>> {
        let probs = self.probs(readouts);
        probs
            .axis_iter(Axis(0))
            .map(|row| -> Result<i64> {
                let dist = WeightedIndex::new(row.iter().copied())
                    .map_err(|e| BrickError::Sampling(e.to_string()))?;
                Ok(dist.sample(rng) as i64)
            })
            .collect()
    }

    /// Most probable output per row.
    pub fn emit_greedy(&self, readouts: ArrayView2<'_, f32>) -> Array1<i64> {
        readouts
            .axis_iter(Axis(0))
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |best, (i, &x)| {
                        if x > best.1 { (i, x) } else { best }
                    })
                    .0 as i64
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn probs_sum_to_one() {
        let probs = SoftmaxEmitter.probs(array![[1.0_f32, 2.0, 3.0], [1000.0, 1000.0, 0.0]].view());

        for row in probs.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-5);
        }
        assert!((probs[[1, 0]] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn cost_is_negative_log_likelihood() {
        let readouts = array![[0.0_f32, 0.0], [0.0, 0.0]];

        let cost = SoftmaxEmitter.cost(readouts.view(), array![0_i64, 1].view()).unwrap();

        for c in cost {
            assert!((c - std::f32::consts::LN_2).abs() < 1e-5);
        }
    }

    #[test]
    fn cost_rejects_out_of_range_outputs() {
        let readouts = array![[0.0_f32, 0.0]];

        let err = SoftmaxEmitter.cost(readouts.view(), array![2_i64].view()).unwrap_err();

        assert!(matches!(
            err,
            Error::Brick(BrickError::OutputOutOfRange { index: 2, size: 2 })
        ));
    }

    #[test]
    fn greedy_picks_the_maximum() {
        let readouts = array![[0.1_f32, 0.7, 0.2], [3.0, -1.0, 0.0]];

        assert_eq!(SoftmaxEmitter.emit_greedy(readouts.view()), array![1_i64, 0]);
    }

    #[test]
    fn sampling_follows_dominant_scores() {
        let mut rng = StdRng::seed_from_u64(7);
        let readouts = array![[0.0_f32, 50.0, 0.0], [50.0, 0.0, 0.0]];

        let sample = SoftmaxEmitter.emit(readouts.view(), &mut rng).unwrap();

        assert_eq!(sample, array![1_i64, 0]);
    }
}
