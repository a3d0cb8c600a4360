//! Shallow fusion of a language model into a readout.

use crate::config::FusionConfig;
use crate::error::{BrickError, Result};
use crate::init::InitConfig;
use crate::readout::Readout;
use crate::traits::{AbstractReadout, Brick};
use crate::types::{Values, require};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;

/// Language-model probabilities `beta * exp(-weights)` from negative
/// log-probabilities.
pub fn lm_probabilities(weights: ArrayView2<'_, f32>, beta: f32) -> Array2<f32> {
    weights.mapv(|w| beta * (-w).exp())
}

/// Readout adding scaled language-model probabilities to a base readout.
///
/// The language-model weights are read from `lm_weights_name` alongside the
/// base readout's sources. Everything else is delegated to the base.
#[derive(Clone, Debug)]
pub struct ShallowFusionReadout<R = Readout> {
    base: R,
    lm_weights_name: String,
    beta: f32,
}

impl<R: AbstractReadout> ShallowFusionReadout<R> {
    pub fn new(base: R, lm_weights_name: impl Into<String>) -> Self {
        Self {
            base,
            lm_weights_name: lm_weights_name.into(),
            beta: 1.0,
        }
    }

    pub fn from_config(base: R, config: &FusionConfig) -> Self {
        Self::new(base, config.lm_weights_name.clone()).with_beta(config.beta)
    }

    /// Scale of the language-model term.
    pub fn with_beta(mut self, beta: f32) -> Self {
        self.beta = beta;
        self
    }

    pub fn beta(&self) -> f32 {
        self.beta
    }

    pub fn lm_weights_name(&self) -> &str {
        &self.lm_weights_name
    }

    pub fn base(&self) -> &R {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut R {
        &mut self.base
    }
}

impl<R: AbstractReadout + Brick> Brick for ShallowFusionReadout<R> {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn push_allocation_config(&mut self) -> Result<()> {
        self.base.push_allocation_config()
    }

    fn allocate(&mut self) -> Result<()> {
        self.base.allocate()
    }

    fn initialize(&mut self, config: &InitConfig, rng: &mut StdRng) -> Result<()> {
        self.base.initialize(config, rng)
    }
}

impl<R: AbstractReadout> AbstractReadout for ShallowFusionReadout<R> {
    fn source_names(&self) -> &[String] {
        self.base.source_names()
    }

    fn readout_dim(&self) -> usize {
        self.base.readout_dim()
    }

    fn readout(&self, values: &Values) -> Result<Array2<f32>> {
        let weights = require(values, &self.lm_weights_name)?.as_float(&self.lm_weights_name)?;
        let base = self.base.readout(values)?;
        for (what, expected, got) in [
            ("lm weights width", base.ncols(), weights.ncols()),
            ("lm weights batch size", base.nrows(), weights.nrows()),
        ] {
            if got != expected {
                return Err(BrickError::DimensionMismatch {
                    brick: "shallow_fusion_readout".to_string(),
                    what,
                    expected,
                    got,
                }
                .into());
            }
        }

        Ok(base + &lm_probabilities(weights, self.beta))
    }

    fn emit(&self, readouts: ArrayView2<'_, f32>, rng: &mut StdRng) -> Result<Array1<i64>> {
        self.base.emit(readouts, rng)
    }

    fn cost(
        &self,
        readouts: ArrayView2<'_, f32>,
        outputs: ArrayView1<'_, i64>,
    ) -> Result<Array1<f32>> {
        self.base.cost(readouts, outputs)
    }
}
