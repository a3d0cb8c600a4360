//! Readouts: emission scores from named recurrent quantities.

pub mod emitter;
pub mod fusion;

use crate::error::{BrickError, Result};
use crate::init::InitConfig;
use crate::linear::Linear;
use crate::readout::emitter::SoftmaxEmitter;
use crate::traits::{AbstractReadout, Brick};
use crate::types::{Values, require};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;

/// Sum of one projection per source plus a shared bias, followed by a
/// softmax emitter.
#[derive(Clone, Debug)]
pub struct Readout {
    name: String,
    source_names: Vec<String>,
    readout_dim: usize,
    projections: Vec<Linear>,
    bias: Array1<f32>,
    emitter: SoftmaxEmitter,
}

impl Readout {
    pub fn new(source_names: Vec<String>, readout_dim: usize) -> Self {
        let projections = source_names
            .iter()
            .map(|name| {
                let mut projection = Linear::new(format!("transform_{name}")).with_bias(false);
                projection.output_dim = Some(readout_dim);
                projection
            })
            .collect();

        Self {
            name: "readout".to_string(),
            source_names,
            readout_dim,
            projections,
            bias: Array1::zeros(readout_dim),
            emitter: SoftmaxEmitter,
        }
    }

    /// Set the input width of each source, in source order.
    pub fn set_source_dims(&mut self, dims: &[usize]) -> Result<()> {
        if dims.len() != self.source_names.len() {
            return Err(BrickError::DimensionMismatch {
                brick: self.name.clone(),
                what: "source dims count",
                expected: self.source_names.len(),
                got: dims.len(),
            }
            .into());
        }
        for (projection, &dim) in self.projections.iter_mut().zip(dims) {
            projection.input_dim = Some(dim);
        }
        Ok(())
    }

    /// Projection applied to one source.
    pub fn projection_mut(&mut self, source: &str) -> Option<&mut Linear> {
        self.source_names
            .iter()
            .position(|name| name == source)
            .map(|i| &mut self.projections[i])
    }

    pub fn bias_mut(&mut self) -> &mut Array1<f32> {
        &mut self.bias
    }

    pub fn emitter(&self) -> &SoftmaxEmitter {
        &self.emitter
    }
}

impl Brick for Readout {
    fn name(&self) -> &str {
        &self.name
    }

    fn allocate(&mut self) -> Result<()> {
        for projection in &mut self.projections {
            projection.allocate()?;
        }
        self.bias = Array1::zeros(self.readout_dim);
        Ok(())
    }

    fn initialize(&mut self, config: &InitConfig, rng: &mut StdRng) -> Result<()> {
        for projection in &mut self.projections {
            projection.initialize(config, rng)?;
        }
        self.bias = config.biases.vector(rng, self.readout_dim)?;
        Ok(())
    }
}

impl AbstractReadout for Readout {
    fn source_names(&self) -> &[String] {
        &self.source_names
    }

    fn readout_dim(&self) -> usize {
        self.readout_dim
    }

    fn readout(&self, values: &Values) -> Result<Array2<f32>> {
        let mut merged: Option<Array2<f32>> = None;
        for (name, projection) in self.source_names.iter().zip(&self.projections) {
            let source = require(values, name)?.as_float(name)?;
            let projected = projection.apply(source)?;
            merged = Some(match merged {
                Some(acc) => acc + &projected,
                None => projected,
            });
        }

        let merged = merged.ok_or_else(|| BrickError::NotConfigured {
            brick: self.name.clone(),
            field: "source_names",
        })?;
        Ok(merged + &self.bias)
    }

    fn emit(&self, readouts: ArrayView2<'_, f32>, rng: &mut StdRng) -> Result<Array1<i64>> {
        self.emitter.emit(readouts, rng)
    }

    fn cost(
        &self,
        readouts: ArrayView2<'_, f32>,
        outputs: ArrayView1<'_, i64>,
    ) -> Result<Array1<f32>> {
        self.emitter.cost(readouts, outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use ndarray::array;

    fn identity_readout() -> Readout {
        let mut readout = Readout::new(vec!["states".to_string()], 2);
        readout
            .projection_mut("states")
            .unwrap()
            .set_parameters(Array2::eye(2), None)
            .unwrap();
        readout
    }

    #[test]
    fn sums_projected_sources() {
        let mut readout = Readout::new(vec!["states".to_string(), "glimpses".to_string()], 2);
        readout.set_source_dims(&[1, 1]).unwrap();
        readout.allocate().unwrap();
        readout
            .projection_mut("states")
            .unwrap()
            .set_parameters(array![[1.0, 2.0]], None)
            .unwrap();
        readout
            .projection_mut("glimpses")
            .unwrap()
            .set_parameters(array![[0.5, 0.5]], None)
            .unwrap();
        *readout.bias_mut() = array![0.1, 0.0];

        let values = Values::from([
            ("states".to_string(), Value::Float(array![[1.0_f32]])),
            ("glimpses".to_string(), Value::Float(array![[2.0_f32]])),
        ]);
        let scores = readout.readout(&values).unwrap();

        assert!((scores[[0, 0]] - 2.1).abs() < 1e-6);
        assert!((scores[[0, 1]] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn ignores_unrelated_values() {
        let readout = identity_readout();
        let values = Values::from([
            ("states".to_string(), Value::Float(array![[0.2_f32, 0.3]])),
            ("lm_weights".to_string(), Value::Float(array![[9.0_f32, 9.0]])),
        ]);

        let scores = readout.readout(&values).unwrap();

        assert_eq!(scores, array![[0.2_f32, 0.3]]);
    }

    #[test]
    fn missing_source_fails() {
        let readout = identity_readout();

        assert!(readout.readout(&Values::new()).is_err());
    }

    #[test]
    fn allocation_needs_source_dims() {
        let mut readout = Readout::new(vec!["states".to_string()], 3);

        assert!(readout.allocate().is_err());

        readout.set_source_dims(&[4]).unwrap();
        readout.allocate().unwrap();
    }
}
