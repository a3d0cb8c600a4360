//! Affine projection brick.

use crate::error::{BrickError, Result};
use crate::init::InitConfig;
use crate::traits::Brick;
use ndarray::{Array1, Array2, ArrayView2};
use rand::rngs::StdRng;

/// Affine map `x · W + b` with lazily known dimensions.
#[derive(Clone, Debug)]
pub struct Linear {
    name: String,
    pub input_dim: Option<usize>,
    pub output_dim: Option<usize>,
    use_bias: bool,
    weights: Option<Array2<f32>>,
    bias: Option<Array1<f32>>,
}

impl Linear {
    /// Unallocated projection with unknown dimensions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_dim: None,
            output_dim: None,
            use_bias: true,
            weights: None,
            bias: None,
        }
    }

    /// Set both dimensions.
    pub fn with_dims(mut self, input_dim: usize, output_dim: usize) -> Self {
        self.input_dim = Some(input_dim);
        self.output_dim = Some(output_dim);
        self
    }

    /// Enable or disable the bias term.
    pub fn with_bias(mut self, use_bias: bool) -> Self {
        self.use_bias = use_bias;
        self
    }

    /// Copy of this projection under another name, keeping its settings.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Weight matrix `(input_dim, output_dim)`, if allocated.
    pub fn weights(&self) -> Option<&Array2<f32>> {
        self.weights.as_ref()
    }

    /// Bias vector, if allocated with a bias.
    pub fn bias(&self) -> Option<&Array1<f32>> {
        self.bias.as_ref()
    }

    /// Replace the parameters, fixing the dimensions to their shape.
    pub fn set_parameters(&mut self, weights: Array2<f32>, bias: Option<Array1<f32>>) -> Result<()> {
        let (input_dim, output_dim) = weights.dim();
        match &bias {
            Some(b) if b.len() != output_dim => {
                return Err(self.mismatch("bias length", output_dim, b.len()));
            }
            _ => {}
        }
        self.input_dim = Some(input_dim);
        self.output_dim = Some(output_dim);
        self.use_bias = bias.is_some();
        self.weights = Some(weights);
        self.bias = bias;
        Ok(())
    }

    /// Project a `(batch, input_dim)` matrix.
    pub fn apply(&self, x: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        let weights = self.weights.as_ref().ok_or_else(|| BrickError::NotAllocated {
            brick: self.name.clone(),
        })?;
        if x.ncols() != weights.nrows() {
            return Err(self.mismatch("input dim", weights.nrows(), x.ncols()));
        }
        let y = x.dot(weights);
        Ok(match &self.bias {
            Some(b) => y + b,
            None => y,
        })
    }

    fn dims(&self) -> Result<(usize, usize)> {
        let input_dim = self.input_dim.ok_or_else(|| self.not_configured("input_dim"))?;
        let output_dim = self.output_dim.ok_or_else(|| self.not_configured("output_dim"))?;
        Ok((input_dim, output_dim))
    }

    fn not_configured(&self, field: &'static str) -> BrickError {
        BrickError::NotConfigured {
            brick: self.name.clone(),
            field,
        }
    }

    fn mismatch(&self, what: &'static str, expected: usize, got: usize) -> crate::error::Error {
        BrickError::DimensionMismatch {
            brick: self.name.clone(),
            what,
            expected,
            got,
        }
        .into()
    }
}

impl Brick for Linear {
    fn name(&self) -> &str {
        &self.name
    }

    fn allocate(&mut self) -> Result<()> {
        let (input_dim, output_dim) = self.dims()?;
        self.weights = Some(Array2::zeros((input_dim, output_dim)));
        self.bias = self.use_bias.then(|| Array1::zeros(output_dim));
        Ok(())
    }

    fn initialize(&mut self, config: &InitConfig, rng: &mut StdRng) -> Result<()> {
        let (input_dim, output_dim) = self.dims()?;
        if self.weights.is_none() {
            return Err(BrickError::NotAllocated {
                brick: self.name.clone(),
            }
            .into());
        }
        self.weights = Some(config.weights.matrix(rng, (input_dim, output_dim))?);
        if self.use_bias {
            self.bias = Some(config.biases.vector(rng, output_dim)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn applies_affine_map() {
        let mut linear = Linear::new("proj");
        linear
            .set_parameters(array![[1.0, 0.0], [0.0, 2.0]], Some(array![0.5, -0.5]))
            .unwrap();

        let y = linear.apply(array![[1.0_f32, 1.0]].view()).unwrap();

        assert_eq!(y, array![[1.5_f32, 1.5]]);
    }

    #[test]
    fn allocation_requires_dims() {
        let mut linear = Linear::new("proj");
        linear.input_dim = Some(3);

        let err = linear.allocate().unwrap_err();

        assert!(matches!(
            err,
            Error::Brick(BrickError::NotConfigured { field: "output_dim", .. })
        ));
    }

    #[test]
    fn unallocated_apply_fails() {
        let linear = Linear::new("proj").with_dims(2, 2);

        let err = linear.apply(array![[1.0_f32, 1.0]].view()).unwrap_err();

        assert!(matches!(err, Error::Brick(BrickError::NotAllocated { .. })));
    }

    #[test]
    fn rejects_wrong_input_width() {
        let mut linear = Linear::new("proj").with_dims(3, 2);
        linear.allocate().unwrap();

        let err = linear.apply(array![[1.0_f32, 1.0]].view()).unwrap_err();

        assert!(matches!(
            err,
            Error::Brick(BrickError::DimensionMismatch {
                expected: 3,
                got: 2,
                ..
            })
        ));
    }

    #[test]
    fn initialize_fills_allocated_parameters() {
        let mut linear = Linear::new("proj").with_dims(4, 3);
        linear.allocate().unwrap();

        let config = InitConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        linear.initialize(&config, &mut rng).unwrap();

        let weights = linear.weights().unwrap();
        assert_eq!(weights.dim(), (4, 3));
        assert!(weights.iter().any(|&w| w != 0.0));
        assert_eq!(linear.bias().unwrap().len(), 3);
    }
}
