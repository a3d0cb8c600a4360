//! Parameter initialization schemes.

use crate::error::{ConfigError, Result};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::Deserialize;

/// Scheme for filling a parameter array.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum Initialization {
    /// Every element set to `value`
    Constant { value: f32 },
    /// Independent normal samples
    IsotropicGaussian { mean: f32, std: f32 },
    /// Uniform samples in `[mean - width / 2, mean + width / 2)`
    Uniform { mean: f32, width: f32 },
}

impl Initialization {
    /// Draw a `(rows, cols)` matrix.
    pub fn matrix(&self, rng: &mut StdRng, shape: (usize, usize)) -> Result<Array2<f32>> {
        Ok(match *self {
            Initialization::Constant { value } => Array2::from_elem(shape, value),
            Initialization::IsotropicGaussian { mean, std } => {
                let normal = normal(mean, std)?;
                Array2::from_shape_simple_fn(shape, || normal.sample(rng))
            }
            Initialization::Uniform { mean, width } => {
                let uniform = uniform(mean, width)?;
                Array2::from_shape_simple_fn(shape, || uniform.sample(rng))
            }
        })
    }

    /// Draw a vector of length `len`.
    pub fn vector(&self, rng: &mut StdRng, len: usize) -> Result<Array1<f32>> {
        Ok(self.matrix(rng, (1, len))?.remove_axis(ndarray::Axis(0)))
    }
}

fn normal(mean: f32, std: f32) -> Result<Normal<f32>> {
    Normal::new(mean, std).map_err(|e| {
        ConfigError::InvalidInit {
            scheme: "isotropic_gaussian",
            reason: e.to_string(),
        }
        .into()
    })
}

fn uniform(mean: f32, width: f32) -> Result<Uniform<f32>> {
    let half = width / 2.0;
    Uniform::new(mean - half, mean + half).map_err(|e| {
        ConfigError::InvalidInit {
            scheme: "uniform",
            reason: e.to_string(),
        }
        .into()
    })
}

const DEFAULT_WEIGHTS_STD: f32 = 0.01;

fn default_weights() -> Initialization {
    Initialization::IsotropicGaussian {
        mean: 0.0,
        std: DEFAULT_WEIGHTS_STD,
    }
}

fn default_biases() -> Initialization {
    Initialization::Constant { value: 0.0 }
}

/// Initialization settings shared by all bricks of a model.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct InitConfig {
    /// Scheme for weight matrices
    #[serde(default = "default_weights")]
    pub weights: Initialization,

    /// Scheme for bias vectors
    #[serde(default = "default_biases")]
    pub biases: Initialization,

    /// Seed for reproducible initialization
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            weights: default_weights(),
            biases: default_biases(),
            seed: None,
        }
    }
}

impl InitConfig {
    /// Random generator seeded from `seed`, or from the OS when unset.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_fills_every_element() {
        let mut rng = StdRng::seed_from_u64(0);
        let m = Initialization::Constant { value: 0.5 }
            .matrix(&mut rng, (2, 3))
            .unwrap();

        assert_eq!(m.shape(), &[2, 3]);
        assert!(m.iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn uniform_respects_width() {
        let mut rng = StdRng::seed_from_u64(7);
        let v = Initialization::Uniform {
            mean: 1.0,
            width: 0.5,
        }
        .vector(&mut rng, 100)
        .unwrap();

        assert_eq!(v.len(), 100);
        assert!(v.iter().all(|&x| (0.75..1.25).contains(&x)));
    }

    #[test]
    fn seeded_configs_are_reproducible() {
        let config = InitConfig {
            seed: Some(42),
            ..InitConfig::default()
        };

        let a = config.weights.matrix(&mut config.rng(), (3, 3)).unwrap();
        let b = config.weights.matrix(&mut config.rng(), (3, 3)).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn negative_std_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = Initialization::IsotropicGaussian {
            mean: 0.0,
            std: -1.0,
        }
        .matrix(&mut rng, (1, 1));

        assert!(result.is_err());
    }

    #[test]
    fn deserializes_tagged_schemes() {
        let config: InitConfig = serde_json::from_str(
            r#"{"weights": {"scheme": "uniform", "mean": 0.0, "width": 0.2}, "seed": 3}"#,
        )
        .unwrap();

        assert_eq!(
            config.weights,
            Initialization::Uniform {
                mean: 0.0,
                width: 0.2
            }
        );
        assert_eq!(config.biases, Initialization::Constant { value: 0.0 });
        assert_eq!(config.seed, Some(3));
    }
}
