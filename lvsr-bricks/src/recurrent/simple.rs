//! Elman recurrent cell.

use crate::error::{BrickError, Result};
use crate::init::InitConfig;
use crate::recurrent::{carry_masked, check_port};
use crate::traits::{Brick, RecurrentCell};
use crate::types::{Value, Values, require};
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;

/// `h' = tanh(inputs + h · W)`.
#[derive(Clone, Debug)]
pub struct SimpleRecurrent {
    name: String,
    dim: usize,
    state_to_state: Array2<f32>,
}

impl SimpleRecurrent {
    pub fn new(dim: usize) -> Self {
        Self {
            name: "simple_recurrent".to_string(),
            dim,
            state_to_state: Array2::zeros((dim, dim)),
        }
    }

    pub fn state_to_state(&self) -> &Array2<f32> {
        &self.state_to_state
    }

    pub fn state_to_state_mut(&mut self) -> &mut Array2<f32> {
        &mut self.state_to_state
    }
}

impl Brick for SimpleRecurrent {
    fn name(&self) -> &str {
        &self.name
    }

    fn allocate(&mut self) -> Result<()> {
        self.state_to_state = Array2::zeros((self.dim, self.dim));
        Ok(())
    }

    fn initialize(&mut self, config: &InitConfig, rng: &mut StdRng) -> Result<()> {
        self.state_to_state = config.weights.matrix(rng, (self.dim, self.dim))?;
        Ok(())
    }
}

impl RecurrentCell for SimpleRecurrent {
    fn sequences(&self) -> &[&'static str] {
        &["inputs", "mask"]
    }

    fn states(&self) -> &[&'static str] {
        &["states"]
    }

    fn get_dim(&self, name: &str) -> Result<usize> {
        match name {
            "inputs" | "states" => Ok(self.dim),
            "mask" => Ok(0),
            _ => Err(BrickError::UnknownName {
                brick: self.name.clone(),
                name: name.to_string(),
            }
            .into()),
        }
    }

    fn initial_states(&self, batch_size: usize) -> Result<Values> {
        Ok(Values::from([(
            "states".to_string(),
            Value::Float(Array2::zeros((batch_size, self.dim))),
        )]))
    }

    fn step(
        &self,
        inputs: &Values,
        states: &Values,
        mask: Option<ArrayView1<'_, f32>>,
    ) -> Result<Values> {
        let x = require(inputs, "inputs")?.as_float("inputs")?;
        let h = require(states, "states")?.as_float("states")?;
        check_port(&self.name, "state width", h, h.nrows(), self.dim)?;
        check_port(&self.name, "input width", x, h.nrows(), self.dim)?;

        let next = (&x + &h.dot(&self.state_to_state)).mapv(f32::tanh);
        let next = carry_masked(next, h, mask)?;

        Ok(Values::from([("states".to_string(), Value::Float(next))]))
    }
}
