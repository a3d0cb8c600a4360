//! Gated recurrent unit.

use crate::error::{BrickError, Result};
use crate::init::InitConfig;
use crate::recurrent::{carry_masked, check_port};
use crate::traits::{Brick, RecurrentCell};
use crate::types::{Value, Values, require};
use ndarray::{Array2, ArrayView1, Axis, s};
use rand::rngs::StdRng;

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// GRU taking pre-projected `inputs` and `gate_inputs`.
///
/// `gate_inputs` packs the update gate in its first `dim` columns and the
/// reset gate in the remaining `dim`.
#[derive(Clone, Debug)]
pub struct GatedRecurrent {
    name: String,
    dim: usize,
    state_to_state: Array2<f32>,
    state_to_gates: Array2<f32>,
}

impl GatedRecurrent {
    pub fn new(dim: usize) -> Self {
        Self {
            name: "gated_recurrent".to_string(),
            dim,
            state_to_state: Array2::zeros((dim, dim)),
            state_to_gates: Array2::zeros((dim, 2 * dim)),
        }
    }

    pub fn state_to_state_mut(&mut self) -> &mut Array2<f32> {
        &mut self.state_to_state
    }

    pub fn state_to_gates_mut(&mut self) -> &mut Array2<f32> {
        &mut self.state_to_gates
    }
}

impl Brick for GatedRecurrent {
    fn name(&self) -> &str {
        &self.name
    }

    fn allocate(&mut self) -> Result<()> {
        self.state_to_state = Array2::zeros((self.dim, self.dim));
        self.state_to_gates = Array2::zeros((self.dim, 2 * self.dim));
        Ok(())
    }

    fn initialize(&mut self, config: &InitConfig, rng: &mut StdRng) -> Result<()> {
        self.state_to_state = config.weights.matrix(rng, (self.dim, self.dim))?;
        self.state_to_gates = config.weights.matrix(rng, (self.dim, 2 * self.dim))?;
        Ok(())
    }
}

impl RecurrentCell for GatedRecurrent {
    fn sequences(&self) -> &[&'static str] {
        &["inputs", "gate_inputs", "mask"]
    }

    fn states(&self) -> &[&'static str] {
        &["states"]
    }

    fn get_dim(&self, name: &str) -> Result<usize> {
        match name {
            "inputs" | "states" => Ok(self.dim),
            "gate_inputs" => Ok(2 * self.dim),
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
        let gate_inputs = require(inputs, "gate_inputs")?.as_float("gate_inputs")?;
        let h = require(states, "states")?.as_float("states")?;
        let batch_size = h.nrows();
        check_port(&self.name, "state width", h, batch_size, self.dim)?;
        check_port(&self.name, "input width", x, batch_size, self.dim)?;
        check_port(&self.name, "gate input width", gate_inputs, batch_size, 2 * self.dim)?;

        let gates = (&h.dot(&self.state_to_gates) + &gate_inputs).mapv(sigmoid);
        let update = gates.slice(s![.., ..self.dim]);
        let reset = gates.slice(s![.., self.dim..]);

        let reset_states = &h * &reset;
        let candidate = (&reset_states.dot(&self.state_to_state) + &x).mapv(f32::tanh);
        let next = &candidate * &update + &(&h * &update.mapv(|u| 1.0 - u));
        let next = carry_masked(next, h, mask)?;

        tracing::trace!(batch = next.len_of(Axis(0)), "gated step");
        Ok(Values::from([("states".to_string(), Value::Float(next))]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use ndarray::array;

    #[test]
    fn gate_inputs_are_twice_the_state_dim() {
        let cell = GatedRecurrent::new(3);

        assert_eq!(cell.get_dim("inputs").unwrap(), 3);
        assert_eq!(cell.get_dim("gate_inputs").unwrap(), 6);
        assert_eq!(cell.get_dim("states").unwrap(), 3);
    }

    #[test]
    fn zero_weights_mix_candidate_by_half() {
        // With zero recurrent weights and zero gate inputs both gates are 0.5,
        // so h' = 0.5 * tanh(x) + 0.5 * h.
        let cell = GatedRecurrent::new(1);
        let inputs = Values::from([
            ("inputs".to_string(), Value::Float(array![[1.0_f32]])),
            ("gate_inputs".to_string(), Value::Float(array![[0.0_f32, 0.0]])),
        ]);
        let states = Values::from([("states".to_string(), Value::Float(array![[0.4_f32]]))]);

        let out = cell.step(&inputs, &states, None).unwrap();

        let h = out["states"].as_float("states").unwrap()[[0, 0]];
        assert!((h - (0.5 * 1.0_f32.tanh() + 0.2)).abs() < 1e-6);
    }

    #[test]
    fn mask_zero_keeps_previous_state() {
        let cell = GatedRecurrent::new(1);
        let inputs = Values::from([
            ("inputs".to_string(), Value::Float(array![[1.0_f32], [1.0]])),
            ("gate_inputs".to_string(), Value::Float(array![[0.0_f32, 0.0], [0.0, 0.0]])),
        ]);
        let states = Values::from([("states".to_string(), Value::Float(array![[0.4_f32], [0.4]]))]);
        let mask = array![0.0_f32, 1.0];

        let out = cell.step(&inputs, &states, Some(mask.view())).unwrap();

        let h = out["states"].as_float("states").unwrap().to_owned();
        assert!((h[[0, 0]] - 0.4).abs() < 1e-6);
        assert!((h[[1, 0]] - 0.4).abs() > 1e-3);
    }

    #[test]
    fn wrong_gate_input_width_is_an_error() {
        let cell = GatedRecurrent::new(2);
        let inputs = Values::from([
            ("inputs".to_string(), Value::Float(array![[0.0_f32, 0.0]])),
            ("gate_inputs".to_string(), Value::Float(array![[0.0_f32, 0.0]])),
        ]);
        let states = cell.initial_states(1).unwrap();

        let err = cell.step(&inputs, &states, None).unwrap_err();

        assert!(matches!(
            err,
            Error::Brick(BrickError::DimensionMismatch {
                what: "gate input width",
                expected: 4,
                got: 2,
                ..
            })
        ));
    }
}
