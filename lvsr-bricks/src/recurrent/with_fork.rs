//! Recurrent cell fed through a fork of its per-gate inputs.

use crate::error::{BrickError, Result};
use crate::fork::Fork;
use crate::init::InitConfig;
use crate::linear::Linear;
use crate::recurrent::scan;
use crate::traits::{Brick, RecurrentCell};
use crate::types::Values;
use ndarray::{ArrayView2, ArrayView3, Axis};
use rand::rngs::StdRng;

/// Wraps a recurrent cell so that it consumes a single input sequence.
///
/// Each time step's input vector is projected once per sequence name of the
/// wrapped cell (except `"mask"`), and the projections are fed to the cell
/// under those names. The projection widths come from the cell's
/// [`get_dim`](RecurrentCell::get_dim); only `input_dim` has to be supplied.
#[derive(Clone, Debug)]
pub struct RecurrentWithFork<C> {
    name: String,
    recurrent: C,
    input_dim: Option<usize>,
    fork: Fork,
}

impl<C: RecurrentCell + Brick> RecurrentWithFork<C> {
    pub fn new(recurrent: C, input_dim: Option<usize>) -> Self {
        let output_names = recurrent
            .sequences()
            .iter()
            .filter(|&&name| name != "mask")
            .map(|name| name.to_string())
            .collect();

        Self {
            name: "recurrent_with_fork".to_string(),
            recurrent,
            input_dim,
            fork: Fork::new(output_names, Linear::new("fork_prototype")),
        }
    }

    pub fn set_input_dim(&mut self, input_dim: usize) {
        self.input_dim = Some(input_dim);
    }

    pub fn input_dim(&self) -> Option<usize> {
        self.input_dim
    }

    pub fn recurrent(&self) -> &C {
        &self.recurrent
    }

    pub fn recurrent_mut(&mut self) -> &mut C {
        &mut self.recurrent
    }

    pub fn fork(&self) -> &Fork {
        &self.fork
    }

    pub fn fork_mut(&mut self) -> &mut Fork {
        &mut self.fork
    }

    /// Output names of [`apply`](Self::apply): the wrapped cell's states.
    pub fn apply_outputs(&self) -> &[&'static str] {
        self.recurrent.states()
    }

    /// Run the wrapped cell over `input`, `(time, batch, input_dim)`.
    ///
    /// `kwargs` supplies initial states and contexts of the wrapped cell.
    /// Naming one of the forked inputs there is an error.
    pub fn apply(
        &self,
        input: ArrayView3<'_, f32>,
        mask: Option<ArrayView2<'_, f32>>,
        kwargs: Values,
    ) -> Result<Vec<Values>> {
        if let Some(name) = kwargs
            .keys()
            .find(|name| self.fork.output_names().contains(name))
        {
            return Err(BrickError::DuplicateInput { name: name.clone() }.into());
        }

        let steps = input
            .axis_iter(Axis(0))
            .map(|x| self.fork.apply(x))
            .collect::<Result<Vec<_>>>()?;

        scan(&self.recurrent, &steps, mask, kwargs)
    }
}

impl<C: RecurrentCell + Brick> Brick for RecurrentWithFork<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn push_allocation_config(&mut self) -> Result<()> {
        let input_dim = self.input_dim.ok_or_else(|| BrickError::NotConfigured {
            brick: self.name.clone(),
            field: "input_dim",
        })?;
        self.fork.input_dim = Some(input_dim);

        let output_dims = self
            .fork
            .output_names()
            .iter()
            .map(|name| self.recurrent.get_dim(name))
            .collect::<Result<Vec<_>>>()?;
        self.fork.set_output_dims(output_dims)
    }

    fn allocate(&mut self) -> Result<()> {
        self.push_allocation_config()?;
        self.fork.allocate()?;
        self.recurrent.allocate()?;
        tracing::debug!(input_dim = ?self.input_dim, recurrent = self.recurrent.name(), "allocated");
        Ok(())
    }

    fn initialize(&mut self, config: &InitConfig, rng: &mut StdRng) -> Result<()> {
        self.fork.initialize(config, rng)?;
        self.recurrent.initialize(config, rng)
    }
}
