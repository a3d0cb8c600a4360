//! Core traits for brick components.

use crate::error::Result;
use crate::init::InitConfig;
use crate::types::Values;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;

/// Parameterized component with deferred allocation.
///
/// Dimensions may be configured after construction. `push_allocation_config`
/// propagates them to children, `allocate` creates zeroed parameters and
/// `initialize` fills them.
pub trait Brick {
    /// Brick name used in errors and logs.
    fn name(&self) -> &str;

    /// Propagate configuration to children.
    fn push_allocation_config(&mut self) -> Result<()> {
        Ok(())
    }

    /// Create parameters. Requires every lazy dimension to be known.
    fn allocate(&mut self) -> Result<()>;

    /// Fill allocated parameters.
    fn initialize(&mut self, config: &InitConfig, rng: &mut StdRng) -> Result<()>;
}

/// Recurrent transition with named ports.
///
/// A dimension of `0` marks a scalar-per-example port carried as
/// [`Value::Index`](crate::types::Value::Index).
pub trait RecurrentCell {
    /// Per-step inputs, including `"mask"` when the cell accepts one.
    fn sequences(&self) -> &[&'static str];

    /// Carried state names.
    fn states(&self) -> &[&'static str];

    /// Emitted output names.
    fn outputs(&self) -> &[&'static str] {
        self.states()
    }

    /// Per-sequence constants.
    fn contexts(&self) -> &[&'static str] {
        &[]
    }

    /// Dimension of a named port.
    fn get_dim(&self, name: &str) -> Result<usize>;

    /// States before the first step.
    fn initial_states(&self, batch_size: usize) -> Result<Values>;

    /// Compute outputs (which include the next states) for one time step.
    ///
    /// `inputs` holds this step's sequence values and the contexts; the
    /// mask row holds one 0/1 value per example.
    fn step(
        &self,
        inputs: &Values,
        states: &Values,
        mask: Option<ArrayView1<'_, f32>>,
    ) -> Result<Values>;
}

/// Component computing emission scores from named recurrent quantities.
pub trait AbstractReadout {
    /// Names read by [`readout`](Self::readout).
    fn source_names(&self) -> &[String];

    /// Width of the produced scores.
    fn readout_dim(&self) -> usize;

    /// Emission scores, `(batch, readout_dim)`. Extra names are ignored.
    fn readout(&self, values: &Values) -> Result<Array2<f32>>;

    /// Sample one output per example.
    fn emit(&self, readouts: ArrayView2<'_, f32>, rng: &mut StdRng) -> Result<Array1<i64>>;

    /// Negative log-likelihood of `outputs`, one per example.
    fn cost(
        &self,
        readouts: ArrayView2<'_, f32>,
        outputs: ArrayView1<'_, i64>,
    ) -> Result<Array1<f32>>;
}
