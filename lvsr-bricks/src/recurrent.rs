//! Recurrent cells and the driver that runs them across time.

pub mod gated;
pub mod simple;
pub mod with_fork;

use crate::error::{BrickError, Result};
use crate::traits::RecurrentCell;
use crate::types::{Values, dict_union};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

/// Run `cell` over `steps`, threading its states from one step to the next.
///
/// `steps` holds one map of sequence values per time step. `mask` is
/// `(time, batch)`. `initial` may override any state and supply the cell's
/// contexts; states it leaves out come from
/// [`RecurrentCell::initial_states`]. Returns the cell's outputs per step.
pub fn scan<C>(
    cell: &C,
    steps: &[Values],
    mask: Option<ArrayView2<'_, f32>>,
    initial: Values,
) -> Result<Vec<Values>>
where
    C: RecurrentCell + ?Sized,
{
    let Some(batch_size) = steps
        .first()
        .and_then(|step| step.values().next())
        .map(|value| value.batch_size())
    else {
        return Ok(Vec::new());
    };

    if let Some(mask) = mask {
        check_extent("mask time steps", steps.len(), mask.nrows())?;
        check_extent("mask batch size", batch_size, mask.ncols())?;
    }

    let mut states = cell.initial_states(batch_size)?;
    let mut contexts = Values::new();
    for (name, value) in initial {
        if cell.states().contains(&name.as_str()) {
            states.insert(name, value);
        } else if cell.contexts().contains(&name.as_str()) {
            contexts.insert(name, value);
        } else {
            return Err(BrickError::UnknownName {
                brick: "scan".to_string(),
                name,
            }
            .into());
        }
    }

    let mut outputs = Vec::with_capacity(steps.len());
    for (t, step) in steps.iter().enumerate() {
        let inputs = dict_union(step.clone(), contexts.clone())?;

        let mask_row = mask.map(|m| m.index_axis_move(Axis(0), t));
        let mut step_outputs = cell.step(&inputs, &states, mask_row)?;

        for &name in cell.states() {
            let value = crate::types::require(&step_outputs, name)?;
            states.insert(name.to_string(), value.clone());
        }
        step_outputs.retain(|name, _| cell.outputs().contains(&name.as_str()));

        tracing::trace!(step = t, "recurrent step");
        outputs.push(step_outputs);
    }

    Ok(outputs)
}

/// Keep `next` where the mask is 1 and `prev` where it is 0.
pub(crate) fn carry_masked(
    next: Array2<f32>,
    prev: ArrayView2<'_, f32>,
    mask: Option<ArrayView1<'_, f32>>,
) -> Result<Array2<f32>> {
    let Some(mask) = mask else {
        return Ok(next);
    };
    check_extent("mask batch size", next.nrows(), mask.len())?;

    let keep = mask.insert_axis(Axis(1));
    let hold = keep.mapv(|m| 1.0 - m);
    Ok(next * &keep + &(&prev * &hold))
}

/// Check a `(batch, dim)` port against the expected batch size and width.
pub(crate) fn check_port(
    brick: &str,
    what: &'static str,
    value: ArrayView2<'_, f32>,
    batch_size: usize,
    dim: usize,
) -> Result<()> {
    let mismatch = |what: &'static str, expected: usize, got: usize| -> Result<()> {
        Err(BrickError::DimensionMismatch {
            brick: brick.to_string(),
            what,
            expected,
            got,
        }
        .into())
    };
    if value.ncols() != dim {
        return mismatch(what, dim, value.ncols());
    }
    if value.nrows() != batch_size {
        return mismatch("batch size", batch_size, value.nrows());
    }
    Ok(())
}

fn check_extent(what: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(BrickError::DimensionMismatch {
            brick: "scan".to_string(),
            what,
            expected,
            got,
        }
        .into());
    }
    Ok(())
}
