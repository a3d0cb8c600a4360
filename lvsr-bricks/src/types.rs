//! Core types for lvsr-bricks

use crate::error::{BrickError, Result};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis, stack};
use std::collections::BTreeMap;

/// Per-example batch quantity passed between bricks.
///
/// Float values are `(batch, dim)` matrices. Index values are `(batch,)`
/// vectors, used for zero-dimensional ports such as transducer states and
/// input symbols.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Dense features, `(batch, dim)`
    Float(Array2<f32>),
    /// One integer per example, `(batch,)`
    Index(Array1<i64>),
}

/// Named values, ordered by name.
pub type Values = BTreeMap<String, Value>;

impl Value {
    /// Number of examples in the batch.
    pub fn batch_size(&self) -> usize {
        match self {
            Value::Float(x) => x.nrows(),
            Value::Index(x) => x.len(),
        }
    }

    /// Borrow as a float matrix, failing with the port `name` otherwise.
    pub fn as_float(&self, name: &str) -> Result<ArrayView2<'_, f32>> {
        match self {
            Value::Float(x) => Ok(x.view()),
            Value::Index(_) => Err(BrickError::ValueKind {
                name: name.to_string(),
                expected: "float",
            }
            .into()),
        }
    }

    /// Borrow as an index vector, failing with the port `name` otherwise.
    pub fn as_index(&self, name: &str) -> Result<ArrayView1<'_, i64>> {
        match self {
            Value::Index(x) => Ok(x.view()),
            Value::Float(_) => Err(BrickError::ValueKind {
                name: name.to_string(),
                expected: "index",
            }
            .into()),
        }
    }
}

impl From<Array2<f32>> for Value {
    fn from(x: Array2<f32>) -> Self {
        Value::Float(x)
    }
}

impl From<Array1<i64>> for Value {
    fn from(x: Array1<i64>) -> Self {
        Value::Index(x)
    }
}

/// Look up a named value.
pub fn require<'a>(values: &'a Values, name: &str) -> Result<&'a Value> {
    values.get(name).ok_or_else(|| {
        BrickError::MissingInput {
            name: name.to_string(),
        }
        .into()
    })
}

/// Union of two name maps; a name present in both is an error.
pub fn dict_union(mut left: Values, right: Values) -> Result<Values> {
    for (name, value) in right {
        if left.contains_key(&name) {
            return Err(BrickError::DuplicateInput { name }.into());
        }
        left.insert(name, value);
    }
    Ok(left)
}

/// Stack one float output across time steps into `(time, batch, dim)`.
pub fn stack_float(steps: &[Values], name: &str) -> Result<Array3<f32>> {
    let views = steps
        .iter()
        .map(|step| require(step, name)?.as_float(name))
        .collect::<Result<Vec<_>>>()?;
    Ok(stack(Axis(0), &views)?)
}

/// Stack one index output across time steps into `(time, batch)`.
pub fn stack_index(steps: &[Values], name: &str) -> Result<Array2<i64>> {
    let views = steps
        .iter()
        .map(|step| require(step, name)?.as_index(name))
        .collect::<Result<Vec<_>>>()?;
    Ok(stack(Axis(0), &views)?)
}
