//! Fork: one input projected into several named outputs.

use crate::error::{BrickError, Result};
use crate::init::InitConfig;
use crate::linear::Linear;
use crate::traits::Brick;
use crate::types::{Value, Values};
use ndarray::ArrayView2;
use rand::rngs::StdRng;

/// Splits one vector into named projections, one [`Linear`] per output name.
#[derive(Clone, Debug)]
pub struct Fork {
    name: String,
    output_names: Vec<String>,
    pub input_dim: Option<usize>,
    output_dims: Option<Vec<usize>>,
    children: Vec<Linear>,
}

impl Fork {
    /// Create a fork whose children are copies of `prototype` named
    /// `fork_<output name>`.
    pub fn new(output_names: Vec<String>, prototype: Linear) -> Self {
        let children = output_names
            .iter()
            .map(|name| prototype.renamed(format!("fork_{name}")))
            .collect();

        Self {
            name: "fork".to_string(),
            output_names,
            input_dim: None,
            output_dims: None,
            children,
        }
    }

    /// Output names, in projection order.
    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    /// Output dimensions aligned with [`output_names`](Self::output_names).
    pub fn output_dims(&self) -> Option<&[usize]> {
        self.output_dims.as_deref()
    }

    /// Set output dimensions, one per output name.
    pub fn set_output_dims(&mut self, dims: Vec<usize>) -> Result<()> {
        if dims.len() != self.output_names.len() {
            return Err(BrickError::DimensionMismatch {
                brick: self.name.clone(),
                what: "output dims count",
                expected: self.output_names.len(),
                got: dims.len(),
            }
            .into());
        }
        self.output_dims = Some(dims);
        Ok(())
    }

    /// Projection for one output name.
    pub fn child(&self, output_name: &str) -> Option<&Linear> {
        self.output_names
            .iter()
            .position(|name| name == output_name)
            .map(|i| &self.children[i])
    }

    /// Mutable projection for one output name.
    pub fn child_mut(&mut self, output_name: &str) -> Option<&mut Linear> {
        self.output_names
            .iter()
            .position(|name| name == output_name)
            .map(|i| &mut self.children[i])
    }

    /// Project `(batch, input_dim)` into every output, keyed by name.
    pub fn apply(&self, x: ArrayView2<'_, f32>) -> Result<Values> {
        self.output_names
            .iter()
            .zip(&self.children)
            .map(|(name, child)| -> Result<(String, Value)> {
                Ok((name.clone(), Value::Float(child.apply(x)?)))
            })
            .collect()
    }
}

impl Brick for Fork {
    fn name(&self) -> &str {
        &self.name
    }

    fn push_allocation_config(&mut self) -> Result<()> {
        let dims = self.output_dims.as_ref().ok_or_else(|| BrickError::NotConfigured {
            brick: self.name.clone(),
            field: "output_dims",
        })?;

        for (child, &dim) in self.children.iter_mut().zip(dims) {
            child.input_dim = self.input_dim;
            child.output_dim = Some(dim);
        }
        Ok(())
    }

    fn allocate(&mut self) -> Result<()> {
        self.push_allocation_config()?;
        for child in &mut self.children {
            child.allocate()?;
        }
        tracing::debug!(outputs = ?self.output_names, dims = ?self.output_dims, "fork allocated");
        Ok(())
    }

    fn initialize(&mut self, config: &InitConfig, rng: &mut StdRng) -> Result<()> {
        for child in &mut self.children {
            child.initialize(config, rng)?;
        }
        Ok(())
    }
}
