//! Weighted language-model transducer and the operators stepping through it.
//!
//! Weights live in the tropical semiring and are read as negative
//! log-probabilities. Epsilon arcs (label `0`) are backoff arcs: when a state
//! has no arc for a label, the walk follows its backoff arc, accumulating the
//! backoff weight, and retries from there.

pub mod ops;
pub mod remap;

use crate::error::{FstError, Result};
use rustfst::prelude::*;
use rustfst::{EPS_LABEL, Label, StateId, SymbolTable, Tr};
use std::path::Path;
use std::sync::Arc;

fn backend(e: impl std::fmt::Display) -> FstError {
    FstError::Backend(e.to_string())
}

/// Shared, read-only language-model transducer.
#[derive(Clone, Debug)]
pub struct LanguageModelFst {
    fst: Arc<VectorFst<TropicalWeight>>,
    start: StateId,
}

impl LanguageModelFst {
    /// Wrap an automaton, which must declare a start state.
    pub fn new(fst: VectorFst<TropicalWeight>) -> Result<Self> {
        let start = fst.start().ok_or(FstError::NoStart)?;
        tracing::debug!(num_states = fst.num_states(), start, "transducer loaded");
        Ok(Self {
            fst: Arc::new(fst),
            start,
        })
    }

    /// Read a binary transducer file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let fst = VectorFst::<TropicalWeight>::read(path.as_ref()).map_err(backend)?;
        Self::new(fst)
    }

    /// Read an AT&T text transducer file.
    pub fn read_text(path: impl AsRef<Path>) -> Result<Self> {
        let fst = VectorFst::<TropicalWeight>::read_text(path.as_ref()).map_err(backend)?;
        Self::new(fst)
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn num_states(&self) -> usize {
        self.fst.num_states()
    }

    /// Input symbol table, when the transducer carries one.
    pub fn input_symbols(&self) -> Option<&Arc<SymbolTable>> {
        self.fst.input_symbols()
    }

    /// Validate a batch state identifier.
    pub fn state(&self, state: i64) -> Result<StateId> {
        let invalid = || FstError::InvalidState {
            state,
            num_states: self.num_states(),
        };
        let id = StateId::try_from(state).map_err(|_| invalid())?;
        if (id as usize) < self.num_states() {
            Ok(id)
        } else {
            Err(invalid().into())
        }
    }

    /// Lowest-weight arc leaving `state` with input `label`.
    pub fn arc(&self, state: StateId, label: Label) -> Result<Option<Tr<TropicalWeight>>> {
        let trs = self.fst.get_trs(state).map_err(backend)?;
        Ok(trs
            .trs()
            .iter()
            .filter(|tr| tr.ilabel == label)
            .min_by(|a, b| a.weight.value().total_cmp(b.weight.value()))
            .cloned())
    }

    /// Backoff arc leaving `state`.
    pub fn backoff(&self, state: StateId) -> Result<Option<Tr<TropicalWeight>>> {
        self.arc(state, EPS_LABEL)
    }

    /// Follow `label` from `state`, backing off as needed.
    ///
    /// Returns the reached state and the accumulated weight.
    pub fn transition(&self, state: StateId, label: Label) -> Result<(StateId, f32)> {
        self.walk(state, label)?
            .ok_or_else(|| FstError::NoTransition { state, label }.into())
    }

    /// Weight of reading `label` in `state`; infinite when unreachable.
    pub fn cost(&self, state: StateId, label: Label) -> Result<f32> {
        Ok(self.walk(state, label)?.map_or(f32::INFINITY, |(_, w)| w))
    }

    /// Weight of ending the sequence in `state`; infinite when unreachable.
    pub fn final_cost(&self, state: StateId) -> Result<f32> {
        let mut state = state;
        let mut weight = 0.0;
        for _ in 0..=self.num_states() {
            if let Some(w) = self.fst.final_weight(state).map_err(backend)? {
                return Ok(weight + *w.value());
            }
            match self.backoff(state)? {
                Some(tr) => {
                    weight += *tr.weight.value();
                    state = tr.nextstate;
                }
                None => break,
            }
        }
        Ok(f32::INFINITY)
    }

    // Bounded by the state count so that a backoff cycle cannot loop forever.
    fn walk(&self, state: StateId, label: Label) -> Result<Option<(StateId, f32)>> {
        let mut state = state;
        let mut weight = 0.0;
        for _ in 0..=self.num_states() {
            if let Some(tr) = self.arc(state, label)? {
                return Ok(Some((tr.nextstate, weight + *tr.weight.value())));
            }
            match self.backoff(state)? {
                Some(tr) => {
                    weight += *tr.weight.value();
                    state = tr.nextstate;
                }
                None => break,
            }
        }
        Ok(None)
    }
}
