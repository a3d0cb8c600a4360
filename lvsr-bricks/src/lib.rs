//! lvsr-bricks: recurrent, transducer and shallow-fusion bricks for
//! attention-based speech recognizers.
//!
//! # Architecture
//!
//! The library is built around three core traits:
//!
//! - [`traits::Brick`]: parameterized component with deferred allocation
//! - [`traits::RecurrentCell`]: one step of a recurrent transition, driven
//!   over time by [`recurrent::scan`]
//! - [`traits::AbstractReadout`]: emission scores and their distribution
//!
//! On top of those sit the three components a language-model-aware decoder
//! needs:
//!
//! - [`recurrent::with_fork::RecurrentWithFork`]: projects one input
//!   sequence into every input a recurrent cell expects
//! - [`transducer::FstTransition`]: walks a weighted language-model
//!   transducer in step with the network and scores the vocabulary
//! - [`readout::fusion::ShallowFusionReadout`]: adds the language-model
//!   probabilities to a base readout
//!
//! # Quick Start
//!
//! ```ignore
//! use lvsr_bricks::fst::LanguageModelFst;
//! use lvsr_bricks::fst::remap::Vocabulary;
//! use lvsr_bricks::recurrent::scan;
//! use lvsr_bricks::transducer::FstTransition;
//! use std::sync::Arc;
//!
//! let lm = LanguageModelFst::read("lm.fst")?;
//! let remap = Vocabulary::from_file("vocab.txt")?.remap_table(&lm, Some("</s>"))?;
//! let cell = FstTransition::new(lm, Arc::new(remap));
//!
//! let outputs = scan(&cell, &steps, None, Default::default())?;
//! ```

pub mod config;
pub mod error;
pub mod fork;
pub mod fst;
pub mod init;
pub mod linear;
pub mod readout;
pub mod recurrent;
pub mod traits;
pub mod transducer;
pub mod types;
