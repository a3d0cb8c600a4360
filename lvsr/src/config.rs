//! Configuration types for resolved CLI arguments.
//!
//! Args structs (for CLI parsing) live next to their subcommands; the
//! Config structs here hold the loaded transducer and vocabulary.

use crate::cli::FstArgs;
use eyre::{Context, Result};
use lvsr_bricks::fst::LanguageModelFst;
use lvsr_bricks::fst::remap::{RemapTable, Vocabulary};
use std::sync::Arc;

/// Loaded transducer with its vocabulary mapping.
///
/// Converted from FstArgs via TryFrom.
#[derive(Debug)]
pub struct ModelConfig {
    pub fst: LanguageModelFst,
    pub vocab: Vocabulary,
    pub remap: Arc<RemapTable>,
}

impl TryFrom<FstArgs> for ModelConfig {
    type Error = eyre::Error;

    fn try_from(args: FstArgs) -> Result<Self> {
        tracing::info!(path = ?args.fst.display(), text = args.text, "loading transducer");

        let fst = if args.text {
            LanguageModelFst::read_text(&args.fst)
        } else {
            LanguageModelFst::read(&args.fst)
        }
        .wrap_err_with(|| format!("failed to load transducer: {:?}", args.fst.display()))?;

        let vocab = Vocabulary::from_file(&args.vocab)
            .wrap_err_with(|| format!("failed to load vocabulary: {:?}", args.vocab.display()))?;

        let eos = vocab.id(&args.eos).map(|_| args.eos.as_str());
        let remap = vocab
            .remap_table(&fst, eos)
            .wrap_err("failed to map vocabulary onto transducer labels")?;

        Ok(Self {
            fst,
            vocab,
            remap: Arc::new(remap),
        })
    }
}

impl ModelConfig {
    /// Network ids of `symbols`.
    pub fn symbol_ids(&self, symbols: &[String]) -> Result<Vec<i64>> {
        symbols
            .iter()
            .map(|symbol| {
                self.vocab
                    .id(symbol)
                    .map(|id| id as i64)
                    .ok_or_else(|| eyre::eyre!("symbol not in vocabulary: {symbol:?}"))
            })
            .collect()
    }
}
