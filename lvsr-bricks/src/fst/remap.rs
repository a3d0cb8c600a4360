//! Mapping from network output symbols to transducer input labels.

use crate::error::{FstError, Result};
use crate::fst::LanguageModelFst;
use rustfst::{EPS_LABEL, Label, SymbolTable};
use std::path::Path;

/// Fixed table from network symbol ids `0..len` to transducer labels.
///
/// One network symbol may be designated end-of-sequence; it has no label and
/// is scored by the final weight of the current state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemapTable {
    labels: Vec<Label>,
    eos: Option<usize>,
}

impl RemapTable {
    /// Build from explicit labels; the `eos` entry's label is ignored.
    pub fn new(labels: Vec<Label>, eos: Option<usize>) -> Self {
        Self { labels, eos }
    }

    /// Resolve `(symbol, label)` entries; unlabelled ones go through `symbols`.
    fn resolve<'a>(
        entries: impl IntoIterator<Item = (&'a str, Option<Label>)>,
        symbols: Option<&SymbolTable>,
        eos: Option<&str>,
    ) -> Result<Self> {
        let mut eos_id = None;
        let labels = entries
            .into_iter()
            .enumerate()
            .map(|(i, (symbol, label))| -> Result<Label> {
                if Some(symbol) == eos {
                    eos_id = Some(i);
                    return Ok(EPS_LABEL);
                }
                label
                    .or_else(|| symbols.and_then(|table| table.get_label(symbol)))
                    .ok_or_else(|| {
                        FstError::UnknownLabel {
                            symbol: symbol.to_string(),
                        }
                        .into()
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            labels,
            eos: eos_id,
        })
    }

    /// Output vocabulary size.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// End-of-sequence network symbol, if any.
    pub fn eos(&self) -> Option<usize> {
        self.eos
    }

    pub fn is_eos(&self, symbol: usize) -> bool {
        self.eos == Some(symbol)
    }

    /// Validate a network symbol id.
    pub fn symbol(&self, symbol: i64) -> Result<usize> {
        usize::try_from(symbol)
            .ok()
            .filter(|&s| s < self.labels.len())
            .ok_or_else(|| {
                FstError::UnknownSymbol {
                    symbol,
                    size: self.labels.len(),
                }
                .into()
            })
    }

    /// Transducer label of a validated network symbol.
    pub fn label(&self, symbol: usize) -> Label {
        self.labels[symbol]
    }
}

/// Network vocabulary: one symbol per line, line order gives the symbol id.
///
/// A line may carry an explicit transducer label after whitespace
/// (`symbol label`); otherwise the label is looked up in the transducer's
/// input symbol table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocabulary {
    entries: Vec<(String, Option<Label>)>,
}

impl Vocabulary {
    pub fn parse(text: &str) -> Result<Self> {
        let entries = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| -> Result<(String, Option<Label>)> {
                let mut fields = line.split_whitespace();
                let symbol = fields.next().unwrap_or_default().to_string();
                let label = match fields.next() {
                    Some(field) => Some(field.parse::<Label>().map_err(|_| {
                        FstError::UnknownLabel {
                            symbol: symbol.clone(),
                        }
                    })?),
                    None => None,
                };
                if fields.next().is_some() {
                    return Err(FstError::MalformedVocabulary {
                        line: i + 1,
                        text: line.to_string(),
                    }
                    .into());
                }
                Ok((symbol, label))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { entries })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(symbol, _)| symbol.as_str())
    }

    /// Network id of `symbol`.
    pub fn id(&self, symbol: &str) -> Option<usize> {
        self.entries.iter().position(|(s, _)| s == symbol)
    }

    pub fn symbol(&self, id: usize) -> Option<&str> {
        self.entries.get(id).map(|(s, _)| s.as_str())
    }

    /// Resolve labels against `fst` into a remap table.
    pub fn remap_table(&self, fst: &LanguageModelFst, eos: Option<&str>) -> Result<RemapTable> {
        let entries = self
            .entries
            .iter()
            .map(|(symbol, label)| (symbol.as_str(), *label));
        let table = RemapTable::resolve(entries, fst.input_symbols().map(|table| &**table), eos)?;

        tracing::debug!(size = table.len(), eos = ?table.eos(), "remap table resolved");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn resolves_symbols_through_table() {
        let mut symbols = SymbolTable::new();
        let a = symbols.add_symbol("a");
        let b = symbols.add_symbol("b");

        let entries = [("b", None), ("a", None), ("</s>", None)];

        let table = RemapTable::resolve(entries, Some(&symbols), Some("</s>")).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.label(0), b);
        assert_eq!(table.label(1), a);
        assert!(table.is_eos(2));
    }

    #[test]
    fn missing_symbol_is_an_error() {
        let symbols = SymbolTable::new();

        let err = RemapTable::resolve([("zzz", None)], Some(&symbols), None).unwrap_err();

        assert!(matches!(err, Error::Fst(FstError::UnknownLabel { .. })));
    }

    #[test]
    fn validates_symbol_ids() {
        let table = RemapTable::new(vec![1, 2], None);

        assert_eq!(table.symbol(1).unwrap(), 1);
        assert!(matches!(
            table.symbol(2).unwrap_err(),
            Error::Fst(FstError::UnknownSymbol { symbol: 2, size: 2 })
        ));
        assert!(table.symbol(-1).is_err());
    }

    #[test]
    fn parses_vocabulary_with_explicit_labels() {
        let vocab = Vocabulary::parse("a 1\nb 2\n\n</s>\n").unwrap();

        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.id("b"), Some(1));
        assert_eq!(vocab.symbol(2), Some("</s>"));
    }

    #[test]
    fn rejects_malformed_labels() {
        assert!(Vocabulary::parse("a one\n").is_err());
    }

    #[test]
    fn rejects_extra_fields() {
        let err = Vocabulary::parse("a 1\nb 2 extra\n").unwrap_err();

        assert!(matches!(
            err,
            Error::Fst(FstError::MalformedVocabulary { line: 2, .. })
        ));
    }

    #[test]
    fn explicit_labels_win_over_input_symbols() {
        let mut symbols = SymbolTable::new();
        let a = symbols.add_symbol("a");
        symbols.add_symbol("b");

        let table = RemapTable::resolve([("a", None), ("b", Some(7))], Some(&symbols), None).unwrap();

        assert_eq!(table, RemapTable::new(vec![a, 7], None));
    }

    #[test]
    fn builds_remap_table_from_explicit_labels() {
        let lm = crate::fst::tests::bigram();
        let vocab = Vocabulary::parse("a 1\nb 2\n</s>\n").unwrap();

        let table = vocab.remap_table(&lm, Some("</s>")).unwrap();

        assert_eq!(table, RemapTable::new(vec![1, 2, EPS_LABEL], Some(2)));
    }

    #[test]
    fn unlabelled_entries_need_input_symbols() {
        let lm = crate::fst::tests::bigram();
        let vocab = Vocabulary::parse("a\n").unwrap();

        assert!(vocab.remap_table(&lm, None).is_err());
    }
}
