//! Implementation resolution for a single table cell.
//!
//! Given a coordinate and one module's symbols, the resolver picks the
//! implementation that covers the coordinate most specifically.
//!
//! # Algorithm Overview
//!
//! 1. **Expand**: build the eight candidate keys (each axis concrete or `any`)
//! 2. **Match**: ask the symbol source which symbols match each key
//! 3. **Check**: a key matched by more than one symbol is an error
//! 4. **Select**: the matched key with the highest [`KeyRank`] wins
//!
//! Selection depends only on rank, never on the order keys are queried.
//!
//! [`KeyRank`]: crate::key::KeyRank

use crate::catalog::Coordinate;
use crate::error::{DispatchError, DispatchResult};
use crate::key::CandidateKey;
use crate::symbols::SymbolSource;

/// A resolved implementation for one coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// The implementation symbol.
    pub symbol: String,
    /// The key the symbol matched.
    pub key: CandidateKey,
}

/// Finds the most specific implementation of a coordinate in one module.
#[derive(Debug, Clone, Default)]
pub struct KeyResolver {
    symbol_prefix: String,
}

impl KeyResolver {
    /// Creates a resolver for symbols carrying `symbol_prefix`.
    pub fn new(symbol_prefix: impl Into<String>) -> Self {
        Self {
            symbol_prefix: symbol_prefix.into(),
        }
    }

    pub fn symbol_prefix(&self) -> &str {
        &self.symbol_prefix
    }

    /// Resolves one coordinate against a module's symbols.
    ///
    /// Returns `Ok(None)` when the module has nothing for the coordinate.
    pub fn resolve(
        &self,
        source: &dyn SymbolSource,
        coord: Coordinate,
    ) -> DispatchResult<Option<Resolved>> {
        let mut best: Option<Resolved> = None;

        for key in CandidateKey::covering(coord) {
            let Some(symbol) = self.lookup(source, &key)? else {
                continue;
            };

            let better = match &best {
                Some(current) => key.rank() > current.key.rank(),
                None => true,
            };
            if better {
                best = Some(Resolved { symbol, key });
            }
        }

        Ok(best)
    }

    /// Returns the single symbol matching `key`, if any.
    pub fn lookup(
        &self,
        source: &dyn SymbolSource,
        key: &CandidateKey,
    ) -> DispatchResult<Option<String>> {
        let text = key.text(&self.symbol_prefix);
        let matches = source.matching(&text);

        match matches.as_slice() {
            [] => Ok(None),
            [symbol] => Ok(Some(symbol.to_string())),
            _ => Err(DispatchError::AmbiguousSymbol {
                module: source.module_name().to_string(),
                key: text,
                candidates: matches.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Operation, PixelFormat};
    use crate::symbols::SymbolTable;

    fn coord(op: Operation, a: PixelFormat, b: PixelFormat, d: PixelFormat) -> Coordinate {
        Coordinate::new(op, a, b, d)
    }

    #[test]
    fn test_exact_match() {
        let resolver = KeyResolver::default();
        let source = SymbolTable::from_symbols("m", ["multiply_rgba8_rgba8_rgba8_impl"]);
        let c = coord(
            Operation::Multiply,
            PixelFormat::Rgba8,
            PixelFormat::Rgba8,
            PixelFormat::Rgba8,
        );

        let resolved = resolver.resolve(&source, c).unwrap().unwrap();
        assert_eq!(resolved.symbol, "multiply_rgba8_rgba8_rgba8_impl");
        assert_eq!(resolved.key, CandidateKey::exact(c));
    }

    #[test]
    fn test_no_match() {
        let resolver = KeyResolver::default();
        let source = SymbolTable::from_symbols("m", ["screen_any_any_any"]);
        let c = coord(Operation::Dissolve, PixelFormat::V8, PixelFormat::V8, PixelFormat::V8);

        assert_eq!(resolver.resolve(&source, c).unwrap(), None);
    }

    #[test]
    fn test_wildcard_fallback() {
        let resolver = KeyResolver::default();
        let source = SymbolTable::from_symbols("m", ["normal_any_any_any_generic"]);

        for d in PixelFormat::CONCRETE {
            let c = coord(Operation::Normal, PixelFormat::Va8, PixelFormat::Rgb8, d);
            let resolved = resolver.resolve(&source, c).unwrap().unwrap();
            assert_eq!(resolved.symbol, "normal_any_any_any_generic");
            assert_eq!(resolved.key.specificity(), 0);
        }
    }

    #[test]
    fn test_concrete_output_beats_wildcard_output() {
        let resolver = KeyResolver::default();
        let source = SymbolTable::from_symbols(
            "m",
            ["burn_rgba8_rgba8_any_mmx", "burn_rgba8_rgba8_va8_mmx"],
        );

        for d in PixelFormat::CONCRETE {
            let c = coord(Operation::Burn, PixelFormat::Rgba8, PixelFormat::Rgba8, d);
            let resolved = resolver.resolve(&source, c).unwrap().unwrap();
            let expected = if d == PixelFormat::Va8 {
                "burn_rgba8_rgba8_va8_mmx"
            } else {
                "burn_rgba8_rgba8_any_mmx"
            };
            assert_eq!(resolved.symbol, expected);
        }
    }

    #[test]
    fn test_more_concrete_axes_win_regardless_of_lookup_order() {
        // Lookup order visits rgb8_any_any after any_rgb8_rgb8, so a
        // last-match-wins scan would pick the less specific key here.
        let symbols = ["hue_any_rgb8_rgb8_two", "hue_rgb8_any_any_one"];
        let c = coord(Operation::Hue, PixelFormat::Rgb8, PixelFormat::Rgb8, PixelFormat::Rgb8);
        let resolver = KeyResolver::default();
        let source = SymbolTable::from_symbols("m", symbols);

        let resolved = resolver.resolve(&source, c).unwrap().unwrap();
        assert_eq!(resolved.symbol, "hue_any_rgb8_rgb8_two");
        assert_eq!(resolved.key.specificity(), 2);
    }

    #[test]
    fn test_equal_specificity_prefers_concrete_a() {
        let resolver = KeyResolver::default();
        let source = SymbolTable::from_symbols(
            "m",
            ["scale_any_any_v8_d", "scale_any_v8_any_b", "scale_v8_any_any_a"],
        );
        let c = coord(Operation::Scale, PixelFormat::V8, PixelFormat::V8, PixelFormat::V8);

        assert_eq!(
            resolver.resolve(&source, c).unwrap().unwrap().symbol,
            "scale_v8_any_any_a"
        );
    }

    #[test]
    fn test_ambiguous_symbols() {
        let resolver = KeyResolver::default();
        let source = SymbolTable::from_symbols(
            "special.o",
            ["multiply_rgb8_rgb8_rgb8", "multiply_rgb8_rgb8_rgb8_sse"],
        );
        let c = coord(
            Operation::Multiply,
            PixelFormat::Rgb8,
            PixelFormat::Rgb8,
            PixelFormat::Rgb8,
        );

        match resolver.resolve(&source, c) {
            Err(DispatchError::AmbiguousSymbol {
                module,
                key,
                candidates,
            }) => {
                assert_eq!(module, "special.o");
                assert_eq!(key, "multiply_rgb8_rgb8_rgb8");
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("Expected AmbiguousSymbol, got {:?}", other),
        }
    }

    #[test]
    fn test_symbol_prefix() {
        let resolver = KeyResolver::new("gimp_composite_");
        let source = SymbolTable::from_symbols(
            "sse",
            ["gimp_composite_addition_rgba8_rgba8_rgba8_sse", "addition_any_any_any"],
        );
        let c = coord(
            Operation::Addition,
            PixelFormat::Rgba8,
            PixelFormat::Rgba8,
            PixelFormat::Rgba8,
        );
        assert_eq!(
            resolver.resolve(&source, c).unwrap().unwrap().symbol,
            "gimp_composite_addition_rgba8_rgba8_rgba8_sse"
        );

        let other = coord(Operation::Addition, PixelFormat::V8, PixelFormat::V8, PixelFormat::V8);
        assert_eq!(resolver.resolve(&source, other).unwrap(), None);
    }
}
