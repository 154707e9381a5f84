//! Candidate keys and their specificity.
//!
//! A candidate key names an implementation that may cover a coordinate.
//! Each format axis is either the coordinate's concrete format or the
//! `any` wildcard, so every coordinate has eight candidate keys.

use std::cmp::Ordering;
use std::fmt;

use crate::catalog::{Coordinate, Operation, PixelFormat};

/// A key naming implementations that cover some coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateKey {
    pub op: Operation,
    pub a: PixelFormat,
    pub b: PixelFormat,
    pub d: PixelFormat,
}

/// Precedence of a matched key. Larger ranks win.
///
/// Field order makes the derived ordering compare specificity first, then
/// prefer a concrete A axis, then B, then D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyRank {
    pub specificity: u8,
    pub a_concrete: bool,
    pub b_concrete: bool,
    pub d_concrete: bool,
}

impl CandidateKey {
    /// The fully concrete key for a coordinate.
    pub fn exact(coord: Coordinate) -> Self {
        Self {
            op: coord.op,
            a: coord.a,
            b: coord.b,
            d: coord.d,
        }
    }

    /// The eight keys that may cover `coord`.
    ///
    /// Axes nest A outermost and D innermost, wildcard before concrete.
    pub fn covering(coord: Coordinate) -> [CandidateKey; 8] {
        let axis = |format: PixelFormat| [PixelFormat::Any, format];
        let mut keys = [CandidateKey::exact(coord); 8];
        let mut i = 0;
        for a in axis(coord.a) {
            for b in axis(coord.b) {
                for d in axis(coord.d) {
                    keys[i] = CandidateKey { op: coord.op, a, b, d };
                    i += 1;
                }
            }
        }
        keys
    }

    /// Number of concrete (non-wildcard) format axes.
    pub fn specificity(&self) -> u8 {
        [self.a, self.b, self.d]
            .iter()
            .filter(|format| format.is_concrete())
            .count() as u8
    }

    pub fn rank(&self) -> KeyRank {
        KeyRank {
            specificity: self.specificity(),
            a_concrete: self.a.is_concrete(),
            b_concrete: self.b.is_concrete(),
            d_concrete: self.d.is_concrete(),
        }
    }

    /// Whether this key covers `coord`.
    pub fn covers(&self, coord: Coordinate) -> bool {
        let axis = |key: PixelFormat, actual: PixelFormat| key == PixelFormat::Any || key == actual;
        self.op == coord.op && axis(self.a, coord.a) && axis(self.b, coord.b) && axis(self.d, coord.d)
    }

    /// The symbol-name prefix for this key, e.g. `multiply_any_rgba8_rgba8`.
    pub fn text(&self, symbol_prefix: &str) -> String {
        format!("{}{}", symbol_prefix, self)
    }

    /// Parses the textual form back into a key.
    pub fn parse(text: &str, symbol_prefix: &str) -> Option<CandidateKey> {
        let rest = text.strip_prefix(symbol_prefix)?;
        let parts: Vec<&str> = rest.split('_').collect();
        if parts.len() < 4 {
            return None;
        }
        // Operation names may themselves contain underscores.
        let (op_parts, formats) = parts.split_at(parts.len() - 3);
        let op = Operation::from_key_name(&op_parts.join("_"))?;
        Some(CandidateKey {
            op,
            a: PixelFormat::from_key_name(formats[0])?,
            b: PixelFormat::from_key_name(formats[1])?,
            d: PixelFormat::from_key_name(formats[2])?,
        })
    }
}

impl fmt::Display for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}_{}", self.op, self.a, self.b, self.d)
    }
}

/// Whether `symbol` names an implementation for the key text `key`.
///
/// The symbol must be the key itself or the key followed by `_` and a
/// suffix. A bare prefix test would let `multiply_any_any_anyx` claim the
/// key `multiply_any_any_any`.
pub fn symbol_matches(symbol: &str, key: &str) -> bool {
    match symbol.strip_prefix(key) {
        Some(rest) => rest.is_empty() || rest.starts_with('_'),
        None => false,
    }
}

/// Compares the precedence of two keys.
///
/// Returns `Ordering::Greater` if `k1` takes precedence over `k2`.
pub fn compare_specificity(k1: &CandidateKey, k2: &CandidateKey) -> Ordering {
    k1.rank().cmp(&k2.rank())
}
