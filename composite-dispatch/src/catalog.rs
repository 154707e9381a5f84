//! The coordinate space of the dispatch table.
//!
//! Variant order is significant. The position of each [`Operation`] and
//! [`PixelFormat`] is its index in the emitted C arrays, so it must line up
//! with the `GimpLayerModeEffects` and `GimpPixelFormat` enumerations of the
//! consuming library.
//!
//! # Layout
//!
//! ```text
//! table[operation][format A][format B][format D]
//!        32         4          4          4       = 2048 cells
//! ```
//!
//! [`PixelFormat::Any`] is the wildcard used when probing for symbols. It is
//! never a coordinate of the table itself.

use std::fmt;

use serde::{Deserialize, Serialize};

/// C enumeration prefix for operations.
pub const OPERATION_PREFIX: &str = "GIMP_COMPOSITE_";

/// C enumeration prefix for pixel formats.
pub const PIXEL_FORMAT_PREFIX: &str = "GIMP_PIXELFORMAT_";

/// Number of cells in one dispatch table.
pub const COORDINATE_COUNT: usize =
    Operation::ALL.len() * PixelFormat::CONCRETE.len().pow(3);

/// A compositing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Normal,
    Dissolve,
    Behind,
    Multiply,
    Screen,
    Overlay,
    Difference,
    Addition,
    Subtract,
    Darken,
    Lighten,
    Hue,
    Saturation,
    ColorOnly,
    Value,
    Divide,
    Dodge,
    Burn,
    Hardlight,
    Softlight,
    GrainExtract,
    GrainMerge,
    ColorErase,
    Erase,
    Replace,
    AntiErase,
    Blend,
    Shade,
    Swap,
    Scale,
    Convert,
    Xor,
}

impl Operation {
    /// Every operation, in table order.
    pub const ALL: [Operation; 32] = [
        Operation::Normal,
        Operation::Dissolve,
        Operation::Behind,
        Operation::Multiply,
        Operation::Screen,
        Operation::Overlay,
        Operation::Difference,
        Operation::Addition,
        Operation::Subtract,
        Operation::Darken,
        Operation::Lighten,
        Operation::Hue,
        Operation::Saturation,
        Operation::ColorOnly,
        Operation::Value,
        Operation::Divide,
        Operation::Dodge,
        Operation::Burn,
        Operation::Hardlight,
        Operation::Softlight,
        Operation::GrainExtract,
        Operation::GrainMerge,
        Operation::ColorErase,
        Operation::Erase,
        Operation::Replace,
        Operation::AntiErase,
        Operation::Blend,
        Operation::Shade,
        Operation::Swap,
        Operation::Scale,
        Operation::Convert,
        Operation::Xor,
    ];

    /// Index of this operation in the table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The enumerator name without its prefix, e.g. `COLOR_ONLY`.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Normal => "NORMAL",
            Operation::Dissolve => "DISSOLVE",
            Operation::Behind => "BEHIND",
            Operation::Multiply => "MULTIPLY",
            Operation::Screen => "SCREEN",
            Operation::Overlay => "OVERLAY",
            Operation::Difference => "DIFFERENCE",
            Operation::Addition => "ADDITION",
            Operation::Subtract => "SUBTRACT",
            Operation::Darken => "DARKEN",
            Operation::Lighten => "LIGHTEN",
            Operation::Hue => "HUE",
            Operation::Saturation => "SATURATION",
            Operation::ColorOnly => "COLOR_ONLY",
            Operation::Value => "VALUE",
            Operation::Divide => "DIVIDE",
            Operation::Dodge => "DODGE",
            Operation::Burn => "BURN",
            Operation::Hardlight => "HARDLIGHT",
            Operation::Softlight => "SOFTLIGHT",
            Operation::GrainExtract => "GRAIN_EXTRACT",
            Operation::GrainMerge => "GRAIN_MERGE",
            Operation::ColorErase => "COLOR_ERASE",
            Operation::Erase => "ERASE",
            Operation::Replace => "REPLACE",
            Operation::AntiErase => "ANTI_ERASE",
            Operation::Blend => "BLEND",
            Operation::Shade => "SHADE",
            Operation::Swap => "SWAP",
            Operation::Scale => "SCALE",
            Operation::Convert => "CONVERT",
            Operation::Xor => "XOR",
        }
    }

    /// The C enumerator, e.g. `GIMP_COMPOSITE_MULTIPLY`.
    pub fn c_name(self) -> String {
        format!("{}{}", OPERATION_PREFIX, self.name())
    }

    /// The name used in symbol keys, e.g. `color_only`.
    pub fn key_name(self) -> String {
        self.name().to_ascii_lowercase()
    }

    /// Looks up an operation by its key name.
    pub fn from_key_name(name: &str) -> Option<Operation> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_name())
    }
}

/// An in-memory pixel layout, or the `Any` wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Value (grey), 8 bits.
    V8,
    /// Value plus alpha, 8 bits each.
    Va8,
    /// Red, green, blue, 8 bits each.
    Rgb8,
    /// Red, green, blue, alpha, 8 bits each.
    Rgba8,
    /// Matches any concrete format.
    Any,
}

impl PixelFormat {
    /// The concrete formats, in table order.
    pub const CONCRETE: [PixelFormat; 4] = [
        PixelFormat::V8,
        PixelFormat::Va8,
        PixelFormat::Rgb8,
        PixelFormat::Rgba8,
    ];

    /// Index of this format along one table axis.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_concrete(self) -> bool {
        self != PixelFormat::Any
    }

    /// The enumerator name without its prefix.
    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::V8 => "V8",
            PixelFormat::Va8 => "VA8",
            PixelFormat::Rgb8 => "RGB8",
            PixelFormat::Rgba8 => "RGBA8",
            PixelFormat::Any => "ANY",
        }
    }

    /// The C enumerator, e.g. `GIMP_PIXELFORMAT_RGBA8`.
    pub fn c_name(self) -> String {
        format!("{}{}", PIXEL_FORMAT_PREFIX, self.name())
    }

    /// The name used in symbol keys, e.g. `rgba8`.
    pub fn key_name(self) -> String {
        self.name().to_ascii_lowercase()
    }

    /// The C pixel type used by the regression harness, e.g. `gimp_rgba8_t`.
    pub fn c_pixel_type(self) -> String {
        format!("gimp_{}_t", self.key_name())
    }

    /// Channel fields of the C pixel type.
    pub fn channels(self) -> &'static [&'static str] {
        match self {
            PixelFormat::V8 => &["v"],
            PixelFormat::Va8 => &["v", "a"],
            PixelFormat::Rgb8 => &["r", "g", "b"],
            PixelFormat::Rgba8 => &["r", "g", "b", "a"],
            PixelFormat::Any => &[],
        }
    }

    /// Looks up a format by its key name.
    pub fn from_key_name(name: &str) -> Option<PixelFormat> {
        [
            PixelFormat::V8,
            PixelFormat::Va8,
            PixelFormat::Rgb8,
            PixelFormat::Rgba8,
            PixelFormat::Any,
        ]
        .into_iter()
        .find(|format| format.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_name())
    }
}

/// One cell of the dispatch table.
///
/// The derived ordering is table order: operation-major, then A, B and D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub op: Operation,
    pub a: PixelFormat,
    pub b: PixelFormat,
    pub d: PixelFormat,
}

impl Coordinate {
    /// Creates a coordinate. All three formats must be concrete.
    pub fn new(op: Operation, a: PixelFormat, b: PixelFormat, d: PixelFormat) -> Self {
        debug_assert!(
            a.is_concrete() && b.is_concrete() && d.is_concrete(),
            "coordinates never use the wildcard format"
        );
        Self { op, a, b, d }
    }

    /// Position of this cell when the table is flattened in table order.
    pub fn flat_index(&self) -> usize {
        let n = PixelFormat::CONCRETE.len();
        ((self.op.index() * n + self.a.index()) * n + self.b.index()) * n + self.d.index()
    }

    /// Inverse of [`Coordinate::flat_index`].
    pub fn from_flat_index(index: usize) -> Option<Coordinate> {
        if index >= COORDINATE_COUNT {
            return None;
        }
        let n = PixelFormat::CONCRETE.len();
        let d = PixelFormat::CONCRETE[index % n];
        let b = PixelFormat::CONCRETE[(index / n) % n];
        let a = PixelFormat::CONCRETE[(index / (n * n)) % n];
        let op = Operation::ALL[index / (n * n * n)];
        Some(Coordinate { op, a, b, d })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}_{}", self.op, self.a, self.b, self.d)
    }
}

/// Every coordinate of the table, in table order.
pub fn coordinates() -> impl Iterator<Item = Coordinate> {
    Operation::ALL.into_iter().flat_map(|op| {
        PixelFormat::CONCRETE.into_iter().flat_map(move |a| {
            PixelFormat::CONCRETE.into_iter().flat_map(move |b| {
                PixelFormat::CONCRETE
                    .into_iter()
                    .map(move |d| Coordinate::new(op, a, b, d))
            })
        })
    })
}
