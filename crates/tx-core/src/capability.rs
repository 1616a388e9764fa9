//! Capability negotiation across an operator tree.
//!
//! Every node answers capability queries by combining its children's answers
//! with the kind's combining rule, starting from the kind's default. A node
//! that forces a value returns it directly instead of folding.

use std::fmt;

/// Widest vectorized access any node will advertise.
pub const MAX_VECTOR_WIDTH: u32 = 8;

/// Queryable execution properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    /// Number of adjacent elements along the last dimension readable at once.
    VectorWidth,
    /// Whether elements may be evaluated concurrently.
    Parallel,
    /// Where the data behind a node lives.
    Placement,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 3] = [
        CapabilityKind::VectorWidth,
        CapabilityKind::Parallel,
        CapabilityKind::Placement,
    ];

    /// Value reported by a leaf with no opinion.
    pub fn default_value(&self) -> CapabilityValue {
        match self {
            CapabilityKind::VectorWidth => CapabilityValue::Width(MAX_VECTOR_WIDTH),
            CapabilityKind::Parallel => CapabilityValue::Flag(true),
            CapabilityKind::Placement => CapabilityValue::Placement(Placement::Any),
        }
    }

    /// The value no combination can tighten further.
    pub fn most_restrictive(&self) -> CapabilityValue {
        match self {
            CapabilityKind::VectorWidth => CapabilityValue::Width(1),
            CapabilityKind::Parallel => CapabilityValue::Flag(false),
            CapabilityKind::Placement => CapabilityValue::Placement(Placement::Host),
        }
    }
}

/// Memory placement ordered from least to most restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placement {
    Any,
    Device,
    Host,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityValue {
    Width(u32),
    Flag(bool),
    Placement(Placement),
}

impl CapabilityValue {
    pub fn as_width(&self) -> Option<u32> {
        match self {
            CapabilityValue::Width(w) => Some(*w),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            CapabilityValue::Flag(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_placement(&self) -> Option<Placement> {
        match self {
            CapabilityValue::Placement(p) => Some(*p),
            _ => None,
        }
    }
}

impl fmt::Display for CapabilityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityValue::Width(w) => write!(f, "width({})", w),
            CapabilityValue::Flag(b) => write!(f, "{}", b),
            CapabilityValue::Placement(p) => write!(f, "{:?}", p),
        }
    }
}

/// Combines two answers for `kind`.
///
/// Width takes the minimum, flags are ANDed and placement keeps the more
/// restrictive side. Values of the wrong representation collapse to the most
/// restrictive answer.
pub fn combine(kind: CapabilityKind, a: CapabilityValue, b: CapabilityValue) -> CapabilityValue {
    match (kind, a, b) {
        (CapabilityKind::VectorWidth, CapabilityValue::Width(x), CapabilityValue::Width(y)) => {
            CapabilityValue::Width(x.min(y))
        }
        (CapabilityKind::Parallel, CapabilityValue::Flag(x), CapabilityValue::Flag(y)) => {
            CapabilityValue::Flag(x && y)
        }
        (
            CapabilityKind::Placement,
            CapabilityValue::Placement(x),
            CapabilityValue::Placement(y),
        ) => CapabilityValue::Placement(x.max(y)),
        _ => kind.most_restrictive(),
    }
}

/// Folds child answers starting from the kind's default.
pub fn fold<I>(kind: CapabilityKind, values: I) -> CapabilityValue
where
    I: IntoIterator<Item = CapabilityValue>,
{
    values
        .into_iter()
        .fold(kind.default_value(), |acc, v| combine(kind, acc, v))
}
