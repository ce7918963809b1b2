//! Text encoding tags and their unification lattice

use serde::{Deserialize, Serialize};

/// Declared text encoding of a result
///
/// Pack directives propose an encoding and the proposals are folded with
/// [`Encoding::unify`]. The fold starts from `Default`, which no directive
/// proposes and which [`Encoding::finalize`] turns into `Binary`. The join
/// follows the chain `Default < UsAscii < Binary < Utf8`: raw bytes widen
/// US-ASCII text, and UTF-8 wins over everything.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Encoding {
    /// Nothing proposed yet
    #[default]
    Default,
    /// 7-bit US-ASCII
    UsAscii,
    /// Raw bytes (ASCII-8BIT)
    Binary,
    /// UTF-8
    Utf8,
}

impl Encoding {
    /// Merge two proposals; commutative and associative with `Default` as identity.
    pub fn unify(self, other: Encoding) -> Encoding {
        core::cmp::max(self, other)
    }

    /// The tag a result carries once every proposal is folded in
    pub const fn finalize(self) -> Encoding {
        match self {
            Encoding::Default => Encoding::Binary,
            other => other,
        }
    }

    /// Canonical encoding name
    pub const fn name(&self) -> &'static str {
        match self {
            Encoding::Default | Encoding::Binary => "ASCII-8BIT",
            Encoding::UsAscii => "US-ASCII",
            Encoding::Utf8 => "UTF-8",
        }
    }

    /// Whether text in this encoding is measured in characters rather than bytes
    pub const fn is_multibyte(&self) -> bool {
        matches!(self, Encoding::Utf8)
    }
}

impl core::fmt::Display for Encoding {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
