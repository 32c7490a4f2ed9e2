//! The data type lattice used throughout the analyzer and generator.

#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use std::fmt;

/// A closed set of data types. Only [`DataType::Int`] and
/// [`DataType::Void`] are legal in a well-typed program; the other two
/// variants exist for the analyzer's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub enum DataType {
    /// An unannotated declaration; never appears after a clean parse
    /// of a fully-typed program.
    Unknown,
    Void,
    Int,
    /// Produced by the analyzer to suppress cascading diagnostics once
    /// an error has already been reported for an expression.
    Error,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Unknown => "unknown",
            DataType::Void => "void",
            DataType::Int => "int",
            DataType::Error => "<error>",
        };
        f.write_str(s)
    }
}

impl DataType {
    /// Parses a declared-type annotation string (`"int"` / `"void"`)
    /// as produced by the parser. Anything else maps to `Unknown`.
    pub fn from_annotation(s: &str) -> DataType {
        match s {
            "int" => DataType::Int,
            "void" => DataType::Void,
            _ => DataType::Unknown,
        }
    }
}

/// `true` iff `a` and `b` are both non-`Void`, non-`Error`, and equal.
/// With only `Int` legal this reduces to "both `Int`", but the
/// predicate is stated generally so a richer type lattice could extend
/// it without touching every call site.
pub fn types_compatible(a: DataType, b: DataType) -> bool {
    a != DataType::Void && a != DataType::Error && b != DataType::Void && b != DataType::Error && a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_is_compatible_with_int() {
        assert!(types_compatible(DataType::Int, DataType::Int));
    }

    #[test]
    fn void_is_never_compatible() {
        assert!(!types_compatible(DataType::Void, DataType::Void));
        assert!(!types_compatible(DataType::Void, DataType::Int));
    }

    #[test]
    fn error_is_never_compatible() {
        assert!(!types_compatible(DataType::Error, DataType::Int));
    }

    #[test]
    fn annotation_parsing() {
        assert_eq!(DataType::from_annotation("int"), DataType::Int);
        assert_eq!(DataType::from_annotation("void"), DataType::Void);
        assert_eq!(DataType::from_annotation("bogus"), DataType::Unknown);
    }
}
