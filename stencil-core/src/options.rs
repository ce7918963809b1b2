//! Compile-time tuning shared by the pack and unpack builders

use crate::constants::{
    DEFAULT_UNROLL_LIMIT, LOOP_RECOVERY_MAX_UNIT, LOOP_RECOVERY_MIN_TEMPLATE_LEN,
    LOOP_RECOVERY_MIN_UNROLLED,
};
use serde::{Deserialize, Serialize};

/// Options controlling how a template is compiled
///
/// Every field has a default, so a partial JSON object deserializes into a
/// complete set of options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Rewrite hand-unrolled runs (`CCCC...`) into counted groups before parsing
    pub loop_recovery: bool,
    /// Templates shorter than this skip loop recovery
    pub loop_recovery_min_template_len: usize,
    /// A run must cover at least this many directives to be rewritten
    pub loop_recovery_min_unrolled: usize,
    /// Longest repeating unit considered, in directives
    pub loop_recovery_max_unit: usize,
    /// Fixed repeats up to this count are unrolled into sequences
    pub unroll_limit: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            loop_recovery: true,
            loop_recovery_min_template_len: LOOP_RECOVERY_MIN_TEMPLATE_LEN,
            loop_recovery_min_unrolled: LOOP_RECOVERY_MIN_UNROLLED,
            loop_recovery_max_unit: LOOP_RECOVERY_MAX_UNIT,
            unroll_limit: DEFAULT_UNROLL_LIMIT,
        }
    }
}

impl CompileOptions {
    /// Default options with loop recovery switched off
    pub fn without_loop_recovery() -> Self {
        Self {
            loop_recovery: false,
            ..Self::default()
        }
    }

    /// Replace the unroll limit
    pub fn with_unroll_limit(mut self, limit: usize) -> Self {
        self.unroll_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_fills_defaults() {
        let opts: CompileOptions = serde_json::from_str(r#"{"unroll_limit": 0}"#).unwrap();
        assert_eq!(opts.unroll_limit, 0);
        assert!(opts.loop_recovery);
        assert_eq!(opts.loop_recovery_max_unit, LOOP_RECOVERY_MAX_UNIT);
    }

    #[test]
    fn test_builders() {
        let opts = CompileOptions::without_loop_recovery().with_unroll_limit(8);
        assert!(!opts.loop_recovery);
        assert_eq!(opts.unroll_limit, 8);
    }
}
