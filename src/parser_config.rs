//! Parser options for controlling strict/lenient parsing.
//!
//! These options trade strict PDF compliance for broader compatibility
//! with malformed files, and bound the resources a single document may use.
//!
//! # Example
//!
//! ```
//! use pdf_press::parser_config::ParserOptions;
//!
//! // Strict mode - unterminated strings and streams are errors
//! let strict = ParserOptions::strict();
//!
//! // Lenient mode - recover and continue (default)
//! let lenient = ParserOptions::lenient();
//! assert!(!lenient.strict);
//! assert!(strict.strict);
//! ```

/// Parser options for controlling error handling and recovery behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Fail on malformed tokens (true) or recover (false)
    ///
    /// In strict mode an unterminated literal string, hex string or stream
    /// raises `MalformedToken`. In lenient mode the remainder of the input is
    /// taken as the token body.
    pub strict: bool,

    /// Maximum array/dictionary nesting depth
    ///
    /// PDF Spec: ISO 32000-1:2008, Annex C - Implementation Limits
    pub max_nesting: usize,

    /// Maximum decompression ratio (decompressed:compressed), 0 disables the check
    pub max_decompression_ratio: u32,

    /// Maximum decompressed stream size in bytes, 0 disables the check
    pub max_decompressed_size: usize,

    /// Maximum depth when resolving chains of indirect objects
    pub max_recursion_depth: u32,
}

impl Default for ParserOptions {
    /// Default configuration: lenient mode
    fn default() -> Self {
        Self::lenient()
    }
}

impl ParserOptions {
    /// Strict mode: fail on any malformed token.
    pub fn strict() -> Self {
        Self {
            strict: true,
            max_nesting: 100,
            max_decompression_ratio: 100,
            max_decompressed_size: 100 * 1024 * 1024, // 100 MB
            max_recursion_depth: 100,
        }
    }

    /// Lenient mode: attempt to recover from parsing errors.
    ///
    /// Only the absolute size cap applies; the ratio check is off.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            max_nesting: 100,
            max_decompression_ratio: 0,
            max_decompressed_size: 100 * 1024 * 1024,
            max_recursion_depth: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_mode() {
        let opts = ParserOptions::strict();
        assert!(opts.strict);
        assert_eq!(opts.max_decompression_ratio, 100);
    }

    #[test]
    fn test_lenient_mode_is_default() {
        let opts = ParserOptions::default();
        assert!(!opts.strict);
        assert_eq!(opts, ParserOptions::lenient());
    }
}
