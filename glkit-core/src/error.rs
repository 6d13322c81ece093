/// Error type shared by the math, mesh and settings modules
use std::path::PathBuf;

/// Errors produced by glkit-core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Operand shapes that no overload of `op` accepts.
    #[error("incompatible operand shapes for {op}: {left} and {right}")]
    ShapeMismatch {
        op: &'static str,
        left: String,
        right: String,
    },

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Malformed input text. `line` is 1-based.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("matrix is singular and cannot be inverted")]
    SingularMatrix,

    #[error("failed to read '{0}': {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid settings: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_mentions_line() {
        let err = Error::parse(12, "bad float 'x'");
        assert_eq!(err.to_string(), "parse error on line 12: bad float 'x'");
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = Error::ShapeMismatch {
            op: "add",
            left: "vec3".to_string(),
            right: "vec4".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "incompatible operand shapes for add: vec3 and vec4"
        );
    }
}
