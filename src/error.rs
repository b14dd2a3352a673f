use core::fmt;

/// Result alias for `netfold`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by graph construction, parsing, and folding.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input was empty (no nodes).
    EmptyInput,

    /// Malformed input: bad syntax, duplicate node, weight on an
    /// unweighted graph, unknown section, invalid option.
    InvalidInput {
        /// Error message.
        message: String,
    },

    /// A link references a node id that does not exist.
    UnknownNode {
        /// The offending id.
        id: u32,
    },

    /// Link consistency is broken: a back-link is missing or an
    /// undirected arc pair carries unequal weights.
    ConsistencyViolation {
        /// Source node id.
        src: u32,
        /// Destination node id.
        dst: u32,
        /// Error message.
        message: String,
    },

    /// Broken invariant during folding (a bug, not a user error).
    Internal {
        /// Error message.
        message: String,
    },

    /// I/O failure while reading input.
    Io {
        /// Error message.
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "empty input provided"),
            Error::InvalidInput { message } => write!(f, "invalid input: {message}"),
            Error::UnknownNode { id } => {
                write!(f, "link references an unknown node: #{id}")
            }
            Error::ConsistencyViolation { src, dst, message } => {
                write!(f, "inconsistent links {src} <-> {dst}: {message}")
            }
            Error::Internal { message } => write!(f, "internal error: {message}"),
            Error::Io { message } => write!(f, "i/o error: {message}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(Error::EmptyInput.to_string(), "empty input provided");
        assert_eq!(
            Error::UnknownNode { id: 7 }.to_string(),
            "link references an unknown node: #7"
        );
        let err = Error::InvalidInput {
            message: "duplicate node #3".into(),
        };
        assert_eq!(err.to_string(), "invalid input: duplicate node #3");
    }
}
