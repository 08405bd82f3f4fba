/// Error type for matcher construction and source record extraction.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// Invalid architecture specification string.
    #[error("invalid architecture specification: {0}")]
    InvalidArch(String),

    /// Regular expression that failed to compile.
    #[error("invalid regular expression '{pattern}': {reason}")]
    InvalidRegex {
        /// The pattern as given.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// Glob pattern that failed to compile.
    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidGlob {
        /// The pattern as given.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// Syntax error in a query pattern.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// A well-formed pattern term that cannot be turned into a matcher
    /// (unknown name, wrong arguments).
    #[error("unsupported pattern term ?{term}: {reason}")]
    UnsupportedTerm {
        /// Term name without the leading `?`.
        term: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Unparsable dependency clause in a build-dependency field.
    #[error("problem parsing dependency: {field}")]
    DependencyParse {
        /// Field the clause came from (e.g. `Build-Depends`).
        field: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// Unparsable dependency clause outside of any record field.
    #[error("invalid dependency: {0}")]
    InvalidDependency(String),

    /// Malformed `<hash> <size> <name>` triplet in a checksum field.
    #[error("error parsing '{0}' record")]
    MalformedFileList(String),

    /// Unknown hash name or malformed `KIND:value` string.
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    /// Malformed stanza in a tag file.
    #[error("malformed stanza: {0}")]
    InvalidSection(String),

    /// Malformed OpenPGP clear-signed message.
    #[error("malformed clear-signed message: {0}")]
    InvalidSignedMessage(String),

    /// The record source could not be opened or read.
    #[error("failed to open {path}: {reason}")]
    Open {
        /// Path that was being opened.
        path: String,
        /// Underlying I/O error message.
        reason: String,
    },
}

/// Result type for matcher and source record operations.
pub type Result<T> = std::result::Result<T, Error>;
