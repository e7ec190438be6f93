use thiserror::Error;

/// Fatal conditions that abort a compilation run.
///
/// Everything here is unrecoverable by design: either the full reformatted
/// schema is produced, or the caller gets one of these and nothing is
/// printed. Recoverable conditions (an unknown type named in a
/// directive-copy request) go through `tracing::warn!` instead and never
/// surface as errors.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("parse error at offset {offset}: {message}")]
    Parse { message: String, offset: usize },

    #[error("schema nesting exceeds the maximum depth of {limit}")]
    RecursionLimit { limit: usize },

    #[error("{construct} declaration has no name")]
    MissingName { construct: &'static str },

    #[error("malformed field block in `{type_name}`")]
    MalformedFields { type_name: String },

    #[error("type `{type_name}` implements more than one interface")]
    MultipleInterfaces { type_name: String },

    #[error("type `{type_name}` implements unknown interface `{interface}`")]
    UnknownInterface {
        type_name: String,
        interface: String,
    },

    #[error("duplicate key `{key}` in syntax tree record")]
    DuplicateKey { key: String },

    #[error("auth fragment `{path}` could not be read")]
    MissingFragment {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
