use thiserror::Error;

/// Why a command line failed validation before ever reaching the book.
///
/// Every variant maps to the single `INVALID INPUT` wire response
/// (spec.md §4.2/§7); the variants exist so rejects can be logged with a
/// specific reason without the client ever seeing more than the generic
/// text.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty command")]
    EmptyLine,
    #[error("unrecognised command `{0}`")]
    UnknownCommand(String),
    #[error("missing argument")]
    MissingArgument,
    #[error("argument `{0}` is not a valid number")]
    NotANumber(String),
    #[error("price must be > 0")]
    NonPositivePrice,
    #[error("quantity must be > 0")]
    NonPositiveQuantity,
    #[error("order id must be > 0")]
    NonPositiveOrderId,
    #[error("too many arguments")]
    TooManyArguments,
}

/// Fatal, process-level failures. Logged to stderr; `main` exits non-zero.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to bind listener on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}
