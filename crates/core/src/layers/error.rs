/// Failure to read a vector document.
///
/// Surfaced to the operator as a validation error; never a panic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Malformed markup at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    #[error("Element <{0}> is never closed")]
    Unclosed(String),

    #[error("Document has more than one root element")]
    MultipleRoots,

    #[error("Document has no root element")]
    MissingRoot,

    #[error("Text content found outside the root element")]
    TextOutsideRoot,

    #[error("Root element <{0}> is not an svg document")]
    NotVector(String),
}
