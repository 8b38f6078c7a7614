#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("missing required field {0:?}")]
    MissingField(&'static str),
    #[error("invalid rule action {0:?}")]
    InvalidAction(String),
}
