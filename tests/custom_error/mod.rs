use thiserror::Error;

#[derive(Debug, Error)]
#[error("custom error occurred")]
pub struct CustomError;
