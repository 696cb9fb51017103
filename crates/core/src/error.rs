use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Invalid seed request: {0}")]
    Seed(String),
}
