use thiserror::Error;

#[derive(Error, Debug)]
pub enum KubetrailError {
    #[error("Invalid configuration: {0}")]
    Config(String),
}
