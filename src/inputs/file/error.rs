// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

use crate::message::BuilderError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    #[error("Regex error: {0}")]
    Regex(String),

    #[error("Unsupported charset: {0}")]
    Charset(String),

    #[error("Watcher error: {0}")]
    Watcher(String),

    #[error("Message build error: {0}")]
    Builder(#[from] BuilderError),
}

impl From<notify::Error> for Error {
    fn from(e: notify::Error) -> Self {
        Error::Watcher(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
