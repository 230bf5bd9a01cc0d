pub mod codec;
pub mod command;
pub mod conv;
pub mod framer;
pub mod response;

#[cfg(test)]
pub mod fake;

use thiserror::Error;

/// Transport faults. Everything the meter itself gets wrong (silence,
/// garbage, unparsable numbers) is absorbed by the protocol layer and
/// never shows up here.
#[derive(Error, Debug)]
pub enum MeterError {
    #[error("I/O error: {:?}", _0)]
    Io(#[from] std::io::Error),

    #[error("Serial I/O error: {:?}", _0)]
    Serial(#[from] tokio_serial::Error),
}

pub type Result<T> = std::result::Result<T, MeterError>;
