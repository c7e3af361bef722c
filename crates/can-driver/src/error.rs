use thiserror::Error;

pub type Result<T, E = DriverError> = core::result::Result<T, E>;

/// Failure reported by the native driver, carrying its raw status code.
///
/// This layer never interprets vendor codes beyond the success sentinel;
/// the value is preserved for the caller.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum DriverError {
    #[error("device open rejected by driver (status {0})")]
    Open(i32),
    #[error("channel init rejected by driver (status {0})")]
    Config(i32),
    #[error("command send failed (status {0})")]
    Send(i32),
    #[error("batch receive failed (status {0})")]
    Receive(i32),
}

impl DriverError {
    /// The raw status code the driver returned.
    pub fn status(&self) -> i32 {
        match *self {
            DriverError::Open(s)
            | DriverError::Config(s)
            | DriverError::Send(s)
            | DriverError::Receive(s) => s,
        }
    }
}
