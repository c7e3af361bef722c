//! can-driver: data layouts and bindings for the vendor USB-CAN adapter
//!
//! This crate defines the fixed frame and batch-buffer layouts the native
//! driver library reads and writes, the command vocabulary it accepts, and
//! the [`CanDriver`] capability trait the rest of the stack is written
//! against. The default build enables a `mock` backend so binaries and tests
//! compile on any host without the native library; the `vendor` feature
//! links the real adapter driver.

mod types;
pub use types::{CanFrame, RawBatch, SortedBatch, BATCH_CAPACITY, STATUS_OK};

mod command;
pub use command::{Parameter, SendOptions, SendType};

mod error;
pub use error::{DriverError, Result};

mod traits;
pub use traits::CanDriver;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockCall, MockDriver, MockSample};

#[cfg(feature = "vendor")]
mod vendor;

#[cfg(feature = "vendor")]
pub use vendor::VendorDriver;
