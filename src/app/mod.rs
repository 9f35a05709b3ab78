pub mod driver;
pub mod error;

pub use driver::{Driver, GroupSummary, Summary};
pub use error::{DriverError, Result};
