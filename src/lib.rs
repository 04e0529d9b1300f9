pub mod executor;
pub mod filter;
pub mod harvest;
pub mod model;
pub mod osgi;
pub mod report;
pub mod traits;

// Re-export common types for convenience
pub use executor::*;
pub use filter::{FilterNode, FilterParseError};
pub use model::*;
pub use report::{ReportFormat, ReportRow, TabularReporter};
pub use traits::*;
