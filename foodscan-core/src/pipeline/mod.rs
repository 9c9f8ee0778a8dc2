//! The scan-to-display pipeline.
//!
//! - `ScanController` runs scanner → product fetch → image load and pushes
//!   results into a `ProductView`
//! - background stages run on a bounded `TaskRunner` and can be cancelled
//! - a newer scan, or `shutdown`, cancels older work before it reaches the view

mod runner;
mod session;

pub use runner::{TaskHandle, TaskRunner};
pub use session::{ScanController, ScanReport, ScanState};
