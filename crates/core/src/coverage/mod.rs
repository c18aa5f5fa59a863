//! Coverage report aggregation

pub mod clover;
pub mod report;
pub mod root;
pub mod sloc;

pub use clover::{CloverDataset, FileNode, LineStat, PackageNode, ProjectNode, StatementMetrics};
pub use report::CoverageReport;
pub use root::find_common_root;
pub use sloc::{CodeLineCounter, LineCounter};
