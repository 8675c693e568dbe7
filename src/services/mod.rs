pub mod analytics;
pub mod hierarchy;
pub mod import;

pub use analytics::{AnalyticsRepository, AnalyticsService, Summary};
pub use hierarchy::{HierarchyRepository, HierarchyService};
pub use import::{ImportOutcome, ImportRepository, ImportService, Upload};
