//! Daily metric tracking and the charts derived from it.

pub mod chart;
pub mod model;
pub mod routes;

pub use chart::{ChartPoint, ChartWindow, MacroSummary, MacroTotals, macro_summary, weight_series};
pub use model::{DailyLog, LogEntry};
pub use routes::{TrackingRouteState, tracking_routes};
