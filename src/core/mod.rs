mod data;
mod engine;
mod report;
mod types;

pub use data::{F1_OPTIMAL_THRESHOLD, ROI_OPTIMAL_THRESHOLD, ReferenceData};
pub use engine::{breakeven_rate_percent, calculate_roi, resolve_segment, threshold_curve};
pub use report::simulation_report_csv;
pub use types::{
    DecileRow, EconomicParameters, GlobalStats, RoiResult, SegmentSelection, SegmentSummary,
    TargetMode, ThresholdCurvePoint, ThresholdRow,
};
