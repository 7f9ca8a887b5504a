use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TargetMode {
    Decile,
    Threshold,
    Custom,
}

/// User-adjustable economics of one retention action. Rates are fractions,
/// not percentages: `effectiveness = 0.12` means 12% of contacted
/// down-sellers are retained.
#[derive(Debug, Clone, Copy)]
pub struct EconomicParameters {
    pub action_cost: f64,
    pub value_saved: f64,
    pub effectiveness: f64,
}

/// One population decile ranked by predicted down-sell risk, 1 = highest.
/// `down_rate` is the published observed rate (rounded to 4 decimals);
/// `lift` is that rate relative to the global average.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecileRow {
    pub decile: u32,
    pub client_count: u64,
    pub down_count: u64,
    pub down_rate: f64,
    pub lift: f64,
}

impl DecileRow {
    pub fn derived_rate(&self) -> f64 {
        self.down_count as f64 / self.client_count as f64
    }
}

/// Customers at or above a minimum predicted-probability cutoff.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdRow {
    pub threshold: f64,
    pub client_count: u64,
    pub pct_clients: f64,
    pub down_count: u64,
}

impl ThresholdRow {
    pub fn derived_rate(&self) -> f64 {
        self.down_count as f64 / self.client_count as f64
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub total_clients: u64,
    pub total_test_sample: u64,
    pub global_down_rate: f64,
}

/// Targeting strategy for one simulation pass. Exactly one variant is active
/// per request.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentSelection {
    Deciles(Vec<u32>),
    Threshold(f64),
    Custom { client_count: u64, down_rate: f64 },
}

/// A resolved segment ready to feed the ROI calculator.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSummary {
    pub client_count: u64,
    pub down_rate: f64,
    /// Populated in threshold mode: the table row actually used.
    pub matched_threshold: Option<f64>,
}

/// Financial outcome of acting on one segment. Constructed fresh on every
/// parameter or selection change, never persisted.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiResult {
    pub clients: f64,
    pub expected_down: f64,
    pub total_cost: f64,
    pub retained: f64,
    pub value_saved_total: f64,
    pub net_benefit: f64,
    pub roi_percent: f64,
}

/// One point of the ROI-versus-threshold chart.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdCurvePoint {
    pub threshold: f64,
    pub targeted_clients: u64,
    pub roi_percent: f64,
}
