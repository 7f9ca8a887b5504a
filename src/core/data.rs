use super::types::{DecileRow, GlobalStats, ThresholdRow};

/// Published operating point maximising the classifier's F1 score.
pub const F1_OPTIMAL_THRESHOLD: f64 = 0.423;
/// Published operating point maximising campaign ROI.
pub const ROI_OPTIMAL_THRESHOLD: f64 = 0.7;

const TOTAL_CLIENTS: u64 = 857_141;
const TOTAL_TEST_SAMPLE: u64 = 171_429;
const GLOBAL_DOWN_RATE: f64 = 0.4041;

// (decile, clients, downs, observed rate, lift) from the scored test sample.
const DECILE_TABLE: [(u32, u64, u64, f64, f64); 10] = [
    (1, 17_142, 15_687, 0.9151, 2.265),
    (2, 17_142, 10_827, 0.6316, 1.563),
    (3, 17_142, 8_948, 0.5220, 1.292),
    (4, 17_142, 7_729, 0.4509, 1.116),
    (5, 17_142, 6_799, 0.3966, 0.982),
    (6, 17_142, 5_836, 0.3405, 0.843),
    (7, 17_142, 4_840, 0.2823, 0.699),
    (8, 17_142, 3_929, 0.2292, 0.567),
    (9, 17_142, 2_946, 0.1719, 0.425),
    (10, 17_151, 1_729, 0.1008, 0.249),
];

// (threshold, targeted clients, % of population, targeted downs), ascending.
const THRESHOLD_TABLE: [(f64, u64, f64, u64); 6] = [
    (0.3, 129_296, 75.4, 61_462),
    (0.4, 101_454, 59.2, 53_705),
    (0.423, 95_000, 55.4, 50_000),
    (0.5, 78_705, 45.9, 45_773),
    (0.6, 54_280, 31.7, 35_163),
    (0.7, 29_634, 17.3, 22_377),
];

// Published rates are rounded to 4 decimals.
const RATE_TOLERANCE: f64 = 1e-4;

/// Immutable decile and threshold tables plus global population statistics.
/// Loaded once at process start and shared read-only for the process
/// lifetime; `load` fails fast if the constants violate an invariant.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    deciles: Vec<DecileRow>,
    thresholds: Vec<ThresholdRow>,
    global: GlobalStats,
}

impl ReferenceData {
    pub fn load() -> Result<Self, String> {
        let deciles: Vec<DecileRow> = DECILE_TABLE
            .iter()
            .map(
                |&(decile, client_count, down_count, down_rate, lift)| DecileRow {
                    decile,
                    client_count,
                    down_count,
                    down_rate,
                    lift,
                },
            )
            .collect();

        let thresholds: Vec<ThresholdRow> = THRESHOLD_TABLE
            .iter()
            .map(
                |&(threshold, client_count, pct_clients, down_count)| ThresholdRow {
                    threshold,
                    client_count,
                    pct_clients,
                    down_count,
                },
            )
            .collect();

        let global = GlobalStats {
            total_clients: TOTAL_CLIENTS,
            total_test_sample: TOTAL_TEST_SAMPLE,
            global_down_rate: GLOBAL_DOWN_RATE,
        };

        validate_deciles(&deciles)?;
        validate_thresholds(&thresholds)?;
        validate_global(global)?;

        Ok(Self {
            deciles,
            thresholds,
            global,
        })
    }

    pub fn deciles(&self) -> &[DecileRow] {
        &self.deciles
    }

    pub fn thresholds(&self) -> &[ThresholdRow] {
        &self.thresholds
    }

    pub fn global_stats(&self) -> GlobalStats {
        self.global
    }
}

fn validate_deciles(deciles: &[DecileRow]) -> Result<(), String> {
    if deciles.len() != 10 {
        return Err(format!("expected 10 decile rows, found {}", deciles.len()));
    }

    for (index, row) in deciles.iter().enumerate() {
        if row.decile != index as u32 + 1 {
            return Err(format!(
                "decile rows must be ordered 1..=10, found decile {} at position {}",
                row.decile, index
            ));
        }
        if row.client_count == 0 {
            return Err(format!("decile {} has no clients", row.decile));
        }
        if row.down_count > row.client_count {
            return Err(format!(
                "decile {}: down count {} exceeds client count {}",
                row.decile, row.down_count, row.client_count
            ));
        }
        if !(0.0..=1.0).contains(&row.down_rate) {
            return Err(format!(
                "decile {}: down rate {} outside [0, 1]",
                row.decile, row.down_rate
            ));
        }
        if (row.down_rate - row.derived_rate()).abs() > RATE_TOLERANCE {
            return Err(format!(
                "decile {}: published rate {} disagrees with {}/{}",
                row.decile, row.down_rate, row.down_count, row.client_count
            ));
        }
    }

    Ok(())
}

fn validate_thresholds(thresholds: &[ThresholdRow]) -> Result<(), String> {
    if thresholds.is_empty() {
        return Err("threshold table is empty".to_string());
    }

    for row in thresholds {
        if !(0.0..=1.0).contains(&row.threshold) {
            return Err(format!("threshold {} outside [0, 1]", row.threshold));
        }
        if row.client_count == 0 {
            return Err(format!("threshold {} has no clients", row.threshold));
        }
        if row.down_count > row.client_count {
            return Err(format!(
                "threshold {}: down count {} exceeds client count {}",
                row.threshold, row.down_count, row.client_count
            ));
        }
        if !(0.0..=100.0).contains(&row.pct_clients) {
            return Err(format!(
                "threshold {}: population share {} outside [0, 100]",
                row.threshold, row.pct_clients
            ));
        }
    }

    // A stricter cutoff can never include more customers than a looser one.
    for pair in thresholds.windows(2) {
        let (looser, stricter) = (pair[0], pair[1]);
        if stricter.threshold <= looser.threshold {
            return Err(format!(
                "threshold rows must be strictly ascending, found {} after {}",
                stricter.threshold, looser.threshold
            ));
        }
        if stricter.client_count > looser.client_count {
            return Err(format!(
                "client count rises from {} to {} between thresholds {} and {}",
                looser.client_count, stricter.client_count, looser.threshold, stricter.threshold
            ));
        }
        if stricter.down_count > looser.down_count {
            return Err(format!(
                "down count rises from {} to {} between thresholds {} and {}",
                looser.down_count, stricter.down_count, looser.threshold, stricter.threshold
            ));
        }
    }

    Ok(())
}

fn validate_global(global: GlobalStats) -> Result<(), String> {
    if global.total_clients == 0 || global.total_test_sample == 0 {
        return Err("global population counts must be > 0".to_string());
    }
    if global.total_test_sample > global.total_clients {
        return Err(format!(
            "test sample {} exceeds total population {}",
            global.total_test_sample, global.total_clients
        ));
    }
    if !(0.0..=1.0).contains(&global.global_down_rate) {
        return Err(format!(
            "global down rate {} outside [0, 1]",
            global.global_down_rate
        ));
    }
    Ok(())
}
