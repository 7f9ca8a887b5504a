use super::data::ReferenceData;
use super::types::{
    EconomicParameters, RoiResult, SegmentSelection, SegmentSummary, ThresholdCurvePoint,
    ThresholdRow,
};

/// Closed-form economics of contacting every customer in a segment.
///
/// `down_rate` is expected in [0, 1] but is deliberately not clamped or
/// validated here; bounds are the caller's responsibility. A zero-cost
/// segment (`clients = 0` or `action_cost = 0`) short-circuits to an ROI of
/// zero rather than dividing by zero.
pub fn calculate_roi(clients: f64, down_rate: f64, params: &EconomicParameters) -> RoiResult {
    let expected_down = clients * down_rate;
    let total_cost = clients * params.action_cost;
    let retained = expected_down * params.effectiveness;
    let value_saved_total = retained * params.value_saved;
    let net_benefit = value_saved_total - total_cost;
    let roi_percent = if total_cost > 0.0 {
        net_benefit / total_cost * 100.0
    } else {
        0.0
    };

    RoiResult {
        clients,
        expected_down,
        total_cost,
        retained,
        value_saved_total,
        net_benefit,
        roi_percent,
    }
}

/// Minimum down-sell rate, in percent, at which the net benefit turns
/// non-negative. `None` when `value_saved * effectiveness` is zero.
pub fn breakeven_rate_percent(params: &EconomicParameters) -> Option<f64> {
    let saved_per_down = params.value_saved * params.effectiveness;
    if saved_per_down == 0.0 {
        return None;
    }
    Some(params.action_cost / saved_per_down * 100.0)
}

/// Resolves a targeting selection against the reference tables. Returns
/// `None` for a selection matching no customers (an empty decile set), which
/// the dashboard treats as "nothing to show" rather than an error.
pub fn resolve_segment(
    data: &ReferenceData,
    selection: &SegmentSelection,
) -> Option<SegmentSummary> {
    match selection {
        SegmentSelection::Deciles(deciles) => {
            let mut client_count = 0u64;
            let mut down_count = 0u64;
            for row in data.deciles() {
                if deciles.contains(&row.decile) {
                    client_count += row.client_count;
                    down_count += row.down_count;
                }
            }
            if client_count == 0 {
                return None;
            }
            Some(SegmentSummary {
                client_count,
                down_rate: down_count as f64 / client_count as f64,
                matched_threshold: None,
            })
        }
        SegmentSelection::Threshold(requested) => {
            let row = closest_threshold_row(data.thresholds(), *requested);
            Some(SegmentSummary {
                client_count: row.client_count,
                down_rate: row.derived_rate(),
                matched_threshold: Some(row.threshold),
            })
        }
        SegmentSelection::Custom {
            client_count,
            down_rate,
        } => Some(SegmentSummary {
            client_count: *client_count,
            down_rate: *down_rate,
            matched_threshold: None,
        }),
    }
}

// Closest row by absolute distance; an exactly equidistant request keeps the
// earlier row in ascending threshold order. No interpolation between rows.
fn closest_threshold_row(rows: &[ThresholdRow], requested: f64) -> &ThresholdRow {
    let mut best = &rows[0];
    for row in &rows[1..] {
        if (row.threshold - requested).abs() < (best.threshold - requested).abs() {
            best = row;
        }
    }
    best
}

/// ROI and targeted volume at every published threshold, for the
/// combination chart.
pub fn threshold_curve(
    data: &ReferenceData,
    params: &EconomicParameters,
) -> Vec<ThresholdCurvePoint> {
    data.thresholds()
        .iter()
        .map(|row| {
            let roi = calculate_roi(row.client_count as f64, row.derived_rate(), params);
            ThresholdCurvePoint {
                threshold: row.threshold,
                targeted_clients: row.client_count,
                roi_percent: roi.roi_percent,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_params() -> EconomicParameters {
        EconomicParameters {
            action_cost: 250.0,
            value_saved: 25_000.0,
            effectiveness: 0.12,
        }
    }

    #[test]
    fn roi_matches_reference_computation_for_decile_one() {
        let result = calculate_roi(17_142.0, 0.9151, &sample_params());

        assert_close(result.expected_down, 17_142.0 * 0.9151, 1e-9);
        assert_close(result.total_cost, 4_285_500.0, 1e-9);
        assert_close(result.retained, 17_142.0 * 0.9151 * 0.12, 1e-9);
        assert_close(
            result.net_benefit,
            result.value_saved_total - result.total_cost,
            1e-9,
        );
        assert_close(result.roi_percent, 998.12, 1e-3);
    }

    #[test]
    fn zero_clients_short_circuits_roi_to_zero() {
        let result = calculate_roi(0.0, 0.5, &sample_params());
        assert_close(result.total_cost, 0.0, 1e-12);
        assert_close(result.roi_percent, 0.0, 1e-12);
    }

    #[test]
    fn zero_action_cost_short_circuits_roi_to_zero() {
        let params = EconomicParameters {
            action_cost: 0.0,
            ..sample_params()
        };
        let result = calculate_roi(1_000.0, 0.5, &params);
        assert_close(result.roi_percent, 0.0, 1e-12);
    }

    #[test]
    fn zero_down_rate_loses_the_full_investment() {
        let result = calculate_roi(100.0, 0.0, &sample_params());
        assert_close(result.net_benefit, -result.total_cost, 1e-9);
        assert_close(result.roi_percent, -100.0, 1e-9);
    }

    #[test]
    fn breakeven_rate_for_default_parameters() {
        let rate = breakeven_rate_percent(&sample_params()).expect("non-zero effectiveness");
        assert_close(rate, 250.0 / 3_000.0 * 100.0, 1e-9);
        assert_close(rate, 8.333333, 1e-4);
    }

    #[test]
    fn breakeven_rate_is_undefined_at_zero_effectiveness() {
        let params = EconomicParameters {
            effectiveness: 0.0,
            ..sample_params()
        };
        assert!(breakeven_rate_percent(&params).is_none());
    }

    #[test]
    fn decile_aggregation_sums_counts_and_derives_rate() {
        let data = ReferenceData::load().expect("valid");
        let segment = resolve_segment(&data, &SegmentSelection::Deciles(vec![1, 2, 3]))
            .expect("non-empty selection");

        assert_eq!(segment.client_count, 51_426);
        assert_close(segment.down_rate, 35_462.0 / 51_426.0, 1e-12);
        assert_close(segment.down_rate, 0.6887, 1e-3);
        assert!(segment.matched_threshold.is_none());
    }

    #[test]
    fn empty_decile_selection_resolves_to_no_segment() {
        let data = ReferenceData::load().expect("valid");
        assert!(resolve_segment(&data, &SegmentSelection::Deciles(Vec::new())).is_none());
    }

    #[test]
    fn unknown_decile_ids_match_nothing() {
        let data = ReferenceData::load().expect("valid");
        assert!(resolve_segment(&data, &SegmentSelection::Deciles(vec![11, 42])).is_none());
    }

    #[test]
    fn duplicate_decile_ids_do_not_double_count() {
        let data = ReferenceData::load().expect("valid");
        let segment = resolve_segment(&data, &SegmentSelection::Deciles(vec![1, 1, 1]))
            .expect("non-empty selection");
        assert_eq!(segment.client_count, 17_142);
    }

    #[test]
    fn threshold_between_rows_resolves_to_the_nearer_one() {
        let data = ReferenceData::load().expect("valid");
        // 0.65 reads as a midpoint, but in f64 it sits marginally closer to 0.7.
        let segment = resolve_segment(&data, &SegmentSelection::Threshold(0.65))
            .expect("threshold mode always resolves");
        assert_eq!(segment.matched_threshold, Some(0.7));
        assert_eq!(segment.client_count, 29_634);
    }

    #[test]
    fn equidistant_threshold_request_keeps_the_first_row() {
        // 0.25 and 0.75 are both exactly 0.25 away from 0.5.
        let rows = [
            ThresholdRow {
                threshold: 0.25,
                client_count: 1_000,
                pct_clients: 50.0,
                down_count: 500,
            },
            ThresholdRow {
                threshold: 0.75,
                client_count: 100,
                pct_clients: 5.0,
                down_count: 80,
            },
        ];
        let row = closest_threshold_row(&rows, 0.5);
        assert_close(row.threshold, 0.25, 1e-12);
    }

    #[test]
    fn threshold_resolution_snaps_to_nearest_row() {
        let data = ReferenceData::load().expect("valid");
        let segment = resolve_segment(&data, &SegmentSelection::Threshold(0.41))
            .expect("threshold mode always resolves");
        assert_eq!(segment.matched_threshold, Some(0.4));

        let segment = resolve_segment(&data, &SegmentSelection::Threshold(1.0))
            .expect("threshold mode always resolves");
        assert_eq!(segment.matched_threshold, Some(0.7));
    }

    #[test]
    fn custom_selection_bypasses_the_tables() {
        let data = ReferenceData::load().expect("valid");
        let segment = resolve_segment(
            &data,
            &SegmentSelection::Custom {
                client_count: 30_000,
                down_rate: 0.7,
            },
        )
        .expect("custom mode always resolves");
        assert_eq!(segment.client_count, 30_000);
        assert_close(segment.down_rate, 0.7, 1e-12);
    }

    #[test]
    fn threshold_curve_covers_every_row() {
        let data = ReferenceData::load().expect("valid");
        let curve = threshold_curve(&data, &sample_params());
        assert_eq!(curve.len(), data.thresholds().len());
        for (point, row) in curve.iter().zip(data.thresholds()) {
            assert_eq!(point.targeted_clients, row.client_count);
            assert!(point.roi_percent.is_finite());
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_roi_outputs_are_finite_and_consistent(
            clients in 0u32..200_000,
            rate_bp in 0u32..=10_000,
            action_cost in 1u32..5_000,
            value_saved in 1u32..100_000,
            effectiveness_bp in 1u32..=10_000
        ) {
            let params = EconomicParameters {
                action_cost: action_cost as f64,
                value_saved: value_saved as f64,
                effectiveness: effectiveness_bp as f64 / 10_000.0,
            };
            let result = calculate_roi(clients as f64, rate_bp as f64 / 10_000.0, &params);

            prop_assert!(result.expected_down.is_finite());
            prop_assert!(result.roi_percent.is_finite());
            prop_assert!(result.expected_down <= result.clients + 1e-9);
            prop_assert!(
                (result.net_benefit - (result.value_saved_total - result.total_cost)).abs() <= 1e-6
            );
            if result.total_cost > 0.0 {
                prop_assert!((result.roi_percent > 0.0) == (result.net_benefit > 0.0));
            } else {
                prop_assert!(result.roi_percent == 0.0);
            }
        }

        #[test]
        fn prop_closest_threshold_minimises_distance(requested_bp in 0u32..=10_000) {
            let requested = requested_bp as f64 / 10_000.0;
            let data = ReferenceData::load().expect("valid");
            let segment = resolve_segment(&data, &SegmentSelection::Threshold(requested))
                .expect("threshold mode always resolves");
            let matched = segment.matched_threshold.expect("threshold mode sets the match");

            let best_distance = data
                .thresholds()
                .iter()
                .map(|row| (row.threshold - requested).abs())
                .fold(f64::INFINITY, f64::min);
            prop_assert!((matched - requested).abs() <= best_distance + 1e-12);
        }

        #[test]
        fn prop_threshold_curve_points_stay_finite(
            action_cost in 0u32..5_000,
            value_saved in 0u32..100_000,
            effectiveness_bp in 0u32..=10_000
        ) {
            let data = ReferenceData::load().expect("valid");
            let params = EconomicParameters {
                action_cost: action_cost as f64,
                value_saved: value_saved as f64,
                effectiveness: effectiveness_bp as f64 / 10_000.0,
            };

            let curve = threshold_curve(&data, &params);
            prop_assert!(curve.len() == data.thresholds().len());
            for point in &curve {
                prop_assert!(point.threshold.is_finite());
                prop_assert!(point.roi_percent.is_finite());
            }
        }

        #[test]
        fn prop_decile_aggregate_rate_stays_within_member_bounds(
            selection in proptest::collection::vec(1u32..=10, 1..10)
        ) {
            let data = ReferenceData::load().expect("valid");
            let segment = resolve_segment(&data, &SegmentSelection::Deciles(selection.clone()))
                .expect("selection contains at least one valid decile");

            let member_rates: Vec<f64> = data
                .deciles()
                .iter()
                .filter(|row| selection.contains(&row.decile))
                .map(|row| row.derived_rate())
                .collect();
            let min = member_rates.iter().copied().fold(f64::INFINITY, f64::min);
            let max = member_rates.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(segment.down_rate >= min - 1e-12);
            prop_assert!(segment.down_rate <= max + 1e-12);
        }
    }
}
