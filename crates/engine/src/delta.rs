//! Delta engine: per-row consumption from cumulative totalizer readings.
//!
//! Always a full recompute from raw readings; deltas are never derived from
//! other deltas. Row order is chronological order.

use serde::Serialize;
use tracing::warn;

use crate::model::{CarryIn, Row, Totalizer};

/// First differences of one totalizer column.
///
/// `deltas[0]` is `readings[0] - baseline`, or `None` without a baseline
/// (see [`CarryIn::baseline`]). Decreases come out negative; nothing is
/// clamped. Non-finite readings count as 0.
pub fn column_deltas(readings: &[f64], baseline: Option<f64>) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(readings.len());
    let mut previous = baseline;

    for &raw in readings {
        let current = finite_or_zero(raw);
        out.push(previous.map(|p| current - p));
        previous = Some(current);
    }
    out
}

/// Populate every row's deltas. Pure: the input is not modified.
pub fn compute(rows: &[Row], carry_in: &CarryIn) -> Vec<Row> {
    let mut out = rows.to_vec();
    recompute_in_place(&mut out, carry_in);
    out
}

/// [`compute`] over an owned table.
pub fn recompute_in_place(rows: &mut [Row], carry_in: &CarryIn) {
    for totalizer in Totalizer::ALL {
        let readings: Vec<f64> = rows.iter().map(|r| r.readings.totalizer(totalizer)).collect();
        let deltas = column_deltas(&readings, carry_in.baseline(totalizer));
        for (row, delta) in rows.iter_mut().zip(deltas) {
            row.deltas.set(totalizer, delta);
        }
    }
}

/// A negative consumption value (meter reset, correction or misread).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaAnomaly {
    pub row: usize,
    pub hora: String,
    pub totalizer: Totalizer,
    pub delta: f64,
}

/// Every negative delta in the table, for the reviewer's attention.
pub fn negative_deltas(rows: &[Row]) -> Vec<DeltaAnomaly> {
    let mut anomalies = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        for totalizer in Totalizer::ALL {
            if let Some(delta) = row.deltas.get(totalizer) {
                if delta < 0.0 {
                    warn!(row = index + 1, hora = %row.hora, %totalizer, delta, "totalizer went backwards");
                    anomalies.push(DeltaAnomaly { row: index, hora: row.hora.clone(), totalizer, delta });
                }
            }
        }
    }
    anomalies
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Column;
    use proptest::prelude::*;

    fn steam_rows(readings: &[f64]) -> Vec<Row> {
        readings
            .iter()
            .enumerate()
            .map(|(i, v)| Row::new(format!("{:02}:00", 7 + i)).with_reading(Column::SteamTotal, *v))
            .collect()
    }

    fn steam_deltas(rows: &[Row]) -> Vec<Option<f64>> {
        rows.iter().map(|r| r.deltas.steam).collect()
    }

    #[test]
    fn carry_in_sets_first_delta() {
        let carry = CarryIn { steam: 80.0, ..Default::default() };
        let rows = compute(&steam_rows(&[100.0, 150.0]), &carry);
        assert_eq!(steam_deltas(&rows), vec![Some(20.0), Some(50.0)]);
    }

    #[test]
    fn zero_carry_in_leaves_first_delta_undefined() {
        let rows = compute(&steam_rows(&[100.0, 150.0]), &CarryIn::default());
        assert_eq!(steam_deltas(&rows), vec![None, Some(50.0)]);
    }

    #[test]
    fn decrease_is_negative_not_clamped() {
        let rows = compute(&steam_rows(&[100.0, 90.0]), &CarryIn::default());
        assert_eq!(steam_deltas(&rows), vec![None, Some(-10.0)]);

        let anomalies = negative_deltas(&rows);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].row, 1);
        assert_eq!(anomalies[0].hora, "08:00");
        assert_eq!(anomalies[0].totalizer, Totalizer::Steam);
        assert_eq!(anomalies[0].delta, -10.0);
    }

    #[test]
    fn carry_in_only_affects_first_row() {
        let with = compute(&steam_rows(&[100.0, 150.0, 175.0]), &CarryIn { steam: 99.0, ..Default::default() });
        let without = compute(&steam_rows(&[100.0, 150.0, 175.0]), &CarryIn::default());
        assert_eq!(steam_deltas(&with)[1..], steam_deltas(&without)[1..]);
    }

    #[test]
    fn carry_in_larger_than_first_reading_goes_negative() {
        let rows = compute(&steam_rows(&[100.0]), &CarryIn { steam: 120.0, ..Default::default() });
        assert_eq!(steam_deltas(&rows), vec![Some(-20.0)]);
    }

    #[test]
    fn columns_are_independent() {
        let rows = vec![
            Row::new("07:00")
                .with_reading(Column::WaterTotal, 10.0)
                .with_reading(Column::BagasseInTotal, 5.0)
                .with_reading(Column::BagasseOutTotal, 1.0),
            Row::new("08:00")
                .with_reading(Column::WaterTotal, 25.0)
                .with_reading(Column::BagasseInTotal, 9.0)
                .with_reading(Column::BagasseOutTotal, 1.5),
        ];
        let carry = CarryIn { water: 4.0, ..Default::default() };
        let out = compute(&rows, &carry);
        assert_eq!(out[0].deltas.water, Some(6.0));
        assert_eq!(out[1].deltas.water, Some(15.0));
        assert_eq!(out[0].deltas.bagasse_in, None);
        assert_eq!(out[1].deltas.bagasse_in, Some(4.0));
        assert_eq!(out[1].deltas.bagasse_out, Some(0.5));
        assert_eq!(out[0].deltas.steam, None);
        assert_eq!(out[1].deltas.steam, Some(0.0));
    }

    #[test]
    fn stale_deltas_are_overwritten() {
        let mut rows = steam_rows(&[100.0, 150.0]);
        rows[0].deltas.steam = Some(9999.0);
        rows[1].deltas.water = Some(-1.0);
        let out = compute(&rows, &CarryIn::default());
        assert_eq!(out[0].deltas.steam, None);
        assert_eq!(out[1].deltas.water, Some(0.0));
    }

    #[test]
    fn non_finite_readings_count_as_zero() {
        assert_eq!(column_deltas(&[f64::NAN, 5.0], None), vec![None, Some(5.0)]);
        assert_eq!(column_deltas(&[10.0, f64::INFINITY], None), vec![None, Some(-10.0)]);
    }

    #[test]
    fn unusable_carry_in_is_no_baseline() {
        for carry in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let out = compute(&steam_rows(&[10.0]), &CarryIn { steam: carry, ..Default::default() });
            assert_eq!(out[0].deltas.steam, None, "carry-in {carry}");
        }
        let out = compute(&steam_rows(&[10.0]), &CarryIn { steam: 4.0, ..Default::default() });
        assert_eq!(out[0].deltas.steam, Some(6.0));
    }

    #[test]
    fn empty_table() {
        assert!(compute(&[], &CarryIn::default()).is_empty());
        assert!(column_deltas(&[], Some(50.0)).is_empty());
    }

    proptest! {
        #[test]
        fn deltas_are_exact_first_differences(
            readings in prop::collection::vec(-1.0e7f64..1.0e7, 1..40),
            carry in prop_oneof![Just(0.0f64), 0.001f64..1.0e7],
        ) {
            let deltas = column_deltas(&readings, (carry > 0.0).then_some(carry));
            prop_assert_eq!(deltas.len(), readings.len());
            for i in 1..readings.len() {
                prop_assert_eq!(deltas[i], Some(readings[i] - readings[i - 1]));
            }
            if carry > 0.0 {
                prop_assert_eq!(deltas[0], Some(readings[0] - carry));
            } else {
                prop_assert_eq!(deltas[0], None);
            }
        }

        #[test]
        fn recompute_is_idempotent(
            readings in prop::collection::vec(0.0f64..1.0e6, 0..30),
            carry in 0.0f64..1.0e6,
        ) {
            let carry = CarryIn { steam: carry, water: carry, bagasse_in: 0.0, bagasse_out: carry };
            let once = compute(&steam_rows(&readings), &carry);
            let twice = compute(&once, &carry);
            prop_assert_eq!(once, twice);
        }
    }
}
