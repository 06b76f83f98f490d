use std::collections::HashMap;

use serde::Serialize;

use super::model::{Column, Table, Value};
use crate::error::AggregateError;

// ---------------------------------------------------------------------------
// GroupSummary – value counts of one column
// ---------------------------------------------------------------------------

/// Counts of rows per distinct value, largest first. Equal counts keep the
/// order in which the values first appear in the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub column: Column,
    entries: Vec<(Value, usize)>,
}

/// One entry of a summary together with its fraction of the total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub value: Value,
    pub count: usize,
    pub fraction: f64,
}

impl GroupSummary {
    pub fn entries(&self) -> &[(Value, usize)] {
        &self.entries
    }

    pub fn get(&self, value: &Value) -> Option<usize> {
        self.entries
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, n)| *n)
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts (non-null cells only).
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    /// Entries with their share of the total, for percentage labels.
    pub fn shares(&self) -> Vec<Share> {
        let total = self.total();
        self.entries
            .iter()
            .map(|(value, count)| Share {
                value: value.clone(),
                count: *count,
                fraction: *count as f64 / total as f64,
            })
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Value, usize)> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a GroupSummary {
    type Item = &'a (Value, usize);
    type IntoIter = std::slice::Iter<'a, (Value, usize)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Count rows per exact value of `column`. Null cells are not counted.
pub fn count_by(table: &Table, column: Column) -> GroupSummary {
    let mut entries: Vec<(Value, usize)> = Vec::new();
    let mut slots: HashMap<Value, usize> = HashMap::new();

    for record in table {
        let value = record.get(column);
        if value.is_null() {
            continue;
        }
        match slots.get(&value) {
            Some(&slot) => entries[slot].1 += 1,
            None => {
                slots.insert(value.clone(), entries.len());
                entries.push((value, 1));
            }
        }
    }

    // Stable sort: ties stay in first-seen order.
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    GroupSummary { column, entries }
}

// ---------------------------------------------------------------------------
// DescriptiveStats – count / mean / std / quartiles
// ---------------------------------------------------------------------------

/// Summary statistics of a numeric column. With `count == 0` every other
/// field is NaN.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator); NaN below two values.
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

/// Bitwise equality, so two NaN-marked results compare equal.
impl PartialEq for DescriptiveStats {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count
            && self
                .fields()
                .iter()
                .zip(other.fields())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl DescriptiveStats {
    /// Statistics of nothing.
    pub fn empty() -> Self {
        DescriptiveStats {
            count: 0,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            p25: f64::NAN,
            p50: f64::NAN,
            p75: f64::NAN,
            max: f64::NAN,
        }
    }

    /// Compute over arbitrary values; NaNs are treated as missing.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut sorted: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return Self::empty();
        }
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let std = if n < 2 {
            f64::NAN
        } else {
            let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        };

        DescriptiveStats {
            count: n,
            mean,
            std,
            min: sorted[0],
            p25: quantile(&sorted, 0.25),
            p50: quantile(&sorted, 0.50),
            p75: quantile(&sorted, 0.75),
            max: sorted[n - 1],
        }
    }

    fn fields(&self) -> [f64; 7] {
        [
            self.mean, self.std, self.min, self.p25, self.p50, self.p75, self.max,
        ]
    }
}

/// Linear interpolation between order statistics at rank `(n - 1) * q`.
///
/// Interpolates from the nearer neighbour, as numpy does, so results match
/// pandas' `describe` to the bit for well-conditioned inputs.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let rank = (sorted.len() - 1) as f64 * q;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let (a, b) = (sorted[lo], sorted[hi]);
    let t = rank - lo as f64;
    if a == b {
        return a;
    }
    let diff = b - a;
    if t >= 0.5 {
        b - diff * (1.0 - t)
    } else {
        a + diff * t
    }
}

/// Descriptive statistics of a numeric column.
pub fn describe(table: &Table, column: Column) -> Result<DescriptiveStats, AggregateError> {
    if !column.is_numeric() {
        return Err(AggregateError::NotNumeric(column));
    }
    Ok(numeric_stats(table, column))
}

fn numeric_stats(table: &Table, column: Column) -> DescriptiveStats {
    DescriptiveStats::from_values(table.iter().filter_map(|r| r.get(column).as_f64()))
}

impl Table {
    /// Statistics for every numeric column, in schema order.
    pub fn describe_all(&self) -> Vec<(Column, DescriptiveStats)> {
        Column::NUMERIC
            .iter()
            .map(|&c| (c, numeric_stats(self, c)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Overview – narrative figures computed from the live table
// ---------------------------------------------------------------------------

/// The headline numbers of the context page, always derived from the
/// table actually loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_records: usize,
    pub regions: usize,
    pub top_region: Option<Share>,
    pub gender_shares: Vec<Share>,
    pub mean_age: f64,
    pub mean_visits: f64,
}

impl Overview {
    pub fn of(table: &Table) -> Self {
        let regions = count_by(table, Column::Region);
        Overview {
            total_records: table.len(),
            regions: regions.len(),
            top_region: regions.shares().into_iter().next(),
            gender_shares: count_by(table, Column::Gender).shares(),
            mean_age: numeric_stats(table, Column::Age).mean,
            mean_visits: numeric_stats(table, Column::Visits).mean,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::patient;
    use crate::data::model::Record;

    fn sample() -> Table {
        Table::from_records(vec![
            patient("A", "F", 30, 4.0, -74.0),
            patient("B", "M", 40, 4.1, -74.2),
            patient("A", "F", 50, 999.0, -74.3),
        ])
    }

    #[test]
    fn count_by_region() {
        let summary = count_by(&sample(), Column::Region);
        assert_eq!(
            summary.entries(),
            &[(Value::from("A"), 2), (Value::from("B"), 1)]
        );
        assert_eq!(summary.total(), 3);
    }

    #[test]
    fn counts_sum_to_table_length_without_nulls() {
        let table = sample();
        for column in Column::ALL {
            assert_eq!(count_by(&table, column).total(), table.len(), "{column}");
        }
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let table = Table::from_records(vec![
            patient("Meta", "M", 1, 0.0, 0.0),
            patient("Huila", "M", 1, 0.0, 0.0),
            patient("Cauca", "M", 1, 0.0, 0.0),
            patient("Huila", "M", 1, 0.0, 0.0),
            patient("Meta", "M", 1, 0.0, 0.0),
        ]);
        let order: Vec<_> = count_by(&table, Column::Region)
            .iter()
            .map(|(v, _)| v.to_string())
            .collect();
        assert_eq!(order, ["Meta", "Huila", "Cauca"]);
    }

    #[test]
    fn nulls_are_not_counted() {
        let mut table = sample().rows().to_vec();
        table.push(Record::default());
        let summary = count_by(&Table::from_records(table), Column::Region);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.get(&Value::Null), None);
    }

    #[test]
    fn shares_are_fractions_of_total() {
        let shares = count_by(&sample(), Column::Gender).shares();
        assert_eq!(shares[0].value, Value::from("F"));
        assert!((shares[0].fraction - 2.0 / 3.0).abs() < 1e-12);
        assert!((shares.iter().map(|s| s.fraction).sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn describe_matches_hand_computed_values() {
        let stats = describe(&sample(), Column::Age).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean, 40.0);
        assert_eq!(stats.std, 10.0);
        assert_eq!(stats.min, 30.0);
        assert_eq!(stats.p25, 35.0);
        assert_eq!(stats.p50, 40.0);
        assert_eq!(stats.p75, 45.0);
        assert_eq!(stats.max, 50.0);
    }

    #[test]
    fn quartiles_interpolate_linearly() {
        let stats = DescriptiveStats::from_values([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.p25, 1.75);
        assert_eq!(stats.p50, 2.5);
        assert_eq!(stats.p75, 3.25);
    }

    #[test]
    fn describe_is_idempotent() {
        let table = sample();
        for column in Column::NUMERIC {
            assert_eq!(describe(&table, column), describe(&table, column));
        }
    }

    #[test]
    fn describe_of_empty_table_has_zero_count() {
        let stats = describe(&Table::default(), Column::Age).unwrap();
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_nan());
        assert!(stats.p50.is_nan());
        assert_eq!(stats, DescriptiveStats::empty());
    }

    #[test]
    fn single_value_has_nan_std() {
        let stats = DescriptiveStats::from_values([7.0]);
        assert_eq!(stats.count, 1);
        assert!(stats.std.is_nan());
        assert_eq!(stats.p25, 7.0);
        assert_eq!(stats.p75, 7.0);
    }

    #[test]
    fn describe_rejects_categorical_columns() {
        assert_eq!(
            describe(&sample(), Column::Region),
            Err(AggregateError::NotNumeric(Column::Region))
        );
    }

    #[test]
    fn describe_all_covers_numeric_columns() {
        let all = sample().describe_all();
        let columns: Vec<_> = all.iter().map(|(c, _)| *c).collect();
        assert_eq!(columns, Column::NUMERIC);
        assert_eq!(all[0].1.count, 3);
    }

    #[test]
    fn overview_is_computed_from_the_table() {
        let overview = Overview::of(&sample());
        assert_eq!(overview.total_records, 3);
        assert_eq!(overview.regions, 2);
        let top = overview.top_region.unwrap();
        assert_eq!(top.value, Value::from("A"));
        assert_eq!(top.count, 2);
        assert_eq!(overview.mean_age, 40.0);
        assert_eq!(overview.gender_shares.len(), 2);

        let empty = Overview::of(&Table::default());
        assert_eq!(empty.total_records, 0);
        assert!(empty.top_region.is_none());
        assert!(empty.mean_age.is_nan());
    }
}
