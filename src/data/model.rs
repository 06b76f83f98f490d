use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Column – the fixed schema of a patient record
// ---------------------------------------------------------------------------

/// The six columns every patient source must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Region,
    Gender,
    Age,
    Visits,
    Latitude,
    Longitude,
}

/// How a column's cells are typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Categorical,
    Integer,
    Float,
}

impl Column {
    /// Every column, in canonical order.
    pub const ALL: [Column; 6] = [
        Column::Region,
        Column::Gender,
        Column::Age,
        Column::Visits,
        Column::Latitude,
        Column::Longitude,
    ];

    /// The columns `describe` accepts.
    pub const NUMERIC: [Column; 4] = [
        Column::Age,
        Column::Visits,
        Column::Latitude,
        Column::Longitude,
    ];

    pub fn kind(self) -> ColumnKind {
        match self {
            Column::Region | Column::Gender => ColumnKind::Categorical,
            Column::Age | Column::Visits => ColumnKind::Integer,
            Column::Latitude | Column::Longitude => ColumnKind::Float,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.kind() != ColumnKind::Categorical
    }

    /// Position of the column inside [`Column::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Header used by the source files when no override is configured.
    pub fn default_header(self) -> &'static str {
        match self {
            Column::Region => "Departamento",
            Column::Gender => "Genero",
            Column::Age => "Edad",
            Column::Visits => "Visitas",
            Column::Latitude => "Latitud",
            Column::Longitude => "Longitud",
        }
    }

    /// Short snake_case name, as used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Column::Region => "region",
            Column::Gender => "gender",
            Column::Age => "age",
            Column::Visits => "visits",
            Column::Latitude => "latitude",
            Column::Longitude => "longitude",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
///
/// Totally ordered and hashable (floats by `total_cmp` / bit pattern) so it
/// can key group summaries and act as a filter value.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Integer(_) => 1,
                Float(_) => 2,
                Text(_) => 3,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ---------------------------------------------------------------------------
// Record – one patient (one row of the source)
// ---------------------------------------------------------------------------

/// A single patient entry, validated against the fixed schema at load time.
///
/// `None` marks an empty cell in the source.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Record {
    pub region: Option<String>,
    pub gender: Option<String>,
    /// Age in years, 0–99.
    pub age: Option<u8>,
    pub visits: Option<u32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Record {
    /// The cell for `column` as a dynamically typed value.
    pub fn get(&self, column: Column) -> Value {
        match column {
            Column::Region => self.region.as_deref().into(),
            Column::Gender => self.gender.as_deref().into(),
            Column::Age => self.age.map(i64::from).into(),
            Column::Visits => self.visits.map(i64::from).into(),
            Column::Latitude => self.latitude.into(),
            Column::Longitude => self.longitude.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – the loaded, immutable collection of records
// ---------------------------------------------------------------------------

/// An ordered collection of records. Never mutated after construction;
/// filters produce new tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    rows: Vec<Record>,
}

impl Table {
    pub fn from_records(rows: Vec<Record>) -> Self {
        Table { rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.rows.iter()
    }

    /// The first `n` rows, for preview display.
    pub fn head(&self, n: usize) -> Table {
        Table::from_records(self.rows.iter().take(n).cloned().collect())
    }

    /// Every cell of `column`, in row order.
    pub fn column(&self, column: Column) -> Vec<Value> {
        self.rows.iter().map(|r| r.get(column)).collect()
    }

    /// Distinct non-null values of `column` in first-seen order.
    pub fn unique(&self, column: Column) -> Vec<Value> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|r| r.get(column))
            .filter(|v| !v.is_null() && seen.insert(v.clone()))
            .collect()
    }

    /// Keep the rows matching `predicate`, preserving order.
    pub(crate) fn select<F>(&self, mut predicate: F) -> Table
    where
        F: FnMut(&Record) -> bool,
    {
        Table::from_records(self.rows.iter().filter(|r| predicate(r)).cloned().collect())
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl FromIterator<Record> for Table {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Table::from_records(iter.into_iter().collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a record from the fields the tests care about.
    pub(crate) fn patient(region: &str, gender: &str, age: u8, lat: f64, lon: f64) -> Record {
        Record {
            region: Some(region.to_string()),
            gender: Some(gender.to_string()),
            age: Some(age),
            visits: Some(1),
            latitude: Some(lat),
            longitude: Some(lon),
        }
    }

    #[test]
    fn record_get_maps_fields_to_values() {
        let r = patient("Antioquia", "Femenino", 34, 6.2, -75.5);
        assert_eq!(r.get(Column::Region), Value::from("Antioquia"));
        assert_eq!(r.get(Column::Age), Value::Integer(34));
        assert_eq!(r.get(Column::Visits), Value::Integer(1));
        assert_eq!(r.get(Column::Latitude), Value::Float(6.2));

        let empty = Record::default();
        assert!(empty.get(Column::Gender).is_null());
        assert!(empty.get(Column::Longitude).is_null());
    }

    #[test]
    fn value_equality_is_consistent_for_nan() {
        let nan = Value::Float(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_ne!(Value::Integer(4), Value::Float(4.0));
        assert!(Value::Null < Value::Integer(0));
        assert!(Value::Float(1.0) < Value::from("a"));
    }

    #[test]
    fn unique_keeps_first_seen_order_and_skips_nulls() {
        let mut blank = patient("x", "M", 1, 0.0, 0.0);
        blank.region = None;
        let table = Table::from_records(vec![
            patient("Meta", "M", 1, 0.0, 0.0),
            blank,
            patient("Huila", "F", 2, 0.0, 0.0),
            patient("Meta", "F", 3, 0.0, 0.0),
        ]);
        assert_eq!(
            table.unique(Column::Region),
            vec![Value::from("Meta"), Value::from("Huila")]
        );
    }

    #[test]
    fn head_takes_prefix() {
        let table: Table = (0..10u8).map(|i| patient("A", "M", i, 0.0, 0.0)).collect();
        let head = table.head(3);
        assert_eq!(head.len(), 3);
        assert_eq!(head.rows()[2].age, Some(2));
        assert_eq!(table.head(50).len(), 10);
    }
}
