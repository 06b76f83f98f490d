use std::fmt;

use log::debug;

use super::model::{Column, Table, Value};

// ---------------------------------------------------------------------------
// Selection: which value a selector currently points at
// ---------------------------------------------------------------------------

/// What a single-column selector has chosen.
///
/// [`Selection::All`] is the "no filter" sentinel. It is a separate variant,
/// never compared against data, so a region literally named "Todos" is
/// still filterable as `Only("Todos")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Selection {
    #[default]
    All,
    Only(Value),
}

impl Selection {
    /// Label shown for [`Selection::All`].
    pub const ALL_LABEL: &'static str = "Todos";

    pub fn only(value: impl Into<Value>) -> Self {
        Selection::Only(value.into())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    /// Whether a cell passes this selection.
    ///
    /// Null never equals anything, itself included, so `Only(Value::Null)`
    /// selects no rows.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(Value::Null) => false,
            Selection::Only(wanted) => wanted == value,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str(Self::ALL_LABEL),
            Selection::Only(v) => write!(f, "{v}"),
        }
    }
}

/// Options for a selector over `column`: the sentinel first, then every
/// distinct value in first-seen order.
pub fn selection_options(table: &Table, column: Column) -> Vec<Selection> {
    std::iter::once(Selection::All)
        .chain(table.unique(column).into_iter().map(Selection::Only))
        .collect()
}

/// Rows whose `column` equals the selected value, in original order.
///
/// `Selection::All` returns the whole table; a value nobody has returns an
/// empty table.
pub fn by_equality(table: &Table, column: Column, selection: &Selection) -> Table {
    let filtered = match selection {
        Selection::All => table.clone(),
        Selection::Only(_) => table.select(|r| selection.matches(&r.get(column))),
    };
    debug!(
        "filter {column} = {selection}: {} of {} rows",
        filtered.len(),
        table.len()
    );
    filtered
}
