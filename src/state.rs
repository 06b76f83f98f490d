use std::sync::Arc;

use crate::data::filter::{by_equality, selection_options, Selection};
use crate::data::geo::{GeoProjection, GeoProjector};
use crate::data::loader::{LoadedDataset, RowWarning};
use crate::data::model::{Column, Table};

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// The per-session view state, independent of rendering.
///
/// The shell calls [`DashboardState::select`] when the user picks a value;
/// that is the only place filtering and projection are recomputed.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// Loaded dataset, shared with the handle that owns it.
    dataset: Arc<LoadedDataset>,

    projector: GeoProjector,

    /// Column the selector filters on.
    pub column: Column,

    /// Current selector value.
    pub selection: Selection,

    /// Rows passing the current selection (cached).
    pub filtered: Table,

    /// Map points of `filtered` (cached).
    pub projection: GeoProjection,
}

impl DashboardState {
    /// Start with everything selected on the region selector.
    pub fn new(dataset: Arc<LoadedDataset>, projector: GeoProjector) -> Self {
        let filtered = dataset.table.clone();
        let projection = projector.project(&filtered);
        DashboardState {
            dataset,
            projector,
            column: Column::Region,
            selection: Selection::All,
            filtered,
            projection,
        }
    }

    /// The full, unfiltered table.
    pub fn table(&self) -> &Table {
        &self.dataset.table
    }

    pub fn warnings(&self) -> &[RowWarning] {
        &self.dataset.warnings
    }

    /// Values offered by the selector, sentinel first.
    pub fn options(&self) -> Vec<Selection> {
        selection_options(&self.dataset.table, self.column)
    }

    /// Selection-changed callback: filter, then re-project.
    pub fn select(&mut self, selection: Selection) {
        self.filtered = by_equality(&self.dataset.table, self.column, &selection);
        self.projection = self.projector.project(&self.filtered);
        self.selection = selection;
    }
}
