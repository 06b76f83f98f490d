use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray, UInt32Array, UInt8Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use serde::Serialize;

use salud_dash::{
    centroid, count_by, Column, DashboardConfig, DashboardState, DescriptiveStats, GeoPoint,
    GroupSummary, Overview, Record, RowWarning, Table,
};

const BAR_WIDTH: usize = 40;

// ---------------------------------------------------------------------------
// Text report
// ---------------------------------------------------------------------------

/// Render the three dashboard pages as plain text.
pub fn render(state: &DashboardState, config: &DashboardConfig) -> Result<String> {
    let mut out = String::new();
    write_report(&mut out, state, config)?;
    Ok(out)
}

fn write_report(out: &mut String, state: &DashboardState, config: &DashboardConfig) -> Result<()> {
    let table = state.table();

    // ---- Context ----
    writeln!(out, "== Contexto ==")?;
    write_overview(out, &Overview::of(table))?;
    for warning in state.warnings() {
        writeln!(out, "  skipped {warning}")?;
    }
    writeln!(out)?;
    writeln!(out, "-- Vista previa --")?;
    let preview = preview_batch(&table.head(config.view.preview_rows), config)?;
    writeln!(out, "{}", pretty_format_batches(&[preview])?)?;
    writeln!(out)?;
    writeln!(out, "-- Descripción estadística --")?;
    let stats = stats_batch(&table.describe_all(), config)?;
    writeln!(out, "{}", pretty_format_batches(&[stats])?)?;

    // ---- Summaries ----
    writeln!(out)?;
    writeln!(out, "== Análisis descriptivo ==")?;
    writeln!(out, "-- Pacientes por {} --", config.columns.region)?;
    write_bars(out, &count_by(table, Column::Region))?;
    writeln!(out, "-- Distribución por {} --", config.columns.gender)?;
    for share in count_by(table, Column::Gender).shares() {
        writeln!(out, "  {:<24} {:>5.1}%", share.value.to_string(), share.fraction * 100.0)?;
    }

    // ---- Map ----
    writeln!(out)?;
    writeln!(out, "== Georreferenciación ==")?;
    let (lat, lon) = map_center(&state.projection.points, config);
    writeln!(
        out,
        "{}: {} ({} rows, {} points, {} off the map)",
        config.columns.region,
        state.selection,
        state.filtered.len(),
        state.projection.points.len(),
        state.projection.skipped
    )?;
    writeln!(out, "centre: {lat:.4}, {lon:.4}")?;
    for point in &state.projection.points {
        let labels: Vec<String> = point
            .label_fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        writeln!(
            out,
            "  {:>9.4} {:>9.4}  {}",
            point.latitude,
            point.longitude,
            labels.join(" ")
        )?;
    }
    Ok(())
}

fn write_overview(out: &mut String, overview: &Overview) -> std::fmt::Result {
    writeln!(
        out,
        "{} patients across {} regions",
        overview.total_records, overview.regions
    )?;
    if let Some(top) = &overview.top_region {
        writeln!(
            out,
            "most patients: {} ({}, {:.1}%)",
            top.value,
            top.count,
            top.fraction * 100.0
        )?;
    }
    let genders: Vec<String> = overview
        .gender_shares
        .iter()
        .map(|s| format!("{} {:.1}%", s.value, s.fraction * 100.0))
        .collect();
    if !genders.is_empty() {
        writeln!(out, "gender: {}", genders.join(", "))?;
    }
    writeln!(
        out,
        "mean age: {}, mean visits: {}",
        num(overview.mean_age),
        num(overview.mean_visits)
    )
}

/// The preview rows as an Arrow batch with the source headers.
fn preview_batch(head: &Table, config: &DashboardConfig) -> Result<RecordBatch> {
    let header = |c: Column| config.columns.header(c).to_string();
    let schema = Arc::new(Schema::new(vec![
        Field::new(header(Column::Region), DataType::Utf8, true),
        Field::new(header(Column::Gender), DataType::Utf8, true),
        Field::new(header(Column::Age), DataType::UInt8, true),
        Field::new(header(Column::Visits), DataType::UInt32, true),
        Field::new(header(Column::Latitude), DataType::Float64, true),
        Field::new(header(Column::Longitude), DataType::Float64, true),
    ]));
    let rows = head.rows();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(rows.iter().map(|r| r.region.as_deref()).collect::<StringArray>()),
        Arc::new(rows.iter().map(|r| r.gender.as_deref()).collect::<StringArray>()),
        Arc::new(rows.iter().map(|r| r.age).collect::<UInt8Array>()),
        Arc::new(rows.iter().map(|r| r.visits).collect::<UInt32Array>()),
        Arc::new(rows.iter().map(|r| r.latitude).collect::<Float64Array>()),
        Arc::new(rows.iter().map(|r| r.longitude).collect::<Float64Array>()),
    ];
    RecordBatch::try_new(schema, columns).context("building preview table")
}

/// `describe()`-style table: one row per statistic, one column per numeric
/// column. NaN-marked statistics show as empty cells.
fn stats_batch(stats: &[(Column, DescriptiveStats)], config: &DashboardConfig) -> Result<RecordBatch> {
    const LABELS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

    let mut fields = vec![Field::new("", DataType::Utf8, false)];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from(LABELS.to_vec()))];
    for (column, s) in stats {
        fields.push(Field::new(config.columns.header(*column), DataType::Float64, true));
        let values = [
            s.count as f64,
            s.mean,
            s.std,
            s.min,
            s.p25,
            s.p50,
            s.p75,
            s.max,
        ];
        columns.push(Arc::new(
            values
                .into_iter()
                .map(|v| (!v.is_nan()).then_some(v))
                .collect::<Float64Array>(),
        ));
    }
    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).context("building statistics table")
}

fn write_bars(out: &mut String, summary: &GroupSummary) -> std::fmt::Result {
    let max = summary.iter().map(|(_, n)| *n).max().unwrap_or(0);
    for (value, count) in summary {
        let width = if max == 0 { 0 } else { count * BAR_WIDTH / max };
        writeln!(
            out,
            "  {:<24} {:>6} {}",
            value.to_string(),
            count,
            "#".repeat(width.max(1))
        )?;
    }
    Ok(())
}

fn map_center(points: &[GeoPoint], config: &DashboardConfig) -> (f64, f64) {
    let [lat, lon] = config.geo.center;
    centroid(points).unwrap_or((lat, lon))
}

fn num(v: f64) -> String {
    if v.is_nan() {
        "-".to_string()
    } else {
        format!("{v:.2}")
    }
}

// ---------------------------------------------------------------------------
// JSON report
// ---------------------------------------------------------------------------

/// Everything the text report shows, as one serializable document.
#[derive(Serialize)]
pub struct JsonReport<'a> {
    source: &'a Path,
    overview: Overview,
    warnings: &'a [RowWarning],
    preview: Vec<Record>,
    statistics: Vec<(Column, DescriptiveStats)>,
    regions: GroupSummary,
    genders: GroupSummary,
    selection: String,
    center: (f64, f64),
    points: &'a [GeoPoint],
    skipped: usize,
}

impl<'a> JsonReport<'a> {
    pub fn new(state: &'a DashboardState, config: &'a DashboardConfig) -> Self {
        let table = state.table();
        JsonReport {
            source: &config.data.path,
            overview: Overview::of(table),
            warnings: state.warnings(),
            preview: table.head(config.view.preview_rows).rows().to_vec(),
            statistics: table.describe_all(),
            regions: count_by(table, Column::Region),
            genders: count_by(table, Column::Gender),
            selection: state.selection.to_string(),
            center: map_center(&state.projection.points, config),
            points: &state.projection.points,
            skipped: state.projection.skipped,
        }
    }
}
