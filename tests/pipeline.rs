use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, DictionaryArray, Float32Array, Float64Array, Int32Array, StringArray,
    UInt64Array,
};
use arrow::datatypes::{DataType, Field, Int32Type, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use salud_dash::{
    by_equality, count_by, describe, load, load_with, project, Column, ColumnNames,
    DashboardConfig, DatasetHandle, LoadError, Selection, Value,
};
use tempfile::TempDir;

const HEADER: &str = "Departamento,Genero,Edad,Visitas,Latitud,Longitud\n";

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn three_patients(dir: &TempDir) -> PathBuf {
    write_file(
        dir,
        "pacientes.csv",
        &format!(
            "{HEADER}A,Femenino,30,2,4.0,-74.0\nB,Masculino,40,1,4.1,-74.2\nA,Masculino,50,3,999,-74.3\n"
        ),
    )
}

#[test]
fn csv_load_filter_aggregate_project() {
    let dir = TempDir::new().unwrap();
    let loaded = load(&three_patients(&dir)).unwrap();
    assert!(loaded.warnings.is_empty());
    let table = &loaded.table;
    assert_eq!(table.len(), 3);

    let regions = count_by(table, Column::Region);
    assert_eq!(regions.get(&Value::from("A")), Some(2));
    assert_eq!(regions.get(&Value::from("B")), Some(1));

    assert_eq!(project(table).len(), 2);

    let only_a = by_equality(table, Column::Region, &Selection::only("A"));
    assert_eq!(count_by(&only_a, Column::Region).entries(), &[(Value::from("A"), 2)]);
    assert_eq!(project(&only_a).len(), 1);

    assert!(by_equality(table, Column::Region, &Selection::only("C")).is_empty());
    assert_eq!(&by_equality(table, Column::Region, &Selection::All), table);

    assert_eq!(describe(table, Column::Age).unwrap().mean, 40.0);
}

#[test]
fn malformed_rows_become_warnings() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "pacientes.csv",
        &format!(
            "{HEADER}Meta,Femenino,abc,2,4.1,-73.6\nMeta,Femenino,41,2,4.1\nHuila,Masculino,12,1,,\nMeta,Masculino,7,0,norte,-73.6\n"
        ),
    );
    let loaded = load(&path).unwrap();

    assert_eq!(loaded.table.len(), 1);
    let lines: Vec<usize> = loaded.warnings.iter().map(|w| w.line).collect();
    assert_eq!(lines, [2, 3, 5]);
    assert_eq!(loaded.warnings[0].column.as_deref(), Some("Edad"));
    assert_eq!(loaded.warnings[1].column, None);
    assert_eq!(loaded.warnings[2].column.as_deref(), Some("Latitud"));

    // The surviving row has no coordinates: counted, but not mapped.
    assert_eq!(count_by(&loaded.table, Column::Region).total(), 1);
    assert!(project(&loaded.table).is_empty());
}

#[test]
fn missing_columns_are_a_schema_error() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "pacientes.csv", "Departamento,Edad\nMeta,3\n");
    match load(&path) {
        Err(LoadError::Schema { missing }) => {
            assert_eq!(missing, ["Genero", "Visitas", "Latitud", "Longitud"]);
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn missing_file_is_source_unavailable() {
    let dir = TempDir::new().unwrap();
    let err = load(&dir.path().join("nope.csv")).unwrap_err();
    assert!(matches!(err, LoadError::SourceUnavailable { .. }));
}

#[test]
fn header_only_file_loads_an_empty_table() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "pacientes.csv", HEADER);
    let loaded = load(&path).unwrap();
    assert!(loaded.table.is_empty());
    assert_eq!(describe(&loaded.table, Column::Age).unwrap().count, 0);
    assert!(count_by(&loaded.table, Column::Region).is_empty());
}

#[test]
fn renamed_columns_are_resolved_at_the_boundary() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "patients.csv",
        "id,Department,Sex,Age,Visits,Lat,Lon\n1,Meta,F,41,2,4.1,-73.6\n",
    );
    let names = ColumnNames {
        region: "Department".into(),
        gender: "Sex".into(),
        age: "Age".into(),
        visits: "Visits".into(),
        latitude: "Lat".into(),
        longitude: "Lon".into(),
    };
    let loaded = load_with(&path, &names).unwrap();
    assert_eq!(loaded.table.rows()[0].region.as_deref(), Some("Meta"));
    assert_eq!(loaded.table.rows()[0].age, Some(41));
    assert!(matches!(load(&path), Err(LoadError::Schema { .. })));
}

#[test]
fn json_records_load_like_csv() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "pacientes.json",
        r#"[
            {"Departamento": "A", "Genero": "Femenino", "Edad": 30, "Visitas": 2, "Latitud": 4.0, "Longitud": -74.0},
            {"Departamento": "B", "Genero": "Masculino", "Edad": 40.0, "Visitas": 1, "Latitud": 4.1, "Longitud": -74.2},
            {"Departamento": "A", "Genero": null, "Edad": "old", "Visitas": 3, "Latitud": 4.2, "Longitud": -74.3},
            "not a record"
        ]"#,
    );
    let loaded = load(&path).unwrap();
    assert_eq!(loaded.table.len(), 2);
    assert_eq!(loaded.table.rows()[1].age, Some(40));
    let lines: Vec<usize> = loaded.warnings.iter().map(|w| w.line).collect();
    assert_eq!(lines, [3, 4]);
}

#[test]
fn json_schema_is_checked_on_the_first_record() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "pacientes.json", r#"[{"Departamento": "A"}]"#);
    assert!(matches!(load(&path), Err(LoadError::Schema { .. })));

    let path = write_file(&dir, "broken.json", "{");
    assert!(matches!(load(&path), Err(LoadError::Malformed { .. })));
}

#[test]
fn json_schema_skips_leading_non_objects() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "pacientes.json", r#"["junk", {"foo": 1}, {"bar": 2}]"#);
    match load(&path) {
        Err(LoadError::Schema { missing }) => assert_eq!(missing.len(), 6),
        other => panic!("expected schema error, got {other:?}"),
    }

    let path = write_file(&dir, "scalars.json", r#"[1, "two"]"#);
    assert!(matches!(load(&path), Err(LoadError::Schema { .. })));

    let path = write_file(
        &dir,
        "late.json",
        r#"[7, {"Departamento": "A", "Genero": "F", "Edad": 3, "Visitas": 1, "Latitud": 4.0, "Longitud": -74.0}]"#,
    );
    let loaded = load(&path).unwrap();
    assert_eq!(loaded.table.len(), 1);
    assert_eq!(loaded.warnings[0].line, 1);
}

#[test]
fn handle_loads_once_and_reuses_the_dataset() {
    let dir = TempDir::new().unwrap();
    let handle = DatasetHandle::new(three_patients(&dir));
    assert!(!handle.is_loaded());

    let first = handle.get().unwrap();
    let second = handle.get().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(!handle.is_stale());
}

#[test]
fn handle_is_shared_across_threads() {
    let dir = TempDir::new().unwrap();
    let handle = DatasetHandle::new(three_patients(&dir));

    let datasets: Vec<_> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..4).map(|_| s.spawn(|| handle.get().unwrap())).collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });
    for dataset in &datasets[1..] {
        assert!(Arc::ptr_eq(&datasets[0], dataset));
    }
}

#[test]
fn handle_refreshes_when_the_source_changes() {
    let dir = TempDir::new().unwrap();
    let path = three_patients(&dir);
    let handle = DatasetHandle::new(&path);
    let before = handle.get().unwrap();
    assert_eq!(before.table.len(), 3);

    write_file(
        &dir,
        "pacientes.csv",
        &format!("{HEADER}A,Femenino,30,2,4.0,-74.0\n"),
    );
    assert!(handle.is_stale());
    // Still served from the cache until refreshed.
    assert_eq!(handle.get().unwrap().table.len(), 3);

    let after = handle.refresh().unwrap();
    assert_eq!(after.table.len(), 1);
    assert!(!handle.is_stale());

    handle.invalidate();
    assert!(!handle.is_loaded());
}

#[test]
fn shared_handle_can_be_refreshed() {
    let dir = TempDir::new().unwrap();
    let path = three_patients(&dir);
    let handle = DatasetHandle::new(&path);
    let before = handle.get().unwrap();

    write_file(
        &dir,
        "pacientes.csv",
        &format!("{HEADER}A,Femenino,30,2,4.0,-74.0\n"),
    );
    let refreshed = std::thread::scope(|s| {
        let reader = s.spawn(|| handle.get().unwrap());
        let refresher = s.spawn(|| handle.refresh().unwrap());
        reader.join().unwrap();
        refresher.join().unwrap()
    });
    assert_eq!(refreshed.table.len(), 1);
    assert_eq!(handle.get().unwrap().table.len(), 1);
    // Datasets handed out earlier are unaffected.
    assert_eq!(before.table.len(), 3);
}

#[test]
fn parquet_columns_are_normalised() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pacientes.pq");

    let schema = Arc::new(Schema::new(vec![
        Field::new(
            "Departamento",
            DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
            false,
        ),
        Field::new("Genero", DataType::Boolean, false),
        Field::new("Edad", DataType::UInt64, false),
        Field::new("Visitas", DataType::Int32, false),
        Field::new("Latitud", DataType::Float64, true),
        Field::new("Longitud", DataType::Float32, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(vec!["A", "B", "A"].into_iter().collect::<DictionaryArray<Int32Type>>()),
        Arc::new(BooleanArray::from(vec![true, false, true])),
        Arc::new(UInt64Array::from(vec![30, 120, 50])),
        Arc::new(Int32Array::from(vec![2, 1, 3])),
        Arc::new(Float64Array::from(vec![Some(4.0), Some(4.1), None])),
        Arc::new(Float32Array::from(vec![-74.0, -74.25, -74.5])),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    let mut writer = ArrowWriter::try_new(fs::File::create(&path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let loaded = load(&path).unwrap();
    let rows = loaded.table.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].region.as_deref(), Some("A"));
    assert_eq!(rows[0].gender.as_deref(), Some("true"));
    assert_eq!(rows[0].age, Some(30));
    assert_eq!(rows[0].visits, Some(2));
    assert_eq!(rows[0].longitude, Some(-74.0));
    assert_eq!(rows[1].age, Some(50));
    assert_eq!(rows[1].latitude, None);

    assert_eq!(loaded.warnings.len(), 1);
    assert_eq!(loaded.warnings[0].line, 2);
    assert_eq!(loaded.warnings[0].column.as_deref(), Some("Edad"));

    // The null latitude keeps the third patient off the map.
    assert_eq!(project(&loaded.table).len(), 1);
}

#[test]
fn parquet_without_required_columns_is_a_schema_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pacientes.parquet");
    let schema = Arc::new(Schema::new(vec![Field::new("Departamento", DataType::Utf8, false)]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(StringArray::from(vec!["A"])) as ArrayRef],
    )
    .unwrap();
    let mut writer = ArrowWriter::try_new(fs::File::create(&path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    match load(&path) {
        Err(LoadError::Schema { missing }) => assert_eq!(missing.len(), 5),
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn failed_load_can_be_retried() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("later.csv");
    let handle = DatasetHandle::new(&path);
    assert!(handle.get().is_err());
    assert!(!handle.is_loaded());

    write_file(&dir, "later.csv", &format!("{HEADER}A,Femenino,30,2,4.0,-74.0\n"));
    assert_eq!(handle.get().unwrap().table.len(), 1);
}

#[test]
fn config_file_drives_handle_and_projector() {
    let dir = TempDir::new().unwrap();
    let data = three_patients(&dir);
    let config_path = write_file(
        &dir,
        "dash.toml",
        &format!(
            "[data]\npath = {:?}\n\n[geo.bounds]\nmin_lat = -4.2\nmax_lat = 12.5\nmin_lon = -79.0\nmax_lon = -66.0\n",
            data.display().to_string()
        ),
    );
    let config = DashboardConfig::load_from_file(&config_path).unwrap();
    let dataset = config.handle().get().unwrap();
    let projection = config.projector().project(&dataset.table);
    assert_eq!(projection.points.len(), 2);
    assert_eq!(projection.skipped, 1);
}
