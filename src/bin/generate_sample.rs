use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray, UInt32Array, UInt8Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

/// Departments with an approximate population centre and a sampling weight.
const DEPARTMENTS: [(&str, f64, f64, u32); 12] = [
    ("Antioquia", 6.25, -75.56, 14),
    ("Atlántico", 10.96, -74.80, 6),
    ("Bogotá D.C.", 4.61, -74.08, 20),
    ("Bolívar", 10.39, -75.51, 5),
    ("Boyacá", 5.53, -73.36, 3),
    ("Cauca", 2.44, -76.61, 3),
    ("Cundinamarca", 4.81, -74.35, 7),
    ("Huila", 2.93, -75.28, 3),
    ("Meta", 4.14, -73.63, 3),
    ("Nariño", 1.21, -77.28, 3),
    ("Santander", 7.12, -73.12, 5),
    ("Valle del Cauca", 3.45, -76.53, 10),
];

const GENDERS: [&str; 2] = ["Femenino", "Masculino"];

/// One output row, with the headers the dashboard expects.
#[derive(Serialize)]
struct PatientRow {
    #[serde(rename = "Departamento")]
    region: &'static str,
    #[serde(rename = "Genero")]
    gender: &'static str,
    #[serde(rename = "Edad")]
    age: u8,
    #[serde(rename = "Visitas")]
    visits: u32,
    #[serde(rename = "Latitud")]
    latitude: Option<f64>,
    #[serde(rename = "Longitud")]
    longitude: Option<f64>,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: u32) -> u32 {
        (self.next_f64() * f64::from(n)) as u32
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn pick_department(rng: &mut SimpleRng) -> (&'static str, f64, f64) {
    let total: u32 = DEPARTMENTS.iter().map(|d| d.3).sum();
    let mut ticket = rng.below(total);
    for &(name, lat, lon, weight) in &DEPARTMENTS {
        if ticket < weight {
            return (name, lat, lon);
        }
        ticket -= weight;
    }
    let (name, lat, lon, _) = DEPARTMENTS[0];
    (name, lat, lon)
}

fn generate(n: usize, rng: &mut SimpleRng) -> Vec<PatientRow> {
    (0..n)
        .map(|i| {
            let (region, lat, lon) = pick_department(rng);
            // Every 97th patient has no recorded location.
            let located = i % 97 != 96;
            PatientRow {
                region,
                gender: GENDERS[rng.below(2) as usize],
                age: rng.gauss(42.0, 20.0).clamp(0.0, 99.0).round() as u8,
                visits: rng.gauss(4.0, 3.0).max(0.0).round() as u32,
                latitude: located.then(|| rng.gauss(lat, 0.15)),
                longitude: located.then(|| rng.gauss(lon, 0.15)),
            }
        })
        .collect()
}

fn write_csv(path: &str, rows: &[PatientRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    for row in rows {
        writer.serialize(row).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_parquet(path: &str, rows: &[PatientRow]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Departamento", DataType::Utf8, false),
        Field::new("Genero", DataType::Utf8, false),
        Field::new("Edad", DataType::UInt8, false),
        Field::new("Visitas", DataType::UInt32, false),
        Field::new("Latitud", DataType::Float64, true),
        Field::new("Longitud", DataType::Float64, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(rows.iter().map(|r| r.region).collect::<Vec<_>>())),
            Arc::new(StringArray::from(rows.iter().map(|r| r.gender).collect::<Vec<_>>())),
            Arc::new(UInt8Array::from(rows.iter().map(|r| r.age).collect::<Vec<_>>())),
            Arc::new(UInt32Array::from(rows.iter().map(|r| r.visits).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.latitude).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.longitude).collect::<Vec<_>>())),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate(1000, &mut rng);

    write_csv("salud_pacientes.csv", &rows)?;
    write_parquet("salud_pacientes.parquet", &rows)?;

    println!(
        "Wrote {} patients to salud_pacientes.csv and salud_pacientes.parquet",
        rows.len()
    );
    Ok(())
}
