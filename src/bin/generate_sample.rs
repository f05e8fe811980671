use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Builder, ListBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Shape of one synthetic break event.
struct TraceModel {
    /// log10(G/G0) of the molecular plateau, `None` for pure tunneling.
    plateau: Option<f64>,
    /// Amplifier noise floor in G0; makes some low samples negative.
    noise_floor: f64,
}

/// One trace: gold contact near 1 G0, optional molecular plateau, then
/// exponential tunneling decay into the noise floor.
fn generate_trace(model: &TraceModel, rng: &mut SimpleRng) -> Vec<f64> {
    let contact = 80 + (rng.next_f64() * 120.0) as usize;
    let plateau = match model.plateau {
        Some(_) => 150 + (rng.next_f64() * 250.0) as usize,
        None => 0,
    };
    let decay = 600 + (rng.next_f64() * 600.0) as usize;
    let slope = 7.0 / decay as f64;

    let mut trace = Vec::with_capacity(contact + plateau + decay);
    for _ in 0..contact {
        trace.push(10f64.powf(rng.gauss(0.0, 0.02)));
    }
    if let Some(level) = model.plateau {
        for _ in 0..plateau {
            trace.push(10f64.powf(rng.gauss(level, 0.15)));
        }
    }
    let start = model.plateau.unwrap_or(-0.5);
    for i in 0..decay {
        let log_g = start - slope * i as f64 + rng.gauss(0.0, 0.05);
        trace.push(10f64.powf(log_g) + rng.gauss(0.0, model.noise_floor));
    }
    trace
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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One trace per row, rows of differing length, no header.
fn write_csv(path: &str, traces: &[Vec<f64>]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {path}"))?;
    for trace in traces {
        writer
            .write_record(trace.iter().map(|v| format!("{v:.6e}")))
            .with_context(|| format!("writing {path}"))?;
    }
    writer.flush().with_context(|| format!("flushing {path}"))?;
    Ok(())
}

/// Single `trace` column of type List<Float64>.
fn write_parquet(path: &str, traces: &[Vec<f64>]) -> Result<()> {
    let mut builder = ListBuilder::new(Float64Builder::new());
    for trace in traces {
        builder.values().append_slice(trace);
        builder.append(true);
    }
    let array = builder.finish();

    let schema = Arc::new(Schema::new(vec![Field::new(
        "trace",
        DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
        false,
    )]));
    let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(array)])
        .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let n_traces = 200;

    let tunneling_model = TraceModel {
        plateau: None,
        noise_floor: 1e-7,
    };
    let molecular_model = TraceModel {
        plateau: Some(-3.8),
        noise_floor: 1e-7,
    };

    let tunneling: Vec<Vec<f64>> = (0..n_traces)
        .map(|_| generate_trace(&tunneling_model, &mut rng))
        .collect();
    let molecular: Vec<Vec<f64>> = (0..n_traces)
        .map(|_| generate_trace(&molecular_model, &mut rng))
        .collect();

    write_csv("example_tunneling_data.csv", &tunneling)?;
    write_csv("example_molecular_data.csv", &molecular)?;
    write_parquet("example_molecular_data.parquet", &molecular)?;

    let samples: usize = tunneling.iter().chain(&molecular).map(Vec::len).sum();
    println!(
        "Wrote {} traces ({samples} samples) to example_tunneling_data.csv, \
         example_molecular_data.csv and example_molecular_data.parquet",
        2 * n_traces
    );
    Ok(())
}
