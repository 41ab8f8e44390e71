use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;
use xclass::config::{CatalogueSpec, Config, TrainingSet};

/// Write two small labelled catalogues and a config that uses them.
#[derive(Parser)]
#[command(name = "generate-sample")]
struct Args {
    /// Directory receiving the catalogues and `xclass.toml`
    #[arg(long, default_value = "sample")]
    output: PathBuf,

    /// Sources per catalogue
    #[arg(long, default_value = "50")]
    rows: usize,

    /// Seed of the position generator
    #[arg(long, default_value = "42")]
    seed: u64,
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

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

/// Uniformly distributed sky position, degrees.
fn random_position(rng: &mut SimpleRng) -> (f64, f64) {
    let ra = rng.uniform(0.0, 360.0);
    let sin_dec = rng.uniform(-1.0, 1.0);
    (ra, sin_dec.asin().to_degrees())
}

/// One catalogue in the column layout of its survey: position column names
/// differ between catalogues, which is what the config maps.
fn write_catalogue(
    path: &Path,
    ra_name: &str,
    dec_name: &str,
    extra: (&str, f64, f64),
    rows: usize,
    rng: &mut SimpleRng,
) -> Result<()> {
    let mut ids = Vec::with_capacity(rows);
    let mut names = Vec::with_capacity(rows);
    let mut ras = Vec::with_capacity(rows);
    let mut decs = Vec::with_capacity(rows);
    let mut extras = Vec::with_capacity(rows);

    for i in 0..rows {
        let (ra, dec) = random_position(rng);
        ids.push(i as i64);
        names.push(format!("J{ra:08.4}{dec:+08.4}"));
        ras.push(ra);
        decs.push(dec);
        extras.push(rng.uniform(extra.1, extra.2));
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, false),
        Field::new(ra_name, DataType::Float64, false),
        Field::new(dec_name, DataType::Float64, false),
        Field::new(extra.0, DataType::Float64, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(ids)),
        Arc::new(StringArray::from(names)),
        Arc::new(Float64Array::from(ras)),
        Arc::new(Float64Array::from(decs)),
        Arc::new(Float64Array::from(extras)),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let qso_path = args.output.join("qso.parquet");
    let star_path = args.output.join("star.parquet");
    write_catalogue(&qso_path, "RAdeg", "DEdeg", ("z", 0.1, 4.0), args.rows, &mut rng)?;
    write_catalogue(&star_path, "ra", "dec", ("gmag", 8.0, 19.0), args.rows, &mut rng)?;

    let mut config = Config {
        data_dir: args.output.join("data"),
        ..Config::default()
    };
    config.versions.insert(
        config.version.clone(),
        TrainingSet {
            catalogues: vec![
                CatalogueSpec {
                    label: "QSO".to_string(),
                    path: qso_path,
                    ra_column: "RAdeg".to_string(),
                    dec_column: "DEdeg".to_string(),
                },
                CatalogueSpec {
                    label: "STAR".to_string(),
                    path: star_path,
                    ra_column: "ra".to_string(),
                    dec_column: "dec".to_string(),
                },
            ],
        },
    );

    let config_path = args.output.join("xclass.toml");
    let text = toml::to_string_pretty(&config).context("serializing config")?;
    std::fs::write(&config_path, text)
        .with_context(|| format!("writing {}", config_path.display()))?;

    println!(
        "Wrote 2 catalogues ({} sources each) and {}",
        args.rows,
        config_path.display()
    );
    Ok(())
}
