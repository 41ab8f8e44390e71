use std::cell::RefCell;
use std::path::{Path, PathBuf};

use xclass::config::{CatalogueSpec, TrainingSet};
use xclass::data::loader::{load_table, write_table};
use xclass::pipeline::crossmatch::{ALLWISE_TABLE, GAIA_TABLE};
use xclass::pipeline::features::FEATURE_COLUMNS;
use xclass::pipeline::reader::LABEL;
use xclass::{Column, Config, CrossMatcher, MatchError, MatchJob, Pipeline, Stage, Table};

const W1: [f64; 2] = [14.31, 11.87];
const W2: [f64; 2] = [13.02, 11.95];

/// Stands in for STILTS: appends fixed counterpart columns to the input
/// table and records every job it was given.
#[derive(Default)]
struct FakeMatcher {
    jobs: RefCell<Vec<MatchJob>>,
}

fn append(input: &Path, out: &Path, columns: &[(&str, Vec<f64>)]) -> Result<(), MatchError> {
    let fail = |e: anyhow::Error| MatchError::Other {
        job: "fake".into(),
        message: format!("{e:#}"),
    };
    let mut table = load_table(input).map_err(fail)?;
    for (name, values) in columns {
        table
            .set_column(*name, Column::Float(values[..table.len()].to_vec()))
            .map_err(|e| fail(e.into()))?;
    }
    write_table(out, &table).map_err(fail)
}

impl CrossMatcher for FakeMatcher {
    fn run(&self, job: &MatchJob) -> Result<(), MatchError> {
        self.jobs.borrow_mut().push(job.clone());
        match job {
            MatchJob::SkyErr(m) => append(
                &m.in1,
                &m.out,
                &[
                    ("SC_EP_8_FLUX", vec![2.5e-13, 4.0e-14]),
                    ("SC_RA", vec![10.0001, 30.0002]),
                ],
            ),
            MatchJob::Cds(m) if m.cds_table == ALLWISE_TABLE => append(
                &m.input,
                &m.out,
                &[("W1mag_ALLWISE", W1.to_vec()), ("W2mag_ALLWISE", W2.to_vec())],
            ),
            MatchJob::Cds(m) if m.cds_table == GAIA_TABLE => append(
                &m.input,
                &m.out,
                &[
                    ("parallax_GAIA_DR3", vec![0.05, 4.2]),
                    ("parallax_error_GAIA_DR3", vec![0.1, 0.05]),
                    ("pmra_GAIA_DR3", vec![0.1, -12.0]),
                    ("pmra_error_GAIA_DR3", vec![0.2, 0.05]),
                    ("pmdec_GAIA_DR3", vec![-0.3, 8.0]),
                    ("pmdec_error_GAIA_DR3", vec![0.2, 0.05]),
                    ("phot_g_mean_mag_GAIA_DR3", vec![18.2, 12.1]),
                    ("phot_bp_mean_mag_GAIA_DR3", vec![18.5, 12.6]),
                    ("phot_rp_mean_mag_GAIA_DR3", vec![17.7, 11.4]),
                ],
            ),
            MatchJob::Cds(m) => Err(MatchError::Other {
                job: job.to_string(),
                message: format!("unexpected table {}", m.cds_table),
            }),
        }
    }
}

/// Always fails, like a matcher that cannot reach CDS.
struct BrokenMatcher;

impl CrossMatcher for BrokenMatcher {
    fn run(&self, job: &MatchJob) -> Result<(), MatchError> {
        Err(MatchError::Other {
            job: job.to_string(),
            message: "connection refused".into(),
        })
    }
}

fn write_input(dir: &Path, name: &str, ra_col: &str, dec_col: &str, ra: f64, dec: f64) -> PathBuf {
    let path = dir.join(name);
    let table = Table::from_columns([
        (ra_col, Column::Float(vec![ra])),
        (dec_col, Column::Float(vec![dec])),
        ("extra", Column::Text(vec![Some("ignored".into())])),
    ])
    .unwrap();
    write_table(&path, &table).unwrap();
    path
}

fn two_label_config(dir: &Path) -> Config {
    let qso = write_input(dir, "qso.parquet", "RAdeg", "DEdeg", 10.0, 20.0);
    let star = write_input(dir, "star.csv", "ra", "dec", 30.0, -5.0);

    let mut config = Config {
        data_dir: dir.join("data"),
        ..Config::default()
    };
    config.xray.path = dir.join("xmm.parquet");
    config.versions.insert(
        "v0001".into(),
        TrainingSet {
            catalogues: vec![
                CatalogueSpec {
                    label: "QSO".into(),
                    path: qso,
                    ra_column: "RAdeg".into(),
                    dec_column: "DEdeg".into(),
                },
                CatalogueSpec {
                    label: "STAR".into(),
                    path: star,
                    ra_column: "ra".into(),
                    dec_column: "dec".into(),
                },
            ],
        },
    );
    config
}

fn labels(table: &Table) -> Vec<String> {
    table
        .text_column(LABEL)
        .unwrap()
        .iter()
        .map(|l| l.clone().unwrap())
        .collect()
}

#[test]
fn two_catalogues_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = two_label_config(dir.path());
    let matcher = FakeMatcher::default();
    let pipeline = Pipeline::new(&config, "v0001", &matcher).unwrap();

    let features = pipeline.run(Stage::Stack).unwrap();

    let stacked = load_table(&pipeline.paths().stacked).unwrap();
    assert_eq!(stacked.len(), 2);
    assert_eq!(labels(&stacked), ["QSO", "STAR"]);
    assert_eq!(stacked.float_column("RA_BEST").unwrap(), vec![10.0, 30.0]);
    assert_eq!(stacked.float_column("DEC_BEST").unwrap(), vec![20.0, -5.0]);

    assert_eq!(features.column_names(), FEATURE_COLUMNS);
    assert_eq!(labels(&features), ["QSO", "STAR"]);
    let w1_w2 = features.float_column("W1_W2").unwrap();
    assert_eq!(w1_w2, vec![W1[0] - W2[0], W1[1] - W2[1]]);
    assert_eq!(features.float_column("Fx").unwrap(), vec![2.5e-13, 4.0e-14]);

    let persisted = load_table(&pipeline.paths().features).unwrap();
    assert_eq!(persisted, features);
}

#[test]
fn joins_run_in_sequence_on_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = two_label_config(dir.path());
    let matcher = FakeMatcher::default();
    let pipeline = Pipeline::new(&config, "v0001", &matcher).unwrap();
    pipeline.run(Stage::Stack).unwrap();

    let jobs = matcher.jobs.borrow();
    assert_eq!(jobs.len(), 3);
    let paths = pipeline.paths();
    match &jobs[0] {
        MatchJob::SkyErr(m) => {
            assert_eq!(m.in1, paths.stacked);
            assert_eq!(m.in2, config.xray.path);
            assert_eq!(m.out, paths.xray);
        }
        other => panic!("expected X-ray job first, got {other:?}"),
    }
    match (&jobs[1], &jobs[2]) {
        (MatchJob::Cds(allwise), MatchJob::Cds(gaia)) => {
            assert_eq!(allwise.input, paths.xray);
            assert_eq!(allwise.cds_table, ALLWISE_TABLE);
            assert_eq!(allwise.radius_arcsec, 3.0);
            assert_eq!(gaia.input, allwise.out);
            assert_eq!(gaia.cds_table, GAIA_TABLE);
            assert_eq!(gaia.out, paths.multiwavelength);
        }
        other => panic!("expected two CDS jobs, got {other:?}"),
    }
}

#[test]
fn failed_join_stops_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = two_label_config(dir.path());
    let pipeline = Pipeline::new(&config, "v0001", BrokenMatcher).unwrap();

    let err = pipeline.run(Stage::Stack).unwrap_err();
    assert!(format!("{err:#}").contains("connection refused"));
    assert!(pipeline.paths().stacked.exists());
    assert!(!pipeline.paths().xray.exists());
    assert!(!pipeline.paths().features.exists());
}

#[test]
fn resume_from_features_reuses_matched_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = two_label_config(dir.path());
    let matcher = FakeMatcher::default();
    Pipeline::new(&config, "v0001", &matcher)
        .unwrap()
        .run(Stage::Stack)
        .unwrap();

    let resumed = Pipeline::new(&config, "v0001", BrokenMatcher).unwrap();
    let features = resumed.run(Stage::Features).unwrap();
    assert_eq!(features.len(), 2);
}

#[test]
fn missing_position_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = two_label_config(dir.path());
    config.versions.get_mut("v0001").unwrap().catalogues[1].ra_column = "RA".into();
    let pipeline = Pipeline::new(&config, "v0001", BrokenMatcher).unwrap();

    let err = pipeline.stack().unwrap_err();
    assert!(format!("{err:#}").contains("missing column 'RA'"));
    assert!(!pipeline.paths().stacked.exists());
}

#[test]
fn unknown_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = two_label_config(dir.path());
    assert!(Pipeline::new(&config, "v0002", BrokenMatcher).is_err());
}
