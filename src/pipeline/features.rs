//! Photometric and astrometric features of the cross-matched catalogue.
//!
//! Every feature is an elementwise function of columns of the same row.
//! Missing counterparts are NaN and stay NaN; a quotient with a zero
//! denominator is NaN as well.

use crate::data::model::{Column, Table, TableError};
use crate::photometry::{Band, G_VEGA_TO_AB, W1_VEGA_TO_AB, convert_ab_mag_to_fnu};
use crate::pipeline::crossmatch::{ALLWISE_SUFFIX, GAIA_SUFFIX};
use crate::pipeline::reader::{DEC_BEST, LABEL, RA_BEST};

/// Columns of the persisted feature table, in order.
pub const FEATURE_COLUMNS: [&str; 12] = [
    RA_BEST,
    DEC_BEST,
    LABEL,
    "Fx",
    "PLX_SIG",
    "PM_SIG",
    "Bp_Rp",
    "W1_W2",
    "G_W1",
    "G_W2",
    "Fx_over_FG",
    "Fx_over_FW1",
];

fn gaia(name: &str) -> String {
    format!("{name}{GAIA_SUFFIX}")
}

fn allwise(name: &str) -> String {
    format!("{name}{ALLWISE_SUFFIX}")
}

fn divide(a: f64, b: f64) -> f64 {
    if b == 0.0 { f64::NAN } else { a / b }
}

fn zip_with(a: &[f64], b: &[f64], f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()
}

fn map(a: &[f64], f: impl Fn(f64) -> f64) -> Vec<f64> {
    a.iter().map(|&x| f(x)).collect()
}

/// Derive all features and project onto [`FEATURE_COLUMNS`].
pub fn compute_features(mut table: Table, flux_column: &str) -> Result<Table, TableError> {
    // 0.2–12 keV flux
    let fx = table.float_column(flux_column)?;
    table.set_column("Fx", Column::Float(fx))?;

    compute_gaia_features(&mut table)?;
    compute_wise_features(&mut table)?;

    table.select(&FEATURE_COLUMNS)
}

/// Parallax and proper-motion significance, distance, absolute magnitude,
/// Bp−Rp and the X-ray to G-band flux ratio. Requires `Fx`.
pub fn compute_gaia_features(table: &mut Table) -> Result<(), TableError> {
    let plx = table.float_column(&gaia("parallax"))?;
    let plx_err = table.float_column(&gaia("parallax_error"))?;
    let pmra = table.float_column(&gaia("pmra"))?;
    let pmra_err = table.float_column(&gaia("pmra_error"))?;
    let pmdec = table.float_column(&gaia("pmdec"))?;
    let pmdec_err = table.float_column(&gaia("pmdec_error"))?;
    let g = table.float_column(&gaia("phot_g_mean_mag"))?;
    let bp = table.float_column(&gaia("phot_bp_mean_mag"))?;
    let rp = table.float_column(&gaia("phot_rp_mean_mag"))?;
    let fx = table.float_column("Fx")?;

    table.set_column("PLX_SIG", Column::Float(zip_with(&plx, &plx_err, divide)))?;

    let pm_ra_sig = zip_with(&pmra, &pmra_err, divide);
    let pm_dec_sig = zip_with(&pmdec, &pmdec_err, divide);
    let pm_sig = zip_with(&pm_ra_sig, &pm_dec_sig, |a, b| (a.powi(2) + b.powi(2)).sqrt());
    table.set_column("PM_SIG", Column::Float(pm_sig))?;

    // parsecs
    let inv_plx = map(&plx, |p| divide(1000.0, p));
    let abs_mag = zip_with(&g, &inv_plx, |m, d| m - 5.0 * (0.1 * d).log10());
    table.set_column("INV_PLX", Column::Float(inv_plx))?;
    table.set_column("GAIA_ABS_MAG", Column::Float(abs_mag))?;

    table.set_column("Bp_Rp", Column::Float(zip_with(&bp, &rp, |b, r| b - r)))?;

    let g_ab = map(&g, |m| m + G_VEGA_TO_AB);
    let g_fnu = map(&g_ab, convert_ab_mag_to_fnu);
    let nu = Band::G.effective_frequency();
    let g_nufnu = map(&g_fnu, |f| nu * f);
    let fx_over_fg = zip_with(&fx, &g_nufnu, |x, f| divide(x, f).log10());
    table.set_column("G_AB", Column::Float(g_ab))?;
    table.set_column("G_FNU", Column::Float(g_fnu))?;
    table.set_column("G_NUFNU", Column::Float(g_nufnu))?;
    table.set_column("Fx_over_FG", Column::Float(fx_over_fg))?;
    Ok(())
}

/// W1−W2, the X-ray to W1 flux ratio and the optical–infrared colours
/// G−W1, G−W2. Requires `Fx`.
pub fn compute_wise_features(table: &mut Table) -> Result<(), TableError> {
    let w1 = table.float_column(&allwise("W1mag"))?;
    let w2 = table.float_column(&allwise("W2mag"))?;
    let g = table.float_column(&gaia("phot_g_mean_mag"))?;
    let fx = table.float_column("Fx")?;

    table.set_column("W1_W2", Column::Float(zip_with(&w1, &w2, |a, b| a - b)))?;

    let w1_ab = map(&w1, |m| m + W1_VEGA_TO_AB);
    let w1_fnu = map(&w1_ab, convert_ab_mag_to_fnu);
    let nu = Band::W1.effective_frequency();
    let w1_nufnu = map(&w1_fnu, |f| nu * f);
    let fx_over_fw1 = zip_with(&fx, &w1_nufnu, |x, f| divide(x, f).log10());
    table.set_column("W1_AB", Column::Float(w1_ab))?;
    table.set_column("W1_FNU", Column::Float(w1_fnu))?;
    table.set_column("W1_NUFNU", Column::Float(w1_nufnu))?;
    table.set_column("Fx_over_FW1", Column::Float(fx_over_fw1))?;

    table.set_column("G_W1", Column::Float(zip_with(&g, &w1, |a, b| a - b)))?;
    table.set_column("G_W2", Column::Float(zip_with(&g, &w2, |a, b| a - b)))?;
    Ok(())
}
