//! Photometric constants and magnitude conversions.
//!
//! Effective frequencies are derived once per process from the band
//! effective wavelengths.

use once_cell::sync::Lazy;

/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// One Ångström in metres.
pub const ANGSTROM: f64 = 1e-10;

/// Gaia G: Vega → AB zero-point offset.
pub const G_VEGA_TO_AB: f64 = -(25.6884 - 25.7934);

/// WISE W1: Vega → AB zero-point offset.
pub const W1_VEGA_TO_AB: f64 = 2.699;

/// Photometric bands used by the feature set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    W1,
    W2,
    G,
}

static W1_NU_EFFECTIVE: Lazy<f64> = Lazy::new(|| frequency_hz(Band::W1.effective_wavelength()));
static W2_NU_EFFECTIVE: Lazy<f64> = Lazy::new(|| frequency_hz(Band::W2.effective_wavelength()));
static G_NU_EFFECTIVE: Lazy<f64> = Lazy::new(|| frequency_hz(Band::G.effective_wavelength()));

impl Band {
    /// Effective wavelength in Ångström.
    pub const fn effective_wavelength(self) -> f64 {
        match self {
            Band::W1 => 33526.0,
            Band::W2 => 46028.0,
            Band::G => 6230.06,
        }
    }

    /// Effective frequency in Hz.
    pub fn effective_frequency(self) -> f64 {
        match self {
            Band::W1 => *W1_NU_EFFECTIVE,
            Band::W2 => *W2_NU_EFFECTIVE,
            Band::G => *G_NU_EFFECTIVE,
        }
    }
}

/// Frequency in Hz of light with the given wavelength in Ångström.
pub fn frequency_hz(wavelength_angstrom: f64) -> f64 {
    SPEED_OF_LIGHT / (wavelength_angstrom * ANGSTROM)
}

/// AB magnitude → flux density in erg/s/cm²/Hz.
///
/// `m_AB = -2.5 log10(fnu) - 48.6`
pub fn convert_ab_mag_to_fnu(mag_ab: f64) -> f64 {
    10f64.powf((48.6 + mag_ab) / -2.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_point_magnitude_is_unit_flux() {
        assert!((convert_ab_mag_to_fnu(-48.6) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn fnu_decreases_with_magnitude() {
        let mags: Vec<f64> = (-60..40).map(|m| m as f64 * 0.5).collect();
        for pair in mags.windows(2) {
            assert!(convert_ab_mag_to_fnu(pair[0]) > convert_ab_mag_to_fnu(pair[1]));
        }
    }

    #[test]
    fn five_magnitudes_is_factor_hundred() {
        let ratio = convert_ab_mag_to_fnu(15.0) / convert_ab_mag_to_fnu(20.0);
        assert!((ratio - 100.0).abs() < 1e-9);
    }

    #[test]
    fn effective_frequencies() {
        // G band: c / 6230.06 Å ≈ 4.812e14 Hz
        let g = Band::G.effective_frequency();
        assert!((g - 4.8120e14).abs() / g < 1e-4);
        assert!(Band::W2.effective_frequency() < Band::W1.effective_frequency());
        assert_eq!(Band::W1.effective_frequency(), frequency_hz(33526.0));
    }

    #[test]
    fn zero_points() {
        assert!((G_VEGA_TO_AB - 0.105).abs() < 1e-12);
        assert_eq!(W1_VEGA_TO_AB, 2.699);
    }
}
