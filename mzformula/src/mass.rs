//! Ion mass evaluation and mass tolerance windows
use std::fmt::Display;

use mzpeaks::Tolerance;

use crate::composition::Composition;

/// The mass of an electron in unified atomic mass units
pub const ELECTRON_MASS: f64 = 0.000549;

/// The ionization state of the measured species.
///
/// A positive ion has lost an electron, a negative ion has gained one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IonMode {
    Negative,
    #[default]
    Neutral,
    Positive,
}

impl IonMode {
    /// The sign of the charge, -1, 0 or +1
    #[inline]
    pub const fn charge_sign(&self) -> f64 {
        match self {
            IonMode::Negative => -1.0,
            IonMode::Neutral => 0.0,
            IonMode::Positive => 1.0,
        }
    }

    /// The mass correction added to a neutral composition's mass
    #[inline]
    pub fn electron_correction(&self) -> f64 {
        -(self.charge_sign() * ELECTRON_MASS)
    }
}

impl Display for IonMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The monoisotopic mass of the neutral composition, summed in table order
#[inline]
pub fn neutral_mass(composition: &Composition) -> f64 {
    let mut sum = 0.0;
    for (element, count) in composition.iter() {
        sum += element.exact_mass() * count as f64;
    }
    sum
}

/// The mass of `composition` as an ion in `ion_mode`.
///
/// ```math
/// m = \sum_i m_i c_i - z \cdot m_{e}
/// ```
#[inline]
pub fn ion_mass(composition: &Composition, ion_mode: IonMode) -> f64 {
    neutral_mass(composition) - ion_mode.charge_sign() * ELECTRON_MASS
}

/// A symmetric, inclusive window around a target mass
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MassWindow {
    pub target: f64,
    pub lower: f64,
    pub upper: f64,
}

impl MassWindow {
    /// Build a window from a target mass and a [`Tolerance`]
    pub fn new(target: f64, tolerance: Tolerance) -> Self {
        let (lower, upper) = tolerance.bounds(target);
        Self {
            target,
            lower,
            upper,
        }
    }

    /// Build a window from a target mass and a tolerance in milli-mass-units
    pub fn from_milli(target: f64, tolerance_milli: f64) -> Self {
        Self::new(target, Tolerance::Da(tolerance_milli / 1000.0))
    }

    /// Build a window from a target mass and a tolerance in parts-per-million
    pub fn from_ppm(target: f64, ppm: f64) -> Self {
        Self::new(target, Tolerance::PPM(ppm))
    }

    #[inline]
    pub fn contains(&self, mass: f64) -> bool {
        mass >= self.lower && mass <= self.upper
    }

    /// The signed difference `target - mass` in milli-mass-units
    #[inline]
    pub fn error_milli(&self, mass: f64) -> f64 {
        1000.0 * (self.target - mass)
    }

    /// The half-width of the window in milli-mass-units
    pub fn tolerance_milli(&self) -> f64 {
        1000.0 * (self.upper - self.target)
    }
}

impl Display for MassWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6} [{:.6}, {:.6}]", self.target, self.lower, self.upper)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::element::ElementKind;

    macro_rules! assert_is_close {
        ($t1:expr, $t2:expr, $tol:expr, $label:literal) => {
            assert!(
                ($t1 - $t2).abs() < $tol,
                "Observed {} {}, expected {}, difference {}",
                $label,
                $t1,
                $t2,
                $t1 - $t2,
            );
        };
    }

    #[test]
    fn test_methane_mass() {
        let comp = Composition::new()
            .with(ElementKind::C, 1)
            .with(ElementKind::H, 4);
        assert_is_close!(neutral_mass(&comp), 16.0313001284, 1e-9, "mass");
        assert_eq!(ion_mass(&comp, IonMode::Neutral), neutral_mass(&comp));
        assert_is_close!(
            ion_mass(&comp, IonMode::Positive),
            16.0313001284 - ELECTRON_MASS,
            1e-9,
            "positive mass"
        );
        assert_is_close!(
            ion_mass(&comp, IonMode::Negative),
            16.0313001284 + ELECTRON_MASS,
            1e-9,
            "negative mass"
        );
    }

    #[test]
    fn test_heavy_isotopes() {
        let comp = Composition::new()
            .with(ElementKind::C13, 1)
            .with(ElementKind::H2, 1)
            .with(ElementKind::N15, 1);
        assert_is_close!(
            neutral_mass(&comp),
            13.0033548378 + 2.0141017778 + 15.0001088982,
            1e-9,
            "mass"
        );
    }

    #[test]
    fn test_window() {
        let window = MassWindow::from_milli(16.0313, 5.0);
        assert_is_close!(window.lower, 16.0263, 1e-12, "lower");
        assert_is_close!(window.upper, 16.0363, 1e-12, "upper");
        assert_is_close!(window.tolerance_milli(), 5.0, 1e-9, "tolerance");
        assert!(window.contains(16.0313001284));
        assert!(!window.contains(16.0187));
        assert!(window.contains(window.lower));
        assert!(window.contains(window.upper));
        assert_is_close!(window.error_milli(16.0303), 1.0, 1e-9, "error");

        let window = MassWindow::from_ppm(1000.0, 5.0);
        assert_is_close!(window.lower, 999.995, 1e-9, "lower");
        assert_is_close!(window.upper, 1000.005, 1e-9, "upper");
    }

    #[test]
    fn test_electron_correction() {
        assert_eq!(IonMode::Neutral.electron_correction(), 0.0);
        assert_eq!(IonMode::Positive.electron_correction(), -ELECTRON_MASS);
        assert_eq!(IonMode::Negative.electron_correction(), ELECTRON_MASS);
    }
}
