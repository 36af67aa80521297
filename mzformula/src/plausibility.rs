//! Element ratio screening of mass-matched compositions.
//!
//! The thresholds follow the element ratio rules of Kind & Fiehn[^1]. They are a
//! statistical gate, not a chemical proof, and are reproduced exactly, including
//! their strict comparisons and single-precision ratios.
//!
//! # References
//! [^1]: Kind, T., & Fiehn, O. (2007). Seven Golden Rules for heuristic filtering of
//!       molecular formulas obtained by accurate mass spectrometry. BMC Bioinformatics,
//!       8, 105. <https://doi.org/10.1186/1471-2105-8-105>
use std::fmt::Display;

use crate::composition::Composition;
use crate::element::ElementKind;

/// How strictly to screen element ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlausibilityMode {
    /// Accept every composition
    Disabled,
    /// Only reject compositions beyond the hard ratio limits covering 99.99% of known compounds
    Strict,
    /// Reject compositions outside the common ratio ranges covering 99.7% of known compounds,
    /// and apply the multi-element abundance checks
    #[default]
    Probabilistic,
}

impl PlausibilityMode {
    pub fn check(&self, composition: &Composition) -> bool {
        match self {
            PlausibilityMode::Disabled => true,
            PlausibilityMode::Strict => ElementRatioCounts::from(composition).is_plausible(false),
            PlausibilityMode::Probabilistic => {
                ElementRatioCounts::from(composition).is_plausible(true)
            }
        }
    }
}

impl Display for PlausibilityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The CHNOPS counts a ratio screen looks at.
///
/// Carbon, hydrogen and nitrogen include their heavy isotope siblings. Counts are held
/// in single precision because the ratio thresholds were calibrated against single
/// precision division.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ElementRatioCounts {
    pub carbon: f32,
    pub hydrogen: f32,
    pub nitrogen: f32,
    pub oxygen: f32,
    pub phosphorus: f32,
    pub sulfur: f32,
}

impl From<&Composition> for ElementRatioCounts {
    fn from(value: &Composition) -> Self {
        Self {
            carbon: value[ElementKind::C] as f32 + value[ElementKind::C13] as f32,
            hydrogen: value[ElementKind::H] as f32 + value[ElementKind::H2] as f32,
            nitrogen: value[ElementKind::N] as f32 + value[ElementKind::N15] as f32,
            oxygen: value[ElementKind::O] as f32,
            phosphorus: value[ElementKind::P] as f32,
            sulfur: value[ElementKind::S] as f32,
        }
    }
}

/// Upper limits on heteroatom to carbon ratios, `(strict, probabilistic)`
const NC_LIMITS: (f64, f64) = (4.0, 1.3);
const OC_LIMITS: (f64, f64) = (3.0, 1.2);
const PC_LIMITS: (f64, f64) = (2.0, 0.3);
const SC_LIMITS: (f64, f64) = (3.0, 0.8);

const HC_STRICT_MAX: f64 = 6.0;
const HC_PROBABLE_RANGE: (f64, f64) = (0.2, 3.1);

/// Single precision ratio, widened for comparison against double precision limits.
/// A zero denominator yields infinity, which every limit rejects.
#[inline]
fn ratio(numerator: f32, denominator: f32) -> f64 {
    (numerator / denominator) as f64
}

#[inline]
fn heteroatom_ratio_ok(count: f32, carbon: f32, limits: (f64, f64), probabilistic: bool) -> bool {
    if count <= 0.0 {
        return true;
    }
    let r = ratio(count, carbon);
    if probabilistic {
        r <= limits.1
    } else {
        r <= limits.0
    }
}

impl ElementRatioCounts {
    pub fn new(
        carbon: u32,
        hydrogen: u32,
        nitrogen: u32,
        oxygen: u32,
        phosphorus: u32,
        sulfur: u32,
    ) -> Self {
        Self {
            carbon: carbon as f32,
            hydrogen: hydrogen as f32,
            nitrogen: nitrogen as f32,
            oxygen: oxygen as f32,
            phosphorus: phosphorus as f32,
            sulfur: sulfur as f32,
        }
    }

    fn hydrogen_ratio_ok(&self, probabilistic: bool) -> bool {
        if self.carbon == 0.0 || self.hydrogen <= 0.0 {
            return true;
        }
        let r = ratio(self.hydrogen, self.carbon);
        if probabilistic {
            !(r < HC_PROBABLE_RANGE.0 || r > HC_PROBABLE_RANGE.1)
        } else {
            r <= HC_STRICT_MAX
        }
    }

    /// The multi-element abundance checks, applied only in probabilistic mode
    fn combined_counts_ok(&self) -> bool {
        let (n, o, p, s) = (self.nitrogen, self.oxygen, self.phosphorus, self.sulfur);
        // NOPS
        if n > 10.0 && o > 20.0 && p > 4.0 && s > 3.0 {
            return false;
        }
        // NOP
        if n > 3.0 && o > 3.0 && p > 3.0 && n > 11.0 && o > 22.0 && p > 6.0 {
            return false;
        }
        // OPS
        if o > 14.0 && p > 3.0 && s > 3.0 {
            return false;
        }
        // PSN
        if p > 3.0 && s > 3.0 && n > 4.0 {
            return false;
        }
        // NOS
        if n > 6.0 && o > 6.0 && s > 6.0 && n > 19.0 && o > 14.0 && s > 8.0 {
            return false;
        }
        true
    }

    /// Whether the counts pass every applicable ratio check.
    ///
    /// With `probabilistic` the common-range limits and the combined checks apply,
    /// otherwise only the hard limits.
    pub fn is_plausible(&self, probabilistic: bool) -> bool {
        self.hydrogen_ratio_ok(probabilistic)
            && heteroatom_ratio_ok(self.nitrogen, self.carbon, NC_LIMITS, probabilistic)
            && heteroatom_ratio_ok(self.oxygen, self.carbon, OC_LIMITS, probabilistic)
            && heteroatom_ratio_ok(self.phosphorus, self.carbon, PC_LIMITS, probabilistic)
            && heteroatom_ratio_ok(self.sulfur, self.carbon, SC_LIMITS, probabilistic)
            && (!probabilistic || self.combined_counts_ok())
    }
}

/// Screen the CHNOPS counts of a composition, see [`ElementRatioCounts::is_plausible`]
pub fn is_plausible(composition: &Composition, probabilistic: bool) -> bool {
    ElementRatioCounts::from(composition).is_plausible(probabilistic)
}

#[cfg(test)]
mod test {
    use super::*;

    fn counts(c: u32, h: u32, n: u32, o: u32, p: u32, s: u32) -> ElementRatioCounts {
        ElementRatioCounts::new(c, h, n, o, p, s)
    }

    #[test]
    fn test_hydrogen_ratio() {
        // H/C = 4 is beyond the common range but inside the hard limit
        assert!(!counts(1, 4, 0, 0, 0, 0).is_plausible(true));
        assert!(counts(1, 4, 0, 0, 0, 0).is_plausible(false));
        assert!(!counts(1, 7, 0, 0, 0, 0).is_plausible(false));
        assert!(counts(1, 6, 0, 0, 0, 0).is_plausible(false));
        // too hydrogen-poor
        assert!(!counts(10, 1, 0, 0, 0, 0).is_plausible(true));
        assert!(counts(10, 1, 0, 0, 0, 0).is_plausible(false));
        // 2/10 in single precision is slightly above 0.2
        assert!(counts(10, 2, 0, 0, 0, 0).is_plausible(true));
        // 31/10 in single precision is slightly below 3.1
        assert!(counts(10, 31, 0, 0, 0, 0).is_plausible(true));
        // no carbon or no hydrogen skips the check
        assert!(counts(0, 6, 0, 0, 0, 0).is_plausible(true));
        assert!(counts(6, 0, 0, 0, 0, 0).is_plausible(true));
    }

    #[test]
    fn test_heteroatom_without_carbon() {
        assert!(!counts(0, 2, 0, 1, 0, 0).is_plausible(true));
        assert!(!counts(0, 2, 0, 1, 0, 0).is_plausible(false));
        assert!(!counts(0, 3, 1, 0, 0, 0).is_plausible(false));
        assert!(counts(0, 0, 0, 0, 0, 0).is_plausible(true));
    }

    #[test]
    fn test_single_precision_boundaries() {
        // 3/10, 6/5 and 4/5 round up in single precision and so exceed their limits
        assert!(!counts(10, 20, 0, 0, 3, 0).is_plausible(true));
        assert!(!counts(5, 10, 0, 6, 0, 0).is_plausible(true));
        assert!(!counts(5, 10, 0, 0, 0, 4).is_plausible(true));
        // 13/10 rounds down and passes
        assert!(counts(10, 20, 13, 0, 0, 0).is_plausible(true));
        assert!(counts(10, 20, 0, 11, 2, 7).is_plausible(true));
    }

    #[test]
    fn test_strict_limits() {
        assert!(counts(1, 2, 4, 3, 2, 3).is_plausible(false));
        assert!(!counts(1, 2, 5, 0, 0, 0).is_plausible(false));
        assert!(!counts(1, 2, 0, 4, 0, 0).is_plausible(false));
        assert!(!counts(1, 2, 0, 0, 3, 0).is_plausible(false));
        assert!(!counts(1, 2, 0, 0, 0, 4).is_plausible(false));
    }

    #[test]
    fn test_combined_checks() {
        // enough carbon that no single ratio fails
        let c = 100;
        let h = 150;
        assert!(counts(c, h, 11, 21, 5, 4).is_plausible(false));
        assert!(!counts(c, h, 11, 21, 5, 4).is_plausible(true));
        assert!(counts(c, h, 10, 20, 5, 3).is_plausible(true));

        // NOP requires all three past the upper thresholds
        assert!(!counts(c, h, 12, 23, 7, 0).is_plausible(true));
        assert!(counts(c, h, 12, 23, 6, 0).is_plausible(true));

        // OPS
        assert!(!counts(c, h, 0, 15, 4, 4).is_plausible(true));
        assert!(counts(c, h, 0, 14, 4, 4).is_plausible(true));

        // PSN
        assert!(!counts(c, h, 5, 0, 4, 4).is_plausible(true));
        assert!(counts(c, h, 4, 0, 4, 4).is_plausible(true));

        // NOS
        assert!(!counts(c, h, 20, 15, 0, 9).is_plausible(true));
        assert!(counts(c, h, 20, 15, 0, 8).is_plausible(true));
    }

    #[test]
    fn test_isotope_siblings_summed() {
        let comp: Composition = "C1X1H8".parse().unwrap();
        let ratios = ElementRatioCounts::from(&comp);
        assert_eq!(ratios.carbon, 2.0);
        assert_eq!(ratios.hydrogen, 8.0);
        // H/C = 4 over both carbons
        assert!(!is_plausible(&comp, true));

        let comp: Composition = "C1X1H2D4".parse().unwrap();
        assert_eq!(ElementRatioCounts::from(&comp).hydrogen, 6.0);
        assert!(is_plausible(&comp, true));

        let comp: Composition = "C1N1M1H2".parse().unwrap();
        assert_eq!(ElementRatioCounts::from(&comp).nitrogen, 2.0);
        assert!(!is_plausible(&comp, true));
    }

    #[test]
    fn test_modes() {
        let methane: Composition = "CH4".parse().unwrap();
        assert!(!PlausibilityMode::Probabilistic.check(&methane));
        assert!(PlausibilityMode::Strict.check(&methane));
        let water: Composition = "H2O".parse().unwrap();
        assert!(!PlausibilityMode::Strict.check(&water));
        assert!(PlausibilityMode::Disabled.check(&water));
    }
}
