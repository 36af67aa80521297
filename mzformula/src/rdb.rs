//! Rings plus double bond equivalents
use crate::composition::Composition;

/// Rings plus double bonds of a composition and the fractional part of that value.
///
/// ```math
/// \text{RDB} = \frac{2 + \sum_i u_i c_i}{2}
/// ```
///
/// where $`u_i`$ is the unsaturation weight of species $`i`$. A remainder of exactly
/// one half marks an odd-electron (radical) composition.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Unsaturation {
    pub rdb: f64,
    /// `rdb` modulo one, carrying the sign of `rdb`
    pub lewis: f64,
}

impl Unsaturation {
    pub fn new(rdb: f64) -> Self {
        Self {
            rdb,
            lewis: rdb % 1.0,
        }
    }

    pub fn from_composition(composition: &Composition) -> Self {
        Self::new(rings_and_double_bonds(composition))
    }

    /// Whether this is a non-negative, even-electron unsaturation
    #[inline]
    pub fn is_acceptable(&self) -> bool {
        self.rdb >= 0.0 && self.lewis != 0.5 && self.lewis != -0.5
    }
}

#[inline]
pub fn rings_and_double_bonds(composition: &Composition) -> f64 {
    let mut sum = 2.0;
    for (element, count) in composition.iter() {
        sum += element.unsaturation() * count as f64;
    }
    sum / 2.0
}
