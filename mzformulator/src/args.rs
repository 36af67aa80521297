use std::fmt::Display;
use std::str::FromStr;

use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};

use mzformula::element::{ElementBounds, ElementKind, ElementTable};
use mzformula::plausibility::PlausibilityMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgPlausibility {
    /// Keep every composition that matches the mass and RDB tests
    Disabled,
    /// Only apply the hard element ratio limits
    Strict,
    #[default]
    /// Apply the common element ratio ranges and multi-element checks
    Probabilistic,
}

impl From<ArgPlausibility> for PlausibilityMode {
    fn from(value: ArgPlausibility) -> Self {
        match value {
            ArgPlausibility::Disabled => PlausibilityMode::Disabled,
            ArgPlausibility::Strict => PlausibilityMode::Strict,
            ArgPlausibility::Probabilistic => PlausibilityMode::Probabilistic,
        }
    }
}

impl Display for ArgPlausibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    /// One `;`-separated block per query with a header line
    Csv,
    /// One JSON object per accepted formula
    Json,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The count range for each species, denoted (min)-(max) or (max)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Args, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementRangeArgs {
    /// The range of carbon-12 atoms
    #[arg(short = 'C', long = "carbon", value_name = "MIN-MAX", default_value_t = ElementBounds::new(0, 41), value_parser = ElementBounds::from_str)]
    pub carbon: ElementBounds,

    /// The range of carbon-13 atoms
    #[arg(short = 'X', long = "carbon13", value_name = "MIN-MAX", default_value_t = ElementBounds::fixed(0), value_parser = ElementBounds::from_str)]
    pub carbon13: ElementBounds,

    /// The range of hydrogen-1 atoms
    #[arg(short = 'H', long = "hydrogen", value_name = "MIN-MAX", default_value_t = ElementBounds::new(0, 72), value_parser = ElementBounds::from_str)]
    pub hydrogen: ElementBounds,

    /// The range of deuterium atoms
    #[arg(short = 'D', long = "deuterium", value_name = "MIN-MAX", default_value_t = ElementBounds::fixed(0), value_parser = ElementBounds::from_str)]
    pub deuterium: ElementBounds,

    /// The range of nitrogen-14 atoms
    #[arg(short = 'N', long = "nitrogen", value_name = "MIN-MAX", default_value_t = ElementBounds::new(0, 34), value_parser = ElementBounds::from_str)]
    pub nitrogen: ElementBounds,

    /// The range of nitrogen-15 atoms
    #[arg(short = 'M', long = "nitrogen15", value_name = "MIN-MAX", default_value_t = ElementBounds::fixed(0), value_parser = ElementBounds::from_str)]
    pub nitrogen15: ElementBounds,

    /// The range of oxygen atoms
    #[arg(short = 'O', long = "oxygen", value_name = "MIN-MAX", default_value_t = ElementBounds::new(0, 30), value_parser = ElementBounds::from_str)]
    pub oxygen: ElementBounds,

    /// The range of fluorine atoms
    #[arg(short = 'F', long = "fluorine", value_name = "MIN-MAX", default_value_t = ElementBounds::fixed(0), value_parser = ElementBounds::from_str)]
    pub fluorine: ElementBounds,

    /// The range of sodium atoms
    #[arg(short = 'A', long = "sodium", value_name = "MIN-MAX", default_value_t = ElementBounds::fixed(0), value_parser = ElementBounds::from_str)]
    pub sodium: ElementBounds,

    /// The range of silicon atoms
    #[arg(short = 'I', long = "silicon", value_name = "MIN-MAX", default_value_t = ElementBounds::fixed(0), value_parser = ElementBounds::from_str)]
    pub silicon: ElementBounds,

    /// The range of phosphorus atoms
    #[arg(short = 'P', long = "phosphorus", value_name = "MIN-MAX", default_value_t = ElementBounds::fixed(0), value_parser = ElementBounds::from_str)]
    pub phosphorus: ElementBounds,

    /// The range of sulfur atoms
    #[arg(short = 'S', long = "sulfur", value_name = "MIN-MAX", default_value_t = ElementBounds::fixed(0), value_parser = ElementBounds::from_str)]
    pub sulfur: ElementBounds,

    /// The range of chlorine atoms
    #[arg(short = 'L', long = "chlorine", value_name = "MIN-MAX", default_value_t = ElementBounds::fixed(0), value_parser = ElementBounds::from_str)]
    pub chlorine: ElementBounds,

    /// The range of bromine atoms
    #[arg(short = 'B', long = "bromine", value_name = "MIN-MAX", default_value_t = ElementBounds::fixed(0), value_parser = ElementBounds::from_str)]
    pub bromine: ElementBounds,
}

impl Default for ElementRangeArgs {
    fn default() -> Self {
        Self::from_table(&ElementTable::default())
    }
}

impl ElementRangeArgs {
    pub fn from_table(table: &ElementTable) -> Self {
        Self {
            carbon: table[ElementKind::C],
            carbon13: table[ElementKind::C13],
            hydrogen: table[ElementKind::H],
            deuterium: table[ElementKind::H2],
            nitrogen: table[ElementKind::N],
            nitrogen15: table[ElementKind::N15],
            oxygen: table[ElementKind::O],
            fluorine: table[ElementKind::F],
            sodium: table[ElementKind::Na],
            silicon: table[ElementKind::Si],
            phosphorus: table[ElementKind::P],
            sulfur: table[ElementKind::S],
            chlorine: table[ElementKind::Cl],
            bromine: table[ElementKind::Br],
        }
    }

    pub fn to_table(&self) -> ElementTable {
        let mut table = ElementTable::new();
        for (element, bounds) in [
            (ElementKind::C, self.carbon),
            (ElementKind::C13, self.carbon13),
            (ElementKind::H, self.hydrogen),
            (ElementKind::H2, self.deuterium),
            (ElementKind::N, self.nitrogen),
            (ElementKind::N15, self.nitrogen15),
            (ElementKind::O, self.oxygen),
            (ElementKind::F, self.fluorine),
            (ElementKind::Na, self.sodium),
            (ElementKind::Si, self.silicon),
            (ElementKind::P, self.phosphorus),
            (ElementKind::S, self.sulfur),
            (ElementKind::Cl, self.chlorine),
            (ElementKind::Br, self.bromine),
        ] {
            table.set_bounds(element, bounds);
        }
        table
    }
}
