use std::env;
use std::error::Error;

use mzformula::composition::Composition;
use mzformula::mass::{ion_mass, IonMode};
use mzformula::plausibility::PlausibilityMode;
use mzformula::rdb::Unsaturation;

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let composition: Composition = args
        .next()
        .inspect(|s| eprintln!("formula: {s}"))
        .ok_or("Expected a formula like C6H12O6")?
        .parse()?;
    let ion_mode = match args.next().as_deref() {
        Some("+") => IonMode::Positive,
        Some("-") => IonMode::Negative,
        Some("0") | None => IonMode::Neutral,
        Some(other) => return Err(format!("Unknown ion mode {other:?}, expected +, - or 0").into()),
    };
    let mass = ion_mass(&composition, ion_mode);
    let unsaturation = Unsaturation::from_composition(&composition);
    println!(
        "{composition}\t{mass:.6}\t{:.1}\t{:.1}",
        unsaturation.rdb, unsaturation.lewis
    );
    for mode in [PlausibilityMode::Strict, PlausibilityMode::Probabilistic] {
        println!("{mode}\t{}", mode.check(&composition));
    }
    println!("even-electron\t{}", unsaturation.is_acceptable());
    Ok(())
}
