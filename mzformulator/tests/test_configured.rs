use std::fs;

use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};

use mzformulator::{MZFormulator, OutputFormat};

#[test_log::test]
#[test_log(default_log_filter = "debug")]
fn test_methane_config() {
    let config = Figment::from(Serialized::defaults(MZFormulator::default()))
        .merge(Toml::file_exact("./tests/data/methane.toml"));
    let mut driver: MZFormulator = config.extract().unwrap();
    assert_eq!(driver.mass, Some(16.0313));
    assert_eq!(driver.output_format, OutputFormat::Csv);
    assert_eq!(driver.elements.hydrogen.max(), 4);

    let output_dir = std::env::temp_dir().join("mzformulator-tests");
    fs::create_dir_all(&output_dir).unwrap();
    driver.output_file = output_dir.join("methane.csv");
    driver.main().unwrap();

    let text = fs::read_to_string(&driver.output_file).unwrap();
    assert!(text.starts_with("\nFormula;RDB;LEWIS;Mass_Da;Mass_Error_mDa \n"));
    assert!(text.contains("C1H4;0;0;16.0313;"));
    assert_eq!(text.lines().filter(|l| !l.is_empty()).count(), 2);
}

#[test_log::test]
fn test_compressed_output() {
    let config = Figment::from(Serialized::defaults(MZFormulator::default()))
        .merge(Toml::file_exact("./tests/data/methane.toml"));
    let mut driver: MZFormulator = config.extract().unwrap();

    let output_dir = std::env::temp_dir().join("mzformulator-tests");
    fs::create_dir_all(&output_dir).unwrap();
    driver.output_file = output_dir.join("methane.csv.gz");
    driver.main().unwrap();

    let raw = fs::read(&driver.output_file).unwrap();
    assert_eq!(&raw[..2], &[0x1f, 0x8b]);
}
