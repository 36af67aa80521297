use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use clap::{parser::ValueSource, ArgMatches, FromArgMatches, Parser};
use serde::{Deserialize, Serialize};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    value::{Dict, Value},
    Figment,
};
use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use thiserror::Error;

use tracing::{debug, info, warn};

use mzpeaks::Tolerance;

use mzformula::mass::IonMode;
use mzformula::search::SearchParameters;

use crate::args::{ArgPlausibility, ElementRangeArgs, OutputFormat};
use crate::proc::{prepare_processing, SearchConfig};
use crate::query::{MassQuery, QueryParseError, QueryReader};
use crate::write::{collate_results, write_output};

pub(crate) const BUFFER_SIZE: usize = 1_000;
pub(crate) const DEFAULT_TOLERANCE: f64 = 5.0;

fn non_negative_float_f64(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|e| e.to_string())?;
    if value < 0.0 {
        Err(format!("`{s}` is less than zero"))
    } else {
        Ok(value)
    }
}

#[derive(Debug, Error)]
pub enum MZFormulatorError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("Failed to read queries: {0}")]
    QueryError(
        #[source]
        #[from]
        QueryParseError,
    ),
    #[error("Failed to parse arguments: {0}")]
    ArgumentError(
        #[source]
        #[from]
        clap::Error,
    ),
    #[error("Failed to load configuration: {0}")]
    ConfigurationError(
        #[source]
        #[from]
        figment::Error,
    ),
    #[error("Failed to build the thread pool: {0}")]
    ThreadPoolError(
        #[source]
        #[from]
        rayon::ThreadPoolBuildError,
    ),
    #[error("Positive and negative ion modes were both requested")]
    ConflictingIonModes,
}

/// Find the elemental compositions matching accurate masses.
///
/// Read a batch of `COMMENT MASS` lines from a file or stream, or take a single mass,
/// and write every plausible formula within the mass tolerance.
#[derive(Parser, Debug, Clone, Deserialize, Serialize)]
#[command(author, version)]
#[serde(default)]
pub struct MZFormulator {
    /// The path to read queries from, or if '-' is passed, read from STDIN.
    ///
    /// Each line holds a comment and a mass separated by whitespace, or just a mass. Lines
    /// starting with ';' are skipped and an empty line ends the batch. Takes precedence
    /// over `--mass`.
    #[arg()]
    pub input_file: Option<String>,

    /// The path to write the output file to, or if '-' is passed, write to STDOUT.
    ///
    /// Paths ending in `.gz` are gzip compressed.
    #[arg(short = 'o', long = "output-file", default_value = "-")]
    pub output_file: PathBuf,

    /// The format to write results in
    #[arg(long = "output-format", default_value = "csv")]
    pub output_format: OutputFormat,

    /// The path to write a log file to, in addition to STDERR
    #[arg(short = 'l', long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// A TOML configuration file to read additional parameters from.
    ///
    /// Configurations are also read from `mzformulator.toml` in the working directory.
    /// Environment variables prefixed with `MZFORMULATOR_` will be read too.
    #[arg(long = "config-file")]
    pub config_file: Option<PathBuf>,

    /// The size of the buffer for queueing writing of results to the output stream
    #[arg(short = 'w', long = "write-buffer-size", default_value_t = BUFFER_SIZE)]
    pub write_buffer_size: usize,

    /// The number of threads to use, passing a value < 1 to use all available threads
    #[arg(
        short='j',
        long="threads",
        default_value_t=-1,
    )]
    pub threads: i32,

    /// A single mass to search for
    #[arg(short = 'm', long = "mass")]
    pub mass: Option<f64>,

    /// The comment to label the single mass with
    #[arg(short = 'c', long = "comment", default_value = "")]
    pub comment: String,

    /// The mass tolerance in milli-mass-units
    #[arg(short = 't', long = "tolerance", default_value_t = DEFAULT_TOLERANCE, value_parser = non_negative_float_f64)]
    pub tolerance: f64,

    /// The mass tolerance in parts-per-million, used instead of `--tolerance`
    #[arg(long = "ppm", value_parser = non_negative_float_f64)]
    pub ppm: Option<f64>,

    /// Search for positive ions, removing an electron mass from each formula
    #[arg(short = 'p', long = "positive", conflicts_with = "negative")]
    pub positive: bool,

    /// Search for negative ions, adding an electron mass to each formula
    #[arg(short = 'n', long = "negative")]
    pub negative: bool,

    /// How to screen formulas by element ratios
    #[arg(long = "plausibility", default_value = "probabilistic")]
    pub plausibility: ArgPlausibility,

    #[command(flatten)]
    pub elements: ElementRangeArgs,
}

impl Default for MZFormulator {
    fn default() -> Self {
        Self {
            input_file: None,
            output_file: PathBuf::from("-"),
            output_format: OutputFormat::default(),
            log_file: None,
            config_file: None,
            write_buffer_size: BUFFER_SIZE,
            threads: -1,
            mass: None,
            comment: String::new(),
            tolerance: DEFAULT_TOLERANCE,
            ppm: None,
            positive: false,
            negative: false,
            plausibility: ArgPlausibility::default(),
            elements: ElementRangeArgs::default(),
        }
    }
}

impl MZFormulator {
    /// Layer the configuration sources in increasing priority: built-in defaults,
    /// `mzformulator.toml`, the `--config-file`, `MZFORMULATOR_` environment variables,
    /// and last the arguments given on the command line.
    pub fn layered(matches: &ArgMatches) -> Result<Figment, MZFormulatorError> {
        let args = Self::from_arg_matches(matches)?;
        let explicit = args.command_line_values(matches)?;
        let mut config = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file("mzformulator.toml"));
        if let Some(path) = args.config_file.as_ref() {
            config = config.merge(Toml::file_exact(path));
        }
        Ok(config
            .merge(Env::prefixed("MZFORMULATOR_").split("__"))
            .merge(Serialized::defaults(explicit)))
    }

    /// The subset of these arguments that were typed on the command line rather than
    /// filled in from defaults
    fn command_line_values(&self, matches: &ArgMatches) -> Result<Dict, MZFormulatorError> {
        let passed = |id: &str| matches.value_source(id) == Some(ValueSource::CommandLine);
        let mut values = Value::serialize(self)?.into_dict().unwrap_or_default();
        values.retain(|key, value| match value {
            Value::Dict(_, elements) if key == "elements" => {
                elements.retain(|element, _| passed(element.as_str()));
                !elements.is_empty()
            }
            _ => passed(key.as_str()),
        });
        Ok(values)
    }

    pub fn ion_mode(&self) -> Result<IonMode, MZFormulatorError> {
        match (self.positive, self.negative) {
            (true, true) => Err(MZFormulatorError::ConflictingIonModes),
            (true, false) => Ok(IonMode::Positive),
            (false, true) => Ok(IonMode::Negative),
            (false, false) => Ok(IonMode::Neutral),
        }
    }

    pub fn mass_tolerance(&self) -> Tolerance {
        match self.ppm {
            Some(ppm) => Tolerance::PPM(ppm),
            None => Tolerance::Da(self.tolerance / 1000.0),
        }
    }

    fn create_threadpool(&self) -> Result<rayon::ThreadPool, MZFormulatorError> {
        let num_threads = if self.threads > 0 {
            self.threads as usize
        } else {
            thread::available_parallelism()?.into()
        };
        debug!("Using {} cores", num_threads);
        Ok(rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?)
    }

    fn read_queries_from<R: BufRead>(&self, handle: R) -> Result<Vec<MassQuery>, MZFormulatorError> {
        let queries = QueryReader::new(handle).collect::<Result<Vec<_>, _>>()?;
        Ok(queries)
    }

    fn read_queries(&self) -> Result<Vec<MassQuery>, MZFormulatorError> {
        match (self.input_file.as_deref(), self.mass) {
            (Some("-"), _) | (None, None) => {
                debug!("Reading queries from STDIN");
                self.read_queries_from(io::stdin().lock())
            }
            (Some(path), _) => {
                let handle = io::BufReader::new(fs::File::open(path)?);
                if path.ends_with(".gz") {
                    debug!("Reading compressed queries from {path}");
                    self.read_queries_from(io::BufReader::new(MultiGzDecoder::new(handle)))
                } else {
                    self.read_queries_from(handle)
                }
            }
            (None, Some(mass)) => Ok(vec![MassQuery::new(0, self.comment.clone(), mass)]),
        }
    }

    pub fn main(&self) -> Result<(), MZFormulatorError> {
        info!(
            "mzformulator v{}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
        );
        if let Some(input_file) = self.input_file.as_deref() {
            info!("Input: {}", input_file);
        }
        info!("Output: {}", self.output_file.display());

        let ion_mode = self.ion_mode()?;
        let table = self.elements.to_table();
        let tolerance = self.mass_tolerance();
        info!("Elements: {table}");
        info!("Tolerance: {tolerance:?} | Ion Mode: {ion_mode} | Plausibility: {}", self.plausibility);
        if table.search_space_size() == u64::MAX {
            warn!("The element ranges span more than {} compositions", u64::MAX);
        }

        let queries = self.read_queries()?;
        info!("Read {} queries", queries.len());

        let config = SearchConfig {
            table,
            tolerance,
            parameters: SearchParameters::new(ion_mode, self.plausibility.into()),
            cancellation: Arc::new(AtomicBool::new(false)),
        };
        let pool = self.create_threadpool()?;
        self.writer_then(queries, config, pool)
    }

    fn writer_then(
        &self,
        queries: Vec<MassQuery>,
        config: SearchConfig,
        pool: rayon::ThreadPool,
    ) -> Result<(), MZFormulatorError> {
        if self.output_file == Path::new("-") {
            let writer = io::BufWriter::new(io::stdout());
            self.run_workflow(queries, config, pool, writer)?;
        } else {
            let handle = io::BufWriter::new(fs::File::create(&self.output_file)?);
            let compressed = self
                .output_file
                .extension()
                .is_some_and(|ext| ext == "gz");
            if compressed {
                let encoder = GzEncoder::new(handle, Compression::best());
                let encoder = self.run_workflow(queries, config, pool, encoder)?;
                encoder.finish()?.flush()?;
            } else {
                self.run_workflow(queries, config, pool, handle)?;
            }
        }
        Ok(())
    }

    fn run_workflow<W: Write + Send + 'static>(
        &self,
        queries: Vec<MassQuery>,
        config: SearchConfig,
        pool: rayon::ThreadPool,
        writer: W,
    ) -> io::Result<W> {
        let buffer_size = self.write_buffer_size.max(1);
        let (send_solved, recv_solved) = crossbeam_channel::bounded(buffer_size);
        let (send_collated, recv_collated) = crossbeam_channel::bounded(buffer_size);

        let cancellation = config.cancellation.clone();
        let output_format = self.output_format;

        let start = Instant::now();
        let search_task =
            thread::spawn(move || pool.install(|| prepare_processing(queries, config, send_solved)));

        let collate_task = thread::spawn(move || collate_results(recv_solved, send_collated));

        let write_task = thread::spawn(move || {
            write_output(writer, recv_collated, output_format, cancellation)
        });

        match search_task.join() {
            Ok(prog) => {
                info!("Queries: {}", prog.queries);
                info!("Formulas: {}", prog.formulas);
                info!("Candidates Evaluated: {}", prog.evaluated);
                if prog.saturated_queries > 0 {
                    warn!(
                        "{} queries exceeded the candidate counter",
                        prog.saturated_queries
                    );
                }
                if prog.cancelled_queries > 0 {
                    warn!("{} queries were cancelled", prog.cancelled_queries);
                }
            }
            Err(e) => {
                warn!("Failed to join search task: {e:?}");
            }
        }
        let search_done = Instant::now();
        let processing_elapsed = search_done - start;

        if let Err(e) = collate_task.join() {
            warn!("Failed to join collator task: {e:?}")
        }

        let writer = match write_task.join() {
            Ok(o) => o?,
            Err(e) => {
                return Err(io::Error::other(format!(
                    "Failed to join writer task: {e:?}"
                )));
            }
        };

        let elapsed = Instant::now() - start;
        if (elapsed.as_secs_f64() - processing_elapsed.as_secs_f64()) > 2.0 {
            info!("Total Elapsed Time: {:0.3?}", elapsed);
        }
        Ok(writer)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;
    use mzformula::element::ElementBounds;

    #[test]
    fn test_defaults_match_parser() {
        let parsed = MZFormulator::parse_from(["mzformulator"]);
        let defaults = MZFormulator::default();
        assert_eq!(parsed.elements, defaults.elements);
        assert_eq!(parsed.tolerance, defaults.tolerance);
        assert_eq!(parsed.output_file, defaults.output_file);
        assert_eq!(parsed.write_buffer_size, defaults.write_buffer_size);
        assert_eq!(parsed.plausibility, defaults.plausibility);
        assert_eq!(parsed.output_format, defaults.output_format);
    }

    #[test]
    fn test_element_flags() {
        let parsed =
            MZFormulator::parse_from(["mzformulator", "-m", "16.0313", "-C", "2-0", "-H", "4", "-L", "1-1"]);
        let table = parsed.elements.to_table();
        use mzformula::element::ElementKind;
        assert_eq!(table[ElementKind::C], ElementBounds::new(0, 2));
        assert_eq!(table[ElementKind::H], ElementBounds::new(0, 4));
        assert_eq!(table[ElementKind::Cl], ElementBounds::fixed(1));
        assert_eq!(parsed.mass, Some(16.0313));
    }

    #[test]
    fn test_ion_mode_and_tolerance() {
        let mut args = MZFormulator::default();
        assert_eq!(args.ion_mode().unwrap(), IonMode::Neutral);
        args.negative = true;
        assert_eq!(args.ion_mode().unwrap(), IonMode::Negative);
        args.positive = true;
        assert!(matches!(
            args.ion_mode(),
            Err(MZFormulatorError::ConflictingIonModes)
        ));
        assert!(matches!(args.mass_tolerance(), Tolerance::Da(t) if (t - 0.005).abs() < 1e-12));
        args.ppm = Some(5.0);
        assert!(matches!(args.mass_tolerance(), Tolerance::PPM(t) if t == 5.0));
    }

    #[test]
    fn test_rejects_both_ion_flags() {
        let result = MZFormulator::try_parse_from(["mzformulator", "-p", "-n", "-m", "16.0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_command_line_overrides_config() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "mzformulator.toml",
                r#"
                tolerance = 50.0
                threads = 3
                comment = "from-file"

                [elements.carbon]
                min = 0
                max = 41

                [elements.sulfur]
                min = 3
                max = 1
                "#,
            )?;
            jail.set_env("MZFORMULATOR_PLAUSIBILITY", "disabled");
            jail.set_env("MZFORMULATOR_ELEMENTS__HYDROGEN__MAX", "10");

            let matches = MZFormulator::command().get_matches_from([
                "mzformulator",
                "-m",
                "16.0313",
                "-t",
                "1",
                "-C",
                "0-2",
                "--plausibility",
                "strict",
            ]);
            let args: MZFormulator = MZFormulator::layered(&matches).unwrap().extract()?;

            // typed on the command line
            assert_eq!(args.tolerance, 1.0);
            assert_eq!(args.elements.carbon, ElementBounds::new(0, 2));
            assert_eq!(args.plausibility, ArgPlausibility::Strict);
            assert_eq!(args.mass, Some(16.0313));
            // not typed, so the file and environment fill them in
            assert_eq!(args.threads, 3);
            assert_eq!(args.comment, "from-file");
            assert_eq!(args.elements.hydrogen, ElementBounds::new(0, 10));
            assert_eq!(args.elements.sulfur, ElementBounds::new(1, 3));
            // neither, so the built-in default holds
            assert_eq!(args.elements.nitrogen, ElementBounds::new(0, 34));
            assert_eq!(args.write_buffer_size, BUFFER_SIZE);

            let matches = MZFormulator::command().get_matches_from(["mzformulator", "-m", "16.0313"]);
            let args: MZFormulator = MZFormulator::layered(&matches).unwrap().extract()?;
            assert_eq!(args.tolerance, 50.0);
            assert_eq!(args.plausibility, ArgPlausibility::Disabled);
            assert_eq!(args.elements.carbon, ElementBounds::new(0, 41));
            Ok(())
        });
    }

    #[test]
    fn test_single_mass_query() -> Result<(), MZFormulatorError> {
        let mut args = MZFormulator::default();
        args.mass = Some(94.0419);
        args.comment = "phenol".into();
        let queries = args.read_queries()?;
        assert_eq!(queries, vec![MassQuery::new(0, "phenol".into(), 94.0419)]);
        Ok(())
    }
}
