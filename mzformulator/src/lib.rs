mod args;
mod driver;
mod proc;
mod progress;
mod query;
mod write;

pub use args::*;
pub use driver::{MZFormulator, MZFormulatorError};
pub use proc::{search_query, QueryResult, SearchConfig};
pub use progress::ProgressRecord;
pub use query::{parse_query_line, MassQuery, QueryParseError, QueryReader};
pub use write::format_general;
