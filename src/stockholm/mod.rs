//! Stockholm multiple sequence alignment format.

mod error;
mod line;
mod parser;
mod source;
mod state;
mod types;
mod writer;

pub use error::{ErrorCategory, ErrorKind, LineError, ParseError};
pub use line::{LineEvent, classify};
pub use parser::{Reader, parse, parse_all, parse_file, parse_str};
pub use source::LineSource;
pub use state::{BlockLineKind, ParseState, Target};
pub use types::*;
pub use writer::{DEFAULT_BLOCK_WIDTH, write, write_file, write_string};
