//! Quarry query syntax
//!
//! Text form of query trees, one stage per node:
//!
//! ```text
//! filter author.name = "Ann" and not (year < 1990) | order -year, title
//!   | range 0..10 | distinct | select { title: title, author { who: name } }
//! ```

mod parser;

pub use parser::{parse, ParseError, QuarryParser, Rule};
