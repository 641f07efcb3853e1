pub use crate::parser::{
    parse, parse_catalog, parse_lookup_response, satellite_id, CatalogParse, ParseError,
    ParsedEntry,
};

pub mod parser;

/// Name given to a lookup response that only carried the two element lines
pub const LOOKUP_NAME_PREFIX: &str = "SAT-";
