//! Source-block extraction.
//!
//! Locates the function, modifier, constructor, receive or fallback block
//! that encloses a given line, using a keyword match for the declaration
//! and brace counting for the body. No parser is involved, so the result
//! is only as good as the brace structure of the text.

mod block;
mod types;

pub use block::extract;
pub use types::{Block, ExtractError};
