pub mod error;
pub mod config;
pub mod metadata;
pub mod clause;
pub mod dimension;
pub mod query;
pub mod card;
pub mod picker;
pub mod actions;

pub use error::{QueryError, QueryResult};
pub use picker::MAX_INLINE_CATEGORIES;
