//! Clause AST: literal values, field references and filter predicates.
//! In memory these are typed values; on the wire they keep the array encoding stored in a card's
//! `dataset_query`, converted by explicit `from_json` / `to_json` pairs.

mod value;
mod field_ref;
mod filter;

pub use value::Value;
pub use field_ref::{FieldRef, FIELD_TAG};
pub use filter::{Arity, Filter, FilterOp};
