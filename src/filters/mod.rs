//! Ad-hoc list filtering: the comparison-string parser and the layer that
//! merges it with structured query parameters into SQL.

mod parser;
mod query;

pub use parser::{FilterError, FilterOp};
pub use query::{EntityFilter, FieldKind, FieldSpec, ListQuery, OrderSpec, ParamSpec};
