//! Column metadata, values and rows.

mod column;
mod row;
pub mod type_map;
mod value;

pub use column::{ColumnDescription, ColumnDescriptor, Nullability};
pub use row::Row;
pub use type_map::{TargetType, TypeCode};
pub use value::Value;
