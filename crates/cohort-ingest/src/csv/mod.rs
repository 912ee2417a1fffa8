//! CSV reading and writing primitives.

mod header;
mod reader;
mod writer;

pub use header::{ColumnMap, parse_csv_line};
pub use reader::split_records;
pub use writer::{EXPORT_FILE_NAME, EXPORT_HEADER, write_variables};
