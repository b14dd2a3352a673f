//! Input parsing and result serialization.

mod hig;
mod output;

pub use hig::{parse_hig, parse_hig_file};
pub use output::{
    write_csv, write_json, write_output, write_text, Detail, OutputFormat, OutputOptions,
};
