//! Data models for Sheetwatch

mod alert;
mod row;
mod source;

pub use alert::*;
pub use row::*;
pub use source::*;
