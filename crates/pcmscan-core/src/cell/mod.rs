//! Cell addressing and values

pub mod address;
pub mod value;

pub use address::CellAddress;
pub use value::CellValue;
