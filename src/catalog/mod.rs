mod catalog;
mod data_type;

pub use catalog::*;
pub use data_type::*;
