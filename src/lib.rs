pub mod catalog;
pub mod error;
pub mod execution;
pub mod index;
pub mod plan;
pub mod utils;
