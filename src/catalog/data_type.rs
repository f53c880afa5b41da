use strum::Display;

/// Key types an index can be declared over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DataType {
    Int32,
    Float64,
    Varchar,
    Date,
}
