use crate::catalog::DataType;
use crate::error::{PlumeDBError, PlumeDBResult};
use crate::plan::predicate::{Operator, PredicateNode};
use crate::utils::scalar::ScalarValue;

pub mod bitmap_index;
pub mod btree_index;
pub mod hash_index;

/// Identifier of a table row. The valid universe is `[0, max_row_id]`,
/// inclusive at both ends; `max_row_id` is supplied wherever a
/// complement has to be computed.
pub type RowId = u32;

/// Contract implemented by every index structure.
///
/// Indexes are populated by a single loader via `insert` and queried
/// read-only afterwards; methods take `&self` with state behind a
/// `parking_lot::RwLock` so instances can be shared as `Arc<dyn Index>`
/// by the catalog.
pub trait Index: std::fmt::Debug + Send + Sync {
    /// Associates `row_id` with `key`. Not idempotent for B+Tree/hash
    /// (repeated identical pairs duplicate the entry); idempotent for
    /// the bitmap (setting a set bit changes nothing).
    fn insert(&self, key: &ScalarValue, row_id: RowId) -> PlumeDBResult<()>;

    /// All and only row ids stored under `key`; empty if unknown.
    fn search(&self, key: &ScalarValue) -> PlumeDBResult<Vec<RowId>>;

    /// Removal is permanently unsupported: unsetting a bit would
    /// conflate "value is false" with "row does not exist", and tree or
    /// bucket merging is out of scope. Always fails with `NotSupport`.
    fn delete(&self, _key: &ScalarValue) -> PlumeDBResult<()> {
        Err(PlumeDBError::NotSupport(format!(
            "{} does not support delete",
            self.pretty_name()
        )))
    }

    /// Evaluates a leaf predicate, parsing its textual value(s) as the
    /// index's key type. Operators the structure cannot serve fail with
    /// `UnsupportedPredicate`.
    fn evaluate(&self, node: &PredicateNode) -> PlumeDBResult<Vec<RowId>>;

    /// Whether this structure can serve `op` at all. Used by the
    /// catalog to pick an index for a predicate leaf.
    fn supports(&self, op: Operator) -> bool;

    fn key_type(&self) -> DataType;

    fn attribute(&self) -> &str;

    fn pretty_name(&self) -> &'static str;
}

/// Parses a leaf predicate's `value` as `data_type`; a missing value is
/// a malformed leaf, an unparsable one a type mismatch.
pub(crate) fn parse_predicate_value(
    value: Option<&str>,
    data_type: DataType,
) -> PlumeDBResult<ScalarValue> {
    let text = value.ok_or_else(|| {
        PlumeDBError::MalformedPredicate("predicate leaf is missing its value".to_string())
    })?;
    ScalarValue::from_string(text, data_type)
}

/// Rejects keys whose runtime type differs from the index's declared one.
pub(crate) fn check_key_type(
    key: &ScalarValue,
    expected: DataType,
    pretty_name: &str,
) -> PlumeDBResult<()> {
    if key.data_type() != expected {
        return Err(PlumeDBError::TypeMismatch(format!(
            "{} is declared over {} but got a {} key",
            pretty_name,
            expected,
            key.data_type()
        )));
    }
    Ok(())
}
