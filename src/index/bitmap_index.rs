use crate::catalog::DataType;
use crate::error::{PlumeDBError, PlumeDBResult};
use crate::index::{check_key_type, parse_predicate_value, Index, RowId};
use crate::plan::predicate::{Operator, PredicateNode};
use crate::utils::scalar::ScalarValue;
use parking_lot::RwLock;
use std::collections::HashMap;

const WORD_BITS: usize = 32;

/// Equality-only index keeping one packed bit vector per distinct key.
///
/// The row-id universe `[0, max_row_id]` is fixed at construction, so
/// every vector has exactly `ceil((max_row_id + 1) / 32)` words and is
/// never resized. Bits are only ever set: clearing a bit would make
/// "value is false" indistinguishable from "row does not exist", which
/// is also why a key absent from the map means "no rows match".
#[derive(Debug)]
pub struct BitmapIndex {
    attribute: String,
    key_type: DataType,
    max_row_id: RowId,
    bitmaps: RwLock<HashMap<ScalarValue, Vec<u32>>>,
}

impl BitmapIndex {
    pub fn new(attribute: impl Into<String>, key_type: DataType, max_row_id: RowId) -> Self {
        Self {
            attribute: attribute.into(),
            key_type,
            max_row_id,
            bitmaps: RwLock::new(HashMap::new()),
        }
    }

    pub fn max_row_id(&self) -> RowId {
        self.max_row_id
    }

    fn words_per_bitmap(&self) -> usize {
        (self.max_row_id as usize + 1 + WORD_BITS - 1) / WORD_BITS
    }
}

impl Index for BitmapIndex {
    fn insert(&self, key: &ScalarValue, row_id: RowId) -> PlumeDBResult<()> {
        check_key_type(key, self.key_type, self.pretty_name())?;
        if row_id > self.max_row_id {
            return Err(PlumeDBError::Internal(format!(
                "row id {} exceeds the bitmap universe [0, {}]",
                row_id, self.max_row_id
            )));
        }
        let words = self.words_per_bitmap();
        let mut bitmaps = self.bitmaps.write();
        let bitmap = bitmaps
            .entry(key.clone())
            .or_insert_with(|| vec![0u32; words]);
        bitmap[row_id as usize / WORD_BITS] |= 1 << (row_id as usize % WORD_BITS);
        Ok(())
    }

    fn search(&self, key: &ScalarValue) -> PlumeDBResult<Vec<RowId>> {
        check_key_type(key, self.key_type, self.pretty_name())?;
        let bitmaps = self.bitmaps.read();
        let Some(bitmap) = bitmaps.get(key) else {
            return Ok(Vec::new());
        };
        let mut result = Vec::new();
        for (i, word) in bitmap.iter().enumerate() {
            if *word == 0 {
                continue;
            }
            for j in 0..WORD_BITS {
                if word & (1 << j) != 0 {
                    result.push((i * WORD_BITS + j) as RowId);
                }
            }
        }
        Ok(result)
    }

    fn evaluate(&self, node: &PredicateNode) -> PlumeDBResult<Vec<RowId>> {
        log::debug!(
            "Evaluating predicate using bitmap index on attribute {} for operator {}",
            self.attribute,
            node.operator
        );
        if node.operator != Operator::Equals {
            return Err(PlumeDBError::UnsupportedPredicate(format!(
                "{} only supports the EQUALS operator, got {}",
                self.pretty_name(),
                node.operator
            )));
        }
        let key = parse_predicate_value(node.value.as_deref(), self.key_type)?;
        self.search(&key)
    }

    fn supports(&self, op: Operator) -> bool {
        op == Operator::Equals
    }

    fn key_type(&self) -> DataType {
        self.key_type
    }

    fn attribute(&self) -> &str {
        &self.attribute
    }

    fn pretty_name(&self) -> &'static str {
        "BitMap Index"
    }
}

#[cfg(test)]
mod tests {
    use super::BitmapIndex;
    use crate::catalog::DataType;
    use crate::error::PlumeDBError;
    use crate::index::Index;
    use crate::plan::predicate::{Operator, PredicateNode};
    use crate::utils::scalar::ScalarValue;

    #[test]
    fn insert_and_search_by_department() {
        let index = BitmapIndex::new("dept", DataType::Varchar, 7);
        index.insert(&"HR".into(), 0).unwrap();
        index.insert(&"HR".into(), 3).unwrap();
        index.insert(&"ENG".into(), 1).unwrap();

        assert_eq!(index.search(&"HR".into()).unwrap(), vec![0, 3]);
        assert_eq!(index.search(&"ENG".into()).unwrap(), vec![1]);
        assert_eq!(index.search(&"SALES".into()).unwrap(), Vec::<u32>::new());

        let node = PredicateNode::leaf(Operator::Equals, "dept", "HR");
        assert_eq!(index.evaluate(&node).unwrap(), vec![0, 3]);
    }

    #[test]
    fn repeated_insert_is_idempotent() {
        let index = BitmapIndex::new("flag", DataType::Int32, 63);
        index.insert(&1.into(), 40).unwrap();
        index.insert(&1.into(), 40).unwrap();
        assert_eq!(index.search(&1.into()).unwrap(), vec![40]);
    }

    #[test]
    fn row_id_boundary_is_inclusive() {
        let index = BitmapIndex::new("flag", DataType::Int32, 31);
        index.insert(&7.into(), 31).unwrap();
        assert_eq!(index.search(&7.into()).unwrap(), vec![31]);
        assert!(index.insert(&7.into(), 32).is_err());
    }

    #[test]
    fn rejects_non_equality_operators() {
        let index = BitmapIndex::new("age", DataType::Int32, 15);
        let node = PredicateNode::leaf(Operator::Lt, "age", "30");
        assert!(matches!(
            index.evaluate(&node),
            Err(PlumeDBError::UnsupportedPredicate(_))
        ));
        let node = PredicateNode::range("age", "30", "40");
        assert!(matches!(
            index.evaluate(&node),
            Err(PlumeDBError::UnsupportedPredicate(_))
        ));
    }

    #[test]
    fn rejects_mismatched_key_types() {
        let index = BitmapIndex::new("age", DataType::Int32, 15);
        assert!(matches!(
            index.insert(&"oops".into(), 1),
            Err(PlumeDBError::TypeMismatch(_))
        ));
        let node = PredicateNode::leaf(Operator::Equals, "age", "not-a-number");
        assert!(matches!(
            index.evaluate(&node),
            Err(PlumeDBError::TypeMismatch(_))
        ));
    }

    #[test]
    fn delete_is_always_unsupported() {
        let index = BitmapIndex::new("dept", DataType::Varchar, 7);
        index.insert(&"HR".into(), 0).unwrap();
        assert!(matches!(
            index.delete(&ScalarValue::from("HR")),
            Err(PlumeDBError::NotSupport(_))
        ));
        // state untouched
        assert_eq!(index.search(&"HR".into()).unwrap(), vec![0]);
    }
}
