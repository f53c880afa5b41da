use crate::index::Index;
use crate::plan::predicate::Operator;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry resolving an `(attribute, operator)` pair to a concrete
/// index instance. Several indexes may cover one attribute (say a hash
/// index for equality next to a B+Tree for ranges); resolution picks
/// the first registered index that supports the operator.
#[derive(Debug, Default)]
pub struct Catalog {
    indexes: HashMap<String, Vec<Arc<dyn Index>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, index: Arc<dyn Index>) {
        self.indexes
            .entry(index.attribute().to_string())
            .or_default()
            .push(index);
    }

    pub fn get_index(&self, attribute: &str, op: Operator) -> Option<Arc<dyn Index>> {
        self.indexes
            .get(attribute)?
            .iter()
            .find(|index| index.supports(op))
            .cloned()
    }

    pub fn attribute_count(&self) -> usize {
        self.indexes.len()
    }
}
