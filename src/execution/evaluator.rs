use crate::catalog::Catalog;
use crate::error::{PlumeDBError, PlumeDBResult};
use crate::index::{Index, RowId};
use crate::plan::predicate::{Operator, PredicateNode};
use std::collections::HashSet;
use std::sync::Arc;

/// Walks a predicate tree in postorder: leaves are delegated to the
/// index the catalog selects for the attribute/operator, boolean nodes
/// combine their children's row-id sets.
///
/// The row-id universe is `[0, max_row_id]`, inclusive at both ends;
/// NOT complements against exactly that universe.
#[derive(Debug)]
pub struct QueryEvaluator {
    catalog: Arc<Catalog>,
    max_row_id: RowId,
}

impl QueryEvaluator {
    pub fn new(catalog: Arc<Catalog>, max_row_id: RowId) -> Self {
        Self {
            catalog,
            max_row_id,
        }
    }

    pub fn max_row_id(&self) -> RowId {
        self.max_row_id
    }

    pub fn evaluate(&self, node: &PredicateNode) -> PlumeDBResult<Vec<RowId>> {
        match node.operator {
            Operator::And => {
                let (left, right) = Self::both_children(node)?;
                let left = self.evaluate(left)?;
                let right: HashSet<RowId> = self.evaluate(right)?.into_iter().collect();
                Ok(left.into_iter().filter(|id| right.contains(id)).collect())
            }
            Operator::Or => {
                let (left, right) = Self::both_children(node)?;
                let mut set: HashSet<RowId> = self.evaluate(left)?.into_iter().collect();
                set.extend(self.evaluate(right)?);
                let mut result: Vec<RowId> = set.into_iter().collect();
                result.sort_unstable();
                Ok(result)
            }
            Operator::Not => {
                let child = node.left.as_deref().ok_or_else(|| {
                    PlumeDBError::MalformedPredicate("NOT node is missing its child".to_string())
                })?;
                let hit: HashSet<RowId> = self.evaluate(child)?.into_iter().collect();
                Ok((0..=self.max_row_id).filter(|id| !hit.contains(id)).collect())
            }
            _ => self.evaluate_predicate(node),
        }
    }

    fn both_children(node: &PredicateNode) -> PlumeDBResult<(&PredicateNode, &PredicateNode)> {
        match (node.left.as_deref(), node.right.as_deref()) {
            (Some(left), Some(right)) => Ok((left, right)),
            _ => Err(PlumeDBError::MalformedPredicate(format!(
                "{} node requires two children",
                node.operator
            ))),
        }
    }

    fn evaluate_predicate(&self, node: &PredicateNode) -> PlumeDBResult<Vec<RowId>> {
        let attribute = node.attribute.as_deref().ok_or_else(|| {
            PlumeDBError::MalformedPredicate("predicate leaf is missing its attribute".to_string())
        })?;
        log::info!(
            "Evaluating predicate: {} {} {:?}{}",
            attribute,
            node.operator,
            node.value,
            if node.operator == Operator::Range {
                format!(" and {:?}", node.second_value)
            } else {
                String::new()
            }
        );

        let index = self
            .catalog
            .get_index(attribute, node.operator)
            .ok_or_else(|| {
                PlumeDBError::NotSupport(format!(
                    "no index on attribute '{}' supports the {} operator",
                    attribute, node.operator
                ))
            })?;
        log::info!("Using {}", index.pretty_name());

        index.evaluate(node)
    }
}
