use crate::catalog::DataType;
use crate::error::{PlumeDBError, PlumeDBResult};
use crate::index::{check_key_type, parse_predicate_value, Index, RowId};
use crate::plan::predicate::{Operator, PredicateNode};
use crate::utils::scalar::ScalarValue;
use parking_lot::RwLock;
use std::cmp::Ordering;

pub type NodeId = usize;

/// A tree node. Leaves keep one value bucket (the full row-id list) per
/// distinct key plus a link to the next leaf in key order; internal
/// nodes keep `keys.len() + 1` children.
#[derive(Debug)]
enum Node {
    Internal {
        keys: Vec<ScalarValue>,
        children: Vec<NodeId>,
    },
    Leaf {
        keys: Vec<ScalarValue>,
        buckets: Vec<Vec<RowId>>,
        next: Option<NodeId>,
    },
}

/// Nodes live in an arena and are addressed by stable ids; splits
/// allocate new ids and record the new root instead of aliasing nodes.
#[derive(Debug)]
struct BTreeCore {
    arena: Vec<Node>,
    root: NodeId,
    order: usize,
}

impl BTreeCore {
    fn new(order: usize) -> Self {
        let root = Node::Leaf {
            keys: Vec::new(),
            buckets: Vec::new(),
            next: None,
        };
        Self {
            arena: vec![root],
            root: 0,
            order,
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.arena.push(node);
        self.arena.len() - 1
    }

    /// Descent rule: the least `i` with `key < keys[i]`, or the last
    /// child when `key` is >= every separator. Keys equal to a
    /// separator therefore live in the right subtree.
    fn child_index(keys: &[ScalarValue], key: &ScalarValue) -> PlumeDBResult<usize> {
        let mut i = 0;
        while i < keys.len() {
            if key.compare(&keys[i])? == Ordering::Less {
                break;
            }
            i += 1;
        }
        Ok(i)
    }

    /// Leaf insertion point: first index whose key is >= `key`.
    fn leaf_position(keys: &[ScalarValue], key: &ScalarValue) -> PlumeDBResult<usize> {
        let mut i = 0;
        while i < keys.len() {
            if keys[i].compare(key)? == Ordering::Less {
                i += 1;
            } else {
                break;
            }
        }
        Ok(i)
    }

    /// Walks from the root to the leaf covering `key`, recording the
    /// `(node, child index)` path for later parent updates.
    fn find_leaf(&self, key: &ScalarValue) -> PlumeDBResult<(NodeId, Vec<(NodeId, usize)>)> {
        let mut path = Vec::new();
        let mut current = self.root;
        loop {
            match &self.arena[current] {
                Node::Internal { keys, children } => {
                    let idx = Self::child_index(keys, key)?;
                    path.push((current, idx));
                    current = children[idx];
                }
                Node::Leaf { .. } => return Ok((current, path)),
            }
        }
    }

    fn leftmost_leaf(&self) -> NodeId {
        let mut current = self.root;
        loop {
            match &self.arena[current] {
                Node::Internal { children, .. } => current = children[0],
                Node::Leaf { .. } => return current,
            }
        }
    }

    fn insert(&mut self, key: &ScalarValue, row_id: RowId) -> PlumeDBResult<()> {
        let order = self.order;
        let (leaf_id, path) = self.find_leaf(key)?;
        let overflow = match &mut self.arena[leaf_id] {
            Node::Leaf { keys, buckets, .. } => {
                let pos = Self::leaf_position(keys, key)?;
                if pos < keys.len() && keys[pos] == *key {
                    // duplicate key: fold the row id into the value bucket
                    buckets[pos].push(row_id);
                    false
                } else {
                    keys.insert(pos, key.clone());
                    buckets.insert(pos, vec![row_id]);
                    keys.len() >= order
                }
            }
            Node::Internal { .. } => {
                return Err(PlumeDBError::Internal(
                    "B+Tree descent ended on an internal node".to_string(),
                ))
            }
        };
        if overflow {
            self.split_leaf(leaf_id, path)?;
        }
        Ok(())
    }

    /// Moves keys/buckets from the midpoint onward into a new right
    /// leaf, links it into the leaf chain, and copies its first key up.
    fn split_leaf(&mut self, leaf_id: NodeId, path: Vec<(NodeId, usize)>) -> PlumeDBResult<()> {
        let (right_keys, right_buckets, old_next) = match &mut self.arena[leaf_id] {
            Node::Leaf { keys, buckets, next } => {
                let mid = keys.len() / 2;
                (keys.split_off(mid), buckets.split_off(mid), *next)
            }
            Node::Internal { .. } => {
                return Err(PlumeDBError::Internal(
                    "split_leaf called on an internal node".to_string(),
                ))
            }
        };
        let separator = right_keys[0].clone();
        let right_id = self.alloc(Node::Leaf {
            keys: right_keys,
            buckets: right_buckets,
            next: old_next,
        });
        if let Node::Leaf { next, .. } = &mut self.arena[leaf_id] {
            *next = Some(right_id);
        }
        self.insert_into_parent(separator, right_id, path)
    }

    /// Inserts `separator`/`right_id` into the parent recorded on the
    /// path, allocating a new root when the split node was the root.
    fn insert_into_parent(
        &mut self,
        separator: ScalarValue,
        right_id: NodeId,
        mut path: Vec<(NodeId, usize)>,
    ) -> PlumeDBResult<()> {
        let order = self.order;
        match path.pop() {
            None => {
                let left_id = self.root;
                self.root = self.alloc(Node::Internal {
                    keys: vec![separator],
                    children: vec![left_id, right_id],
                });
                Ok(())
            }
            Some((parent_id, child_idx)) => {
                let overflow = match &mut self.arena[parent_id] {
                    Node::Internal { keys, children } => {
                        keys.insert(child_idx, separator);
                        children.insert(child_idx + 1, right_id);
                        keys.len() >= order
                    }
                    Node::Leaf { .. } => {
                        return Err(PlumeDBError::Internal(
                            "leaf node recorded as a parent".to_string(),
                        ))
                    }
                };
                if overflow {
                    self.split_internal(parent_id, path)?;
                }
                Ok(())
            }
        }
    }

    /// Internal split: the midpoint key is lifted into the parent and
    /// retained in neither child.
    fn split_internal(&mut self, node_id: NodeId, path: Vec<(NodeId, usize)>) -> PlumeDBResult<()> {
        let (mid_key, right_keys, right_children) = match &mut self.arena[node_id] {
            Node::Internal { keys, children } => {
                let mid = keys.len() / 2;
                let right_keys = keys.split_off(mid + 1);
                let right_children = children.split_off(mid + 1);
                let mid_key = keys.pop().ok_or_else(|| {
                    PlumeDBError::Internal("internal split on an empty node".to_string())
                })?;
                (mid_key, right_keys, right_children)
            }
            Node::Leaf { .. } => {
                return Err(PlumeDBError::Internal(
                    "split_internal called on a leaf".to_string(),
                ))
            }
        };
        let right_id = self.alloc(Node::Internal {
            keys: right_keys,
            children: right_children,
        });
        self.insert_into_parent(mid_key, right_id, path)
    }

    fn search(&self, key: &ScalarValue) -> PlumeDBResult<Vec<RowId>> {
        let (leaf_id, _) = self.find_leaf(key)?;
        match &self.arena[leaf_id] {
            Node::Leaf { keys, buckets, .. } => {
                let pos = Self::leaf_position(keys, key)?;
                if pos < keys.len() && keys[pos] == *key {
                    Ok(buckets[pos].clone())
                } else {
                    Ok(Vec::new())
                }
            }
            Node::Internal { .. } => Err(PlumeDBError::Internal(
                "B+Tree descent ended on an internal node".to_string(),
            )),
        }
    }

    /// Walks the leaf chain from the starting leaf, filtering every key
    /// against the bounds. Leaves cover disjoint increasing ranges, so
    /// the walk runs to the end of the chain rather than short-circuiting.
    fn range_query(
        &self,
        start: Option<&ScalarValue>,
        start_inclusive: bool,
        end: Option<&ScalarValue>,
        end_inclusive: bool,
    ) -> PlumeDBResult<Vec<RowId>> {
        let mut current = match start {
            None => self.leftmost_leaf(),
            Some(key) => self.find_leaf(key)?.0,
        };
        let mut result = Vec::new();
        loop {
            match &self.arena[current] {
                Node::Leaf { keys, buckets, next } => {
                    for (i, key) in keys.iter().enumerate() {
                        let after_start = match start {
                            None => true,
                            Some(s) => {
                                let ord = key.compare(s)?;
                                ord == Ordering::Greater
                                    || (start_inclusive && ord == Ordering::Equal)
                            }
                        };
                        let before_end = match end {
                            None => true,
                            Some(e) => {
                                let ord = key.compare(e)?;
                                ord == Ordering::Less || (end_inclusive && ord == Ordering::Equal)
                            }
                        };
                        if after_start && before_end {
                            result.extend_from_slice(&buckets[i]);
                        }
                    }
                    match next {
                        Some(n) => current = *n,
                        None => break,
                    }
                }
                Node::Internal { .. } => {
                    return Err(PlumeDBError::Internal(
                        "leaf chain reached an internal node".to_string(),
                    ))
                }
            }
        }
        Ok(result)
    }

    fn all_keys(&self) -> Vec<ScalarValue> {
        let mut all = Vec::new();
        let mut current = Some(self.leftmost_leaf());
        while let Some(id) = current {
            if let Node::Leaf { keys, next, .. } = &self.arena[id] {
                all.extend(keys.iter().cloned());
                current = *next;
            } else {
                break;
            }
        }
        all
    }

    fn height(&self) -> usize {
        let mut height = 0;
        let mut current = self.root;
        while let Node::Internal { children, .. } = &self.arena[current] {
            current = children[0];
            height += 1;
        }
        height
    }
}

/// Ordered index over one attribute supporting equality, open-ended,
/// and closed range queries; self-balancing via node splitting. Bulk
/// loaded by repeated `insert`, then queried read-only.
#[derive(Debug)]
pub struct BTreeIndex {
    attribute: String,
    key_type: DataType,
    core: RwLock<BTreeCore>,
}

impl BTreeIndex {
    pub const DEFAULT_ORDER: usize = 10;

    /// `order` is the key count at which a node splits; values below 3
    /// cannot split meaningfully and are clamped.
    pub fn new(attribute: impl Into<String>, key_type: DataType, order: usize) -> Self {
        Self {
            attribute: attribute.into(),
            key_type,
            core: RwLock::new(BTreeCore::new(order.max(3))),
        }
    }

    pub fn order(&self) -> usize {
        self.core.read().order
    }

    /// Row ids of every key within the given bounds; either side may be
    /// unbounded, e.g. `50 < x <= 75` is
    /// `range_query(Some(&50.into()), false, Some(&75.into()), true)`.
    pub fn range_query(
        &self,
        start: Option<&ScalarValue>,
        start_inclusive: bool,
        end: Option<&ScalarValue>,
        end_inclusive: bool,
    ) -> PlumeDBResult<Vec<RowId>> {
        for bound in [start, end].into_iter().flatten() {
            check_key_type(bound, self.key_type, self.pretty_name())?;
        }
        self.core
            .read()
            .range_query(start, start_inclusive, end, end_inclusive)
    }

    /// Sorted distinct key sequence, collected along the leaf chain.
    pub fn all_keys(&self) -> Vec<ScalarValue> {
        self.core.read().all_keys()
    }

    /// Number of child hops from the root down to a leaf.
    pub fn height(&self) -> usize {
        self.core.read().height()
    }
}

impl Index for BTreeIndex {
    fn insert(&self, key: &ScalarValue, row_id: RowId) -> PlumeDBResult<()> {
        check_key_type(key, self.key_type, self.pretty_name())?;
        self.core.write().insert(key, row_id)
    }

    fn search(&self, key: &ScalarValue) -> PlumeDBResult<Vec<RowId>> {
        check_key_type(key, self.key_type, self.pretty_name())?;
        self.core.read().search(key)
    }

    fn evaluate(&self, node: &PredicateNode) -> PlumeDBResult<Vec<RowId>> {
        log::debug!(
            "Evaluating predicate using B+Tree index on attribute {} for operator {}",
            self.attribute,
            node.operator
        );
        let key = parse_predicate_value(node.value.as_deref(), self.key_type)?;
        match node.operator {
            Operator::Equals => self.search(&key),
            Operator::Lt => self.range_query(None, false, Some(&key), false),
            Operator::Gt => self.range_query(Some(&key), false, None, false),
            Operator::Range => {
                let second = node.second_value.as_deref().ok_or_else(|| {
                    PlumeDBError::MalformedPredicate(
                        "RANGE predicate is missing its second value".to_string(),
                    )
                })?;
                let end = ScalarValue::from_string(second, self.key_type)?;
                self.range_query(Some(&key), true, Some(&end), true)
            }
            op => Err(PlumeDBError::UnsupportedPredicate(format!(
                "{} does not support the {} operator",
                self.pretty_name(),
                op
            ))),
        }
    }

    fn supports(&self, op: Operator) -> bool {
        matches!(
            op,
            Operator::Equals | Operator::Lt | Operator::Gt | Operator::Range
        )
    }

    fn key_type(&self) -> DataType {
        self.key_type
    }

    fn attribute(&self) -> &str {
        &self.attribute
    }

    fn pretty_name(&self) -> &'static str {
        "B+Tree Index"
    }
}
