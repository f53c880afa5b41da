use crate::catalog::DataType;
use crate::error::{PlumeDBError, PlumeDBResult};
use crate::index::{check_key_type, parse_predicate_value, Index, RowId};
use crate::plan::predicate::{Operator, PredicateNode};
use crate::utils::scalar::ScalarValue;
use comfy_table::Table;
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Directory depth ceiling. Doubling stops here and overflow chaining
/// takes over, which only matters for pathological key sets whose
/// hashes agree on the low `MAX_GLOBAL_DEPTH` bits.
pub const MAX_GLOBAL_DEPTH: u32 = 20;

type BucketId = usize;

#[derive(Debug)]
struct Bucket {
    local_depth: u32,
    entries: Vec<(ScalarValue, RowId)>,
    /// Overflow link, used only once the depth ceiling is reached.
    next: Option<BucketId>,
}

impl Bucket {
    fn new(local_depth: u32) -> Self {
        Self {
            local_depth,
            entries: Vec::new(),
            next: None,
        }
    }
}

#[derive(Debug)]
struct HashCore {
    global_depth: u32,
    bucket_size: usize,
    /// All buckets, overflow buckets included. Directory slots whose
    /// low `local_depth` bits agree share one primary bucket.
    buckets: Vec<Bucket>,
    directory: Vec<BucketId>,
}

impl HashCore {
    fn new(global_depth: u32, bucket_size: usize) -> Self {
        let size = 1usize << global_depth;
        let buckets = (0..size).map(|_| Bucket::new(global_depth)).collect();
        Self {
            global_depth,
            bucket_size,
            buckets,
            directory: (0..size).collect(),
        }
    }

    fn full_hash(key: &ScalarValue) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    fn dir_index(&self, key: &ScalarValue) -> usize {
        Self::full_hash(key) as usize & ((1usize << self.global_depth) - 1)
    }

    fn insert(&mut self, key: &ScalarValue, row_id: RowId) -> PlumeDBResult<()> {
        let slot = self.dir_index(key);
        let mut id = self.directory[slot];
        loop {
            if self.buckets[id].entries.len() < self.bucket_size {
                self.buckets[id].entries.push((key.clone(), row_id));
                return Ok(());
            }
            match self.buckets[id].next {
                Some(next) => id = next,
                None => break,
            }
        }

        // Whole chain is full. Split when the primary bucket still has
        // spare hash bits; double the directory first when it does not.
        // A chain whose entries all share the incoming key's full hash
        // (duplicate keys) can never be separated by deeper addressing,
        // so it overflows straight away.
        let primary = self.directory[slot];
        if self.chain_has_single_hash(primary, Self::full_hash(key)) {
            self.append_overflow(id, primary, key, row_id);
            return Ok(());
        }
        if self.buckets[primary].local_depth < self.global_depth {
            self.split(slot)?;
            return self.insert(key, row_id);
        }
        if self.global_depth < MAX_GLOBAL_DEPTH {
            self.double_directory();
            self.split(self.dir_index(key))?;
            return self.insert(key, row_id);
        }
        self.append_overflow(id, primary, key, row_id);
        Ok(())
    }

    fn chain_has_single_hash(&self, primary: BucketId, hash: u64) -> bool {
        let mut id = Some(primary);
        while let Some(current) = id {
            let bucket = &self.buckets[current];
            if bucket
                .entries
                .iter()
                .any(|(stored, _)| Self::full_hash(stored) != hash)
            {
                return false;
            }
            id = bucket.next;
        }
        true
    }

    fn append_overflow(
        &mut self,
        tail: BucketId,
        primary: BucketId,
        key: &ScalarValue,
        row_id: RowId,
    ) {
        let overflow = self.buckets.len();
        self.buckets
            .push(Bucket::new(self.buckets[primary].local_depth));
        self.buckets[tail].next = Some(overflow);
        self.buckets[overflow].entries.push((key.clone(), row_id));
    }

    /// Duplicates every directory entry and raises the global depth:
    /// slot `i + 2^old_depth` aliases slot `i` until a split repoints it.
    fn double_directory(&mut self) {
        let snapshot = self.directory.clone();
        self.directory.extend_from_slice(&snapshot);
        self.global_depth += 1;
    }

    /// Splits the primary bucket of `slot`: a sibling bucket takes over
    /// the directory slots whose newly significant bit is 1, and every
    /// entry of the old chain is re-inserted under the deeper addressing.
    fn split(&mut self, slot: usize) -> PlumeDBResult<()> {
        let primary = self.directory[slot];
        let old_local = self.buckets[primary].local_depth;

        let mut moved = Vec::new();
        let mut id = Some(primary);
        while let Some(current) = id {
            moved.append(&mut self.buckets[current].entries);
            id = self.buckets[current].next.take();
        }

        self.buckets[primary].local_depth = old_local + 1;
        let sibling = self.buckets.len();
        self.buckets.push(Bucket::new(old_local + 1));
        for i in 0..self.directory.len() {
            if self.directory[i] == primary && (i >> old_local) & 1 == 1 {
                self.directory[i] = sibling;
            }
        }

        for (key, row_id) in moved {
            self.insert(&key, row_id)?;
        }
        Ok(())
    }

    fn search(&self, key: &ScalarValue) -> Vec<RowId> {
        let mut result = Vec::new();
        let mut id = Some(self.directory[self.dir_index(key)]);
        while let Some(current) = id {
            let bucket = &self.buckets[current];
            for (stored, row_id) in &bucket.entries {
                if stored == key {
                    result.push(*row_id);
                }
            }
            id = bucket.next;
        }
        result
    }

    fn entry_count(&self) -> usize {
        self.buckets.iter().map(|b| b.entries.len()).sum()
    }
}

/// Dynamic hash index: a directory of buckets addressed by the low
/// `global_depth` bits of a key's hash. A full bucket splits by local
/// depth; when its local depth has caught up with the global depth the
/// directory doubles, up to [`MAX_GLOBAL_DEPTH`].
#[derive(Debug)]
pub struct ExtendibleHashIndex {
    attribute: String,
    key_type: DataType,
    core: RwLock<HashCore>,
}

impl ExtendibleHashIndex {
    pub const DEFAULT_GLOBAL_DEPTH: u32 = 10;
    pub const DEFAULT_BUCKET_SIZE: usize = 4;

    pub fn new(
        attribute: impl Into<String>,
        key_type: DataType,
        initial_global_depth: u32,
        bucket_size: usize,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            key_type,
            core: RwLock::new(HashCore::new(
                initial_global_depth.min(MAX_GLOBAL_DEPTH),
                bucket_size.max(1),
            )),
        }
    }

    pub fn global_depth(&self) -> u32 {
        self.core.read().global_depth
    }

    /// Local depth of the bucket addressed by directory slot `slot`.
    pub fn local_depth(&self, slot: usize) -> Option<u32> {
        let core = self.core.read();
        let id = *core.directory.get(slot)?;
        Some(core.buckets[id].local_depth)
    }

    /// Directory size, i.e. `2^global_depth`.
    pub fn bucket_count(&self) -> usize {
        self.core.read().directory.len()
    }

    /// Total number of stored (key, row id) pairs across all buckets.
    pub fn entry_count(&self) -> usize {
        self.core.read().entry_count()
    }

    /// Renders the directory for small-scale debugging.
    pub fn directory_table(&self) -> Table {
        let core = self.core.read();
        let mut table = Table::new();
        table.set_header(vec!["slot", "bucket", "local depth", "entries"]);
        for (slot, id) in core.directory.iter().enumerate() {
            let mut entries = Vec::new();
            let mut current = Some(*id);
            while let Some(b) = current {
                let bucket = &core.buckets[b];
                entries.extend(bucket.entries.iter().map(|(k, r)| format!("{k}:{r}")));
                current = bucket.next;
            }
            table.add_row(vec![
                format!("{slot:b}"),
                id.to_string(),
                core.buckets[*id].local_depth.to_string(),
                entries.join(", "),
            ]);
        }
        table
    }

    pub fn print_table(&self) {
        println!("{}", self.directory_table());
    }
}

impl Index for ExtendibleHashIndex {
    fn insert(&self, key: &ScalarValue, row_id: RowId) -> PlumeDBResult<()> {
        check_key_type(key, self.key_type, self.pretty_name())?;
        self.core.write().insert(key, row_id)
    }

    fn search(&self, key: &ScalarValue) -> PlumeDBResult<Vec<RowId>> {
        check_key_type(key, self.key_type, self.pretty_name())?;
        Ok(self.core.read().search(key))
    }

    fn evaluate(&self, node: &PredicateNode) -> PlumeDBResult<Vec<RowId>> {
        log::debug!(
            "Evaluating predicate using hash index on attribute {} for operator {}",
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
        "Hash Index"
    }
}
