use plumedb::catalog::{Catalog, DataType};
use plumedb::error::PlumeDBError;
use plumedb::execution::evaluator::QueryEvaluator;
use plumedb::index::bitmap_index::BitmapIndex;
use plumedb::index::btree_index::BTreeIndex;
use plumedb::index::hash_index::ExtendibleHashIndex;
use plumedb::index::{Index, RowId};
use plumedb::plan::predicate::{Operator, PredicateNode};
use plumedb::utils::scalar::ScalarValue;
use rand::Rng;
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A small employees table indexed three ways: bitmap on dept, B+Tree
/// on age, hash on id. Rows 0..=7.
fn employees() -> QueryEvaluator {
    init_logging();
    let max_row_id: RowId = 7;

    let dept = BitmapIndex::new("dept", DataType::Varchar, max_row_id);
    let age = BTreeIndex::new("age", DataType::Int32, 4);
    let id = ExtendibleHashIndex::new("id", DataType::Int32, 2, 2);

    let rows: [(&str, i32, i32); 8] = [
        ("HR", 31, 1001),
        ("ENG", 25, 1002),
        ("SALES", 40, 1003),
        ("HR", 25, 1004),
        ("ENG", 52, 1005),
        ("ENG", 33, 1006),
        ("SALES", 29, 1007),
        ("HR", 47, 1008),
    ];
    for (row, (d, a, i)) in rows.into_iter().enumerate() {
        let row = row as RowId;
        dept.insert(&d.into(), row).unwrap();
        age.insert(&a.into(), row).unwrap();
        id.insert(&i.into(), row).unwrap();
    }

    let mut catalog = Catalog::new();
    catalog.register(Arc::new(dept));
    catalog.register(Arc::new(age));
    catalog.register(Arc::new(id));
    QueryEvaluator::new(Arc::new(catalog), max_row_id)
}

fn eq(attribute: &str, value: &str) -> PredicateNode {
    PredicateNode::leaf(Operator::Equals, attribute, value)
}

#[test]
fn bitmap_scenario_from_the_dept_index() {
    init_logging();
    let dept = BitmapIndex::new("dept", DataType::Varchar, 7);
    dept.insert(&"HR".into(), 0).unwrap();
    dept.insert(&"HR".into(), 3).unwrap();
    dept.insert(&"ENG".into(), 1).unwrap();

    let mut catalog = Catalog::new();
    catalog.register(Arc::new(dept));
    let evaluator = QueryEvaluator::new(Arc::new(catalog), 7);

    assert_eq!(evaluator.evaluate(&eq("dept", "HR")).unwrap(), vec![0, 3]);
    assert_eq!(
        evaluator
            .evaluate(&PredicateNode::not(eq("dept", "HR")))
            .unwrap(),
        vec![1, 2, 4, 5, 6, 7]
    );
}

#[test]
fn heterogeneous_indexes_compose_under_booleans() {
    let evaluator = employees();

    // dept = ENG AND age RANGE [25, 35]
    let node = PredicateNode::and(eq("dept", "ENG"), PredicateNode::range("age", "25", "35"));
    assert_eq!(evaluator.evaluate(&node).unwrap(), vec![1, 5]);

    // id = 1003 OR age > 45
    let node = PredicateNode::or(
        eq("id", "1003"),
        PredicateNode::leaf(Operator::Gt, "age", "45"),
    );
    assert_eq!(evaluator.evaluate(&node).unwrap(), vec![2, 4, 7]);

    // NOT (dept = HR OR dept = ENG) -> the SALES rows
    let node = PredicateNode::not(PredicateNode::or(eq("dept", "HR"), eq("dept", "ENG")));
    assert_eq!(evaluator.evaluate(&node).unwrap(), vec![2, 6]);

    // age < 30 AND NOT dept = SALES
    let node = PredicateNode::and(
        PredicateNode::leaf(Operator::Lt, "age", "30"),
        PredicateNode::not(eq("dept", "SALES")),
    );
    let mut got = evaluator.evaluate(&node).unwrap();
    got.sort_unstable();
    assert_eq!(got, vec![1, 3]);
}

#[test]
fn operator_not_served_by_any_index_is_reported() {
    let evaluator = employees();
    // the only index on `id` is the hash index; ranges cannot be served
    let node = PredicateNode::range("id", "1001", "1005");
    assert!(matches!(
        evaluator.evaluate(&node),
        Err(PlumeDBError::NotSupport(_))
    ));
}

#[test]
fn type_mismatch_surfaces_from_parsing() {
    let evaluator = employees();
    let node = PredicateNode::leaf(Operator::Equals, "age", "not-a-number");
    assert!(matches!(
        evaluator.evaluate(&node),
        Err(PlumeDBError::TypeMismatch(_))
    ));
}

#[test]
fn membership_holds_across_all_index_types() {
    init_logging();
    let mut rng = rand::rng();
    let max_row_id: RowId = 999;

    let bitmap = BitmapIndex::new("k", DataType::Int32, max_row_id);
    let btree = BTreeIndex::new("k", DataType::Int32, 5);
    let hash = ExtendibleHashIndex::new("k", DataType::Int32, 2, 3);

    let mut pairs: Vec<(i32, RowId)> = Vec::new();
    for row in 0..=max_row_id {
        let key = rng.random_range(0..100);
        pairs.push((key, row));
        bitmap.insert(&key.into(), row).unwrap();
        btree.insert(&key.into(), row).unwrap();
        hash.insert(&key.into(), row).unwrap();
    }

    for (key, row) in &pairs {
        for index in [&bitmap as &dyn Index, &btree, &hash] {
            let found = index.search(&(*key).into()).unwrap();
            assert!(
                found.contains(row),
                "{} lost ({key}, {row})",
                index.pretty_name()
            );
        }
    }
    // hash loses nothing across splits and directory growth
    assert_eq!(hash.entry_count(), pairs.len());
}

#[test]
fn search_results_agree_across_index_types() {
    init_logging();
    let mut rng = rand::rng();
    let max_row_id: RowId = 499;

    let bitmap = BitmapIndex::new("k", DataType::Int32, max_row_id);
    let btree = BTreeIndex::new("k", DataType::Int32, 4);
    let hash = ExtendibleHashIndex::new("k", DataType::Int32, 3, 4);

    for row in 0..=max_row_id {
        let key = rng.random_range(0..50);
        bitmap.insert(&key.into(), row).unwrap();
        btree.insert(&key.into(), row).unwrap();
        hash.insert(&key.into(), row).unwrap();
    }

    for key in 0..50 {
        let key = ScalarValue::from(key);
        let from_bitmap = bitmap.search(&key).unwrap();
        let mut from_btree = btree.search(&key).unwrap();
        let mut from_hash = hash.search(&key).unwrap();
        from_btree.sort_unstable();
        from_hash.sort_unstable();
        assert_eq!(from_bitmap, from_btree);
        assert_eq!(from_bitmap, from_hash);
    }
}

#[test]
fn evaluator_range_agrees_with_brute_force() {
    init_logging();
    let mut rng = rand::rng();
    let max_row_id: RowId = 299;

    let btree = BTreeIndex::new("score", DataType::Int32, 6);
    let mut keys: Vec<i32> = Vec::new();
    for row in 0..=max_row_id {
        let key = rng.random_range(0..1000);
        keys.push(key);
        btree.insert(&key.into(), row).unwrap();
    }
    let mut catalog = Catalog::new();
    catalog.register(Arc::new(btree));
    let evaluator = QueryEvaluator::new(Arc::new(catalog), max_row_id);

    let node = PredicateNode::range("score", "250", "750");
    let mut got = evaluator.evaluate(&node).unwrap();
    got.sort_unstable();
    let want: Vec<RowId> = keys
        .iter()
        .enumerate()
        .filter(|(_, k)| (250..=750).contains(*k))
        .map(|(row, _)| row as RowId)
        .collect();
    assert_eq!(got, want);

    // NOT over the same range complements against 0..=max_row_id
    let not = PredicateNode::not(PredicateNode::range("score", "250", "750"));
    let got_not = evaluator.evaluate(&not).unwrap();
    let want_not: Vec<RowId> = (0..=max_row_id)
        .filter(|row| !want.contains(row))
        .collect();
    assert_eq!(got_not, want_not);
}

#[test]
fn date_attribute_round_trip() {
    init_logging();
    let hired = BTreeIndex::new("hired", DataType::Date, 4);
    let days = ["2021-06-01", "2019-01-15", "2020-03-10", "2022-11-30"];
    for (row, day) in days.iter().enumerate() {
        let key = ScalarValue::from_string(day, DataType::Date).unwrap();
        hired.insert(&key, row as RowId).unwrap();
    }
    let mut catalog = Catalog::new();
    catalog.register(Arc::new(hired));
    let evaluator = QueryEvaluator::new(Arc::new(catalog), 3);

    let node = PredicateNode::leaf(Operator::Lt, "hired", "2021-01-01");
    let mut got = evaluator.evaluate(&node).unwrap();
    got.sort_unstable();
    assert_eq!(got, vec![1, 2]);
}
