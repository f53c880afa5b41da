use strum::Display;

/// Operators a predicate node may carry. The first four appear on leaf
/// predicates, the last three on boolean combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Operator {
    #[strum(serialize = "EQUALS")]
    Equals,
    #[strum(serialize = "LT")]
    Lt,
    #[strum(serialize = "GT")]
    Gt,
    #[strum(serialize = "RANGE")]
    Range,
    #[strum(serialize = "AND")]
    And,
    #[strum(serialize = "OR")]
    Or,
    #[strum(serialize = "NOT")]
    Not,
}

impl Operator {
    pub fn is_boolean(&self) -> bool {
        matches!(self, Operator::And | Operator::Or | Operator::Not)
    }
}

/// One node of the predicate tree handed over by the (external) parser.
///
/// A leaf carries `attribute`, `value` and, for RANGE, `second_value`;
/// a boolean node carries `left` and (except NOT) `right`. Values stay
/// textual here; each index parses them against its declared key type.
#[derive(Debug, Clone)]
pub struct PredicateNode {
    pub operator: Operator,
    pub attribute: Option<String>,
    pub value: Option<String>,
    pub second_value: Option<String>,
    pub left: Option<Box<PredicateNode>>,
    pub right: Option<Box<PredicateNode>>,
}

impl PredicateNode {
    pub fn leaf(operator: Operator, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            operator,
            attribute: Some(attribute.into()),
            value: Some(value.into()),
            second_value: None,
            left: None,
            right: None,
        }
    }

    /// Closed range `[low, high]` on `attribute`.
    pub fn range(
        attribute: impl Into<String>,
        low: impl Into<String>,
        high: impl Into<String>,
    ) -> Self {
        Self {
            operator: Operator::Range,
            attribute: Some(attribute.into()),
            value: Some(low.into()),
            second_value: Some(high.into()),
            left: None,
            right: None,
        }
    }

    pub fn and(left: PredicateNode, right: PredicateNode) -> Self {
        Self::boolean(Operator::And, left, Some(right))
    }

    pub fn or(left: PredicateNode, right: PredicateNode) -> Self {
        Self::boolean(Operator::Or, left, Some(right))
    }

    pub fn not(child: PredicateNode) -> Self {
        Self::boolean(Operator::Not, child, None)
    }

    fn boolean(operator: Operator, left: PredicateNode, right: Option<PredicateNode>) -> Self {
        Self {
            operator,
            attribute: None,
            value: None,
            second_value: None,
            left: Some(Box::new(left)),
            right: right.map(Box::new),
        }
    }

    pub fn is_leaf(&self) -> bool {
        !self.operator.is_boolean()
    }
}

#[cfg(test)]
mod tests {
    use super::{Operator, PredicateNode};

    #[test]
    fn leaf_and_boolean_shapes() {
        let eq = PredicateNode::leaf(Operator::Equals, "dept", "HR");
        assert!(eq.is_leaf());
        assert_eq!(eq.attribute.as_deref(), Some("dept"));

        let tree = PredicateNode::and(eq, PredicateNode::range("age", "30", "40"));
        assert!(!tree.is_leaf());
        assert!(tree.left.is_some() && tree.right.is_some());

        let not = PredicateNode::not(PredicateNode::leaf(Operator::Equals, "dept", "ENG"));
        assert!(not.left.is_some() && not.right.is_none());
    }

    #[test]
    fn operator_display_matches_wire_names() {
        assert_eq!(Operator::Equals.to_string(), "EQUALS");
        assert_eq!(Operator::Range.to_string(), "RANGE");
        assert_eq!(Operator::Not.to_string(), "NOT");
    }
}
