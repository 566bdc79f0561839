//! The normalized predicate tree shared by both request surfaces.
//!
//! Parsers produce this abstract form; the condition compiler turns it into
//! `sea_orm` query options. The operator set is a closed enum so "unknown
//! operator" is decided at parse time, not by runtime fallthrough.

use serde_json::Value;

/// The closed set of filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    /// Case-insensitive equality
    Ieq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Contains,
    /// Case-insensitive contains
    IContains,
    NotContains,
    NotIContains,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
    IsTrue,
    IsFalse,
}

impl Operator {
    /// Parse an operator keyword. Returns `None` for unknown keywords; the
    /// caller surfaces that as a `BadRequest`.
    #[must_use]
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword {
            "eq" => Some(Self::Eq),
            "neq" => Some(Self::Neq),
            "ieq" => Some(Self::Ieq),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "in" => Some(Self::In),
            "not_in" => Some(Self::NotIn),
            "contains" => Some(Self::Contains),
            "icontains" => Some(Self::IContains),
            "not_contains" => Some(Self::NotContains),
            "not_icontains" => Some(Self::NotIContains),
            "starts_with" => Some(Self::StartsWith),
            "not_starts_with" => Some(Self::NotStartsWith),
            "ends_with" => Some(Self::EndsWith),
            "not_ends_with" => Some(Self::NotEndsWith),
            "is_true" => Some(Self::IsTrue),
            "is_false" => Some(Self::IsFalse),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Ieq => "ieq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Contains => "contains",
            Self::IContains => "icontains",
            Self::NotContains => "not_contains",
            Self::NotIContains => "not_icontains",
            Self::StartsWith => "starts_with",
            Self::NotStartsWith => "not_starts_with",
            Self::EndsWith => "ends_with",
            Self::NotEndsWith => "not_ends_with",
            Self::IsTrue => "is_true",
            Self::IsFalse => "is_false",
        }
    }

    /// Operators whose value must be an array.
    #[must_use]
    pub const fn takes_list(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Operators that carry no meaningful value of their own.
    #[must_use]
    pub const fn is_standalone(self) -> bool {
        matches!(self, Self::IsTrue | Self::IsFalse)
    }
}

/// Composite logic connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

/// An internal, already-policy-checked field path. May be dot-qualified
/// (`artist.label`) to traverse an association.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(String);

impl FieldPath {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into `(association alias, terminal column)` when dot-qualified.
    #[must_use]
    pub fn association(&self) -> Option<(&str, &str)> {
        self.0.split_once('.')
    }

    #[must_use]
    pub fn is_dotted(&self) -> bool {
        self.0.contains('.')
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One filter leaf: field, operator, operand.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterLeaf {
    pub field: FieldPath,
    pub op: Operator,
    pub value: Value,
}

/// Normalized, recursive AND/OR structure of filter leaves.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Leaf(FilterLeaf),
    Group {
        logic: Logic,
        children: Vec<Predicate>,
    },
}

impl Predicate {
    /// The empty predicate: an AND of nothing, compiling to no constraint.
    #[must_use]
    pub fn empty() -> Self {
        Self::Group {
            logic: Logic::And,
            children: Vec::new(),
        }
    }

    /// A predicate that can never match: `key IN ()`. Used when an
    /// association-id lookup for a list filter matches zero rows, so the list
    /// degrades to an empty result instead of erroring.
    #[must_use]
    pub fn never(key_column: &str) -> Self {
        Self::Leaf(FilterLeaf {
            field: FieldPath::new(key_column),
            op: Operator::In,
            value: Value::Array(Vec::new()),
        })
    }

    #[must_use]
    pub fn leaf(field: impl Into<String>, op: Operator, value: Value) -> Self {
        Self::Leaf(FilterLeaf {
            field: FieldPath::new(field),
            op,
            value,
        })
    }

    /// AND-combine, flattening empty and singleton groups.
    #[must_use]
    pub fn and(children: Vec<Self>) -> Self {
        Self::group(Logic::And, children)
    }

    #[must_use]
    pub fn or(children: Vec<Self>) -> Self {
        Self::group(Logic::Or, children)
    }

    fn group(logic: Logic, mut children: Vec<Self>) -> Self {
        children.retain(|child| !child.is_empty());
        if children.len() == 1 {
            return children.pop().unwrap_or_else(Self::empty);
        }
        Self::Group { logic, children }
    }

    /// True when this predicate imposes no constraint.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Leaf(_) => false,
            Self::Group { children, .. } => children.iter().all(Self::is_empty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_operators() {
        assert_eq!(Operator::parse("eq"), Some(Operator::Eq));
        assert_eq!(Operator::parse("not_icontains"), Some(Operator::NotIContains));
        assert_eq!(Operator::parse("is_false"), Some(Operator::IsFalse));
    }

    #[test]
    fn test_parse_unknown_operator() {
        assert_eq!(Operator::parse("matches"), None);
        assert_eq!(Operator::parse("EQ"), None);
        assert_eq!(Operator::parse(""), None);
    }

    #[test]
    fn test_round_trip_keywords() {
        for keyword in [
            "eq", "neq", "ieq", "gt", "gte", "lt", "lte", "in", "not_in", "contains",
            "icontains", "not_contains", "not_icontains", "starts_with", "not_starts_with",
            "ends_with", "not_ends_with", "is_true", "is_false",
        ] {
            let op = Operator::parse(keyword).unwrap();
            assert_eq!(op.as_str(), keyword);
        }
    }

    #[test]
    fn test_field_path_association() {
        let path = FieldPath::new("artist.label");
        assert!(path.is_dotted());
        assert_eq!(path.association(), Some(("artist", "label")));

        let plain = FieldPath::new("price");
        assert!(!plain.is_dotted());
        assert_eq!(plain.association(), None);
    }

    #[test]
    fn test_empty_predicate() {
        assert!(Predicate::empty().is_empty());
        assert!(Predicate::and(vec![]).is_empty());
        assert!(Predicate::and(vec![Predicate::empty(), Predicate::empty()]).is_empty());
    }

    #[test]
    fn test_singleton_group_flattens() {
        let leaf = Predicate::leaf("price", Operator::Gte, json!(100));
        let combined = Predicate::and(vec![Predicate::empty(), leaf.clone()]);
        assert_eq!(combined, leaf);
    }

    #[test]
    fn test_never_is_not_empty() {
        let never = Predicate::never("id");
        assert!(!never.is_empty());
        match never {
            Predicate::Leaf(leaf) => {
                assert_eq!(leaf.op, Operator::In);
                assert_eq!(leaf.value, json!([]));
            }
            Predicate::Group { .. } => panic!("expected leaf"),
        }
    }
}
