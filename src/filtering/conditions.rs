//! Predicate tree to `sea_orm` condition compilation.
//!
//! This is the only place that knows how each [`Operator`] maps onto a
//! storage expression. The mapping is an exhaustive match, so adding an
//! operator without a storage translation fails to compile.
//!
//! Columns are addressed by name with `Expr::col(Alias::new(..))`;
//! dot-qualified paths become table-qualified references against the
//! association's alias. Case-insensitive operators use `UPPER()` on both
//! sides, which works across `SQLite`, `PostgreSQL`, and `MySQL`.

use crate::filtering::ast::{FilterLeaf, Logic, Operator, Predicate};
use sea_orm::{
    Condition,
    sea_query::{Alias, Expr, Func, SimpleExpr},
};
use serde_json::Value;
use uuid::Uuid;

/// Compile a predicate tree into a `sea_orm::Condition`.
#[must_use]
pub fn compile(predicate: &Predicate) -> Condition {
    match predicate {
        Predicate::Leaf(leaf) => Condition::all().add(leaf_expr(leaf)),
        Predicate::Group { logic, children } => {
            let mut condition = match logic {
                Logic::And => Condition::all(),
                Logic::Or => Condition::any(),
            };
            for child in children {
                condition = match child {
                    Predicate::Leaf(leaf) => condition.add(leaf_expr(leaf)),
                    Predicate::Group { .. } => condition.add(compile(child)),
                };
            }
            condition
        }
    }
}

/// Column reference for a possibly dot-qualified field path.
fn column(leaf: &FilterLeaf) -> Expr {
    match leaf.field.association() {
        Some((assoc, col)) => Expr::col((Alias::new(assoc), Alias::new(col))),
        None => Expr::col(Alias::new(leaf.field.as_str())),
    }
}

fn leaf_expr(leaf: &FilterLeaf) -> SimpleExpr {
    let col = column(leaf);
    match leaf.op {
        Operator::Eq => match &leaf.value {
            Value::Null => col.is_null(),
            value => col.eq(scalar(value)),
        },
        Operator::Neq => match &leaf.value {
            Value::Null => col.is_not_null(),
            value => col.ne(scalar(value)),
        },
        Operator::Ieq => match leaf.value.as_str() {
            Some(text) => upper(col).eq(text.to_uppercase()),
            None => col.eq(scalar(&leaf.value)),
        },
        Operator::Gt => col.gt(scalar(&leaf.value)),
        Operator::Gte => col.gte(scalar(&leaf.value)),
        Operator::Lt => col.lt(scalar(&leaf.value)),
        Operator::Lte => col.lte(scalar(&leaf.value)),
        Operator::In => col.is_in(list(&leaf.value)),
        Operator::NotIn => col.is_not_in(list(&leaf.value)),
        Operator::Contains => col.like(format!("%{}%", text(&leaf.value))),
        Operator::NotContains => col.not_like(format!("%{}%", text(&leaf.value))),
        Operator::IContains => {
            upper(col).like(format!("%{}%", text(&leaf.value).to_uppercase()))
        }
        Operator::NotIContains => {
            upper(col).not_like(format!("%{}%", text(&leaf.value).to_uppercase()))
        }
        Operator::StartsWith => col.like(format!("{}%", text(&leaf.value))),
        Operator::NotStartsWith => col.not_like(format!("{}%", text(&leaf.value))),
        Operator::EndsWith => col.like(format!("%{}", text(&leaf.value))),
        Operator::NotEndsWith => col.not_like(format!("%{}", text(&leaf.value))),
        Operator::IsTrue => col.eq(true),
        Operator::IsFalse => col.eq(false),
    }
}

fn upper(col: Expr) -> SimpleExpr {
    SimpleExpr::FunctionCall(Func::upper(col))
}

/// Convert a JSON scalar into a `sea_query` value. UUID-shaped strings are
/// compared as UUIDs so backends with a native type match correctly.
fn scalar(value: &Value) -> sea_orm::sea_query::Value {
    match value {
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => {
            if let Some(int) = n.as_i64() {
                int.into()
            } else {
                n.as_f64().unwrap_or_default().into()
            }
        }
        Value::String(s) => {
            if let Ok(uuid) = Uuid::parse_str(s) {
                uuid.into()
            } else {
                s.clone().into()
            }
        }
        other => other.to_string().into(),
    }
}

fn list(value: &Value) -> Vec<sea_orm::sea_query::Value> {
    value
        .as_array()
        .map(|items| items.iter().map(scalar).collect())
        .unwrap_or_default()
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
