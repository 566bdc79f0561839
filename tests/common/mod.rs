//! In-memory storage adapter for integration tests.
//!
//! Holds the primary resource's rows plus any related tables as seeded JSON
//! and evaluates compiled plans directly against the predicate tree, so the
//! full request pipeline runs without a database.

use async_trait::async_trait;
use crudshape::{
    ApiError, AssociationLookup, JsonRow, Logic, Operator, Predicate, QueryPlan, SortDirection,
    StorageAdapter,
};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Mutex;

pub struct MemoryAdapter {
    rows: Mutex<Vec<JsonRow>>,
    related: Vec<(String, Vec<JsonRow>)>,
}

impl MemoryAdapter {
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows: Mutex::new(rows.into_iter().map(into_object).collect()),
            related: Vec::new(),
        }
    }

    #[allow(dead_code)]
    pub fn with_related(mut self, table: &str, rows: Vec<Value>) -> Self {
        self.related
            .push((table.to_string(), rows.into_iter().map(into_object).collect()));
        self
    }

    fn table(&self, name: &str) -> Option<&Vec<JsonRow>> {
        self.related
            .iter()
            .find(|(table, _)| table == name)
            .map(|(_, rows)| rows)
    }

    /// Attach configured includes as nested objects, the way a join with a
    /// nested projection would return them.
    fn attach_includes(&self, row: &mut JsonRow, plan: &QueryPlan) {
        for include in &plan.includes {
            let Some(fk_column) = &include.fk_column else {
                continue;
            };
            let Some(fk) = row.get(fk_column).cloned() else {
                continue;
            };
            let child = self.table(&include.model).and_then(|rows| {
                rows.iter()
                    .find(|child| child.get(&include.pk_column) == Some(&fk))
            });
            let nested = match child {
                Some(child) => {
                    let mut nested = child.clone();
                    if let Some(attributes) = &include.attributes {
                        nested.retain(|key, _| attributes.iter().any(|attr| attr == key));
                    }
                    Value::Object(nested)
                }
                None => Value::Null,
            };
            row.insert(include.as_alias.clone(), nested);
        }
    }

    fn matching(&self, plan: &QueryPlan) -> Vec<JsonRow> {
        let rows = self.rows.lock().unwrap();
        let mut matched: Vec<JsonRow> = rows
            .iter()
            .cloned()
            .map(|mut row| {
                self.attach_includes(&mut row, plan);
                row
            })
            .filter(|row| evaluate(&plan.predicate, row))
            .collect();
        sort_rows(&mut matched, plan);
        matched
    }
}

#[async_trait]
impl AssociationLookup for MemoryAdapter {
    async fn resolve_external(
        &self,
        table: &str,
        id_field: &str,
        value: &Value,
    ) -> Result<Option<Value>, ApiError> {
        Ok(self.table(table).and_then(|rows| {
            rows.iter()
                .find(|row| row.get(id_field) == Some(value))
                .and_then(|row| row.get("id").cloned())
        }))
    }

    async fn resolve_internal(
        &self,
        table: &str,
        id_field: &str,
        key: &Value,
    ) -> Result<Option<Value>, ApiError> {
        Ok(self.table(table).and_then(|rows| {
            rows.iter()
                .find(|row| row.get("id") == Some(key))
                .and_then(|row| row.get(id_field).cloned())
        }))
    }
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
    async fn find_and_count_all(&self, plan: &QueryPlan) -> Result<(Vec<JsonRow>, u64), ApiError> {
        let matched = self.matching(plan);
        let count = matched.len() as u64;
        let page: Vec<JsonRow> = matched
            .into_iter()
            .skip(usize::try_from(plan.offset()).unwrap())
            .take(usize::try_from(plan.limit()).unwrap())
            .map(|row| project(row, plan))
            .collect();
        Ok((page, count))
    }

    async fn find_one(&self, plan: &QueryPlan) -> Result<Option<JsonRow>, ApiError> {
        Ok(self
            .matching(plan)
            .into_iter()
            .next()
            .map(|row| project(row, plan)))
    }

    async fn create(&self, values: JsonRow) -> Result<JsonRow, ApiError> {
        let mut rows = self.rows.lock().unwrap();
        let mut row = values;
        if !row.contains_key("id") {
            row.insert("id".to_string(), Value::from(rows.len() as u64 + 1));
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, plan: &QueryPlan, values: JsonRow) -> Result<Option<JsonRow>, ApiError> {
        let mut rows = self.rows.lock().unwrap();
        for row in rows.iter_mut() {
            if evaluate(&plan.predicate, row) {
                for (key, value) in values {
                    row.insert(key, value);
                }
                return Ok(Some(row.clone()));
            }
        }
        Ok(None)
    }

    async fn destroy(&self, plan: &QueryPlan) -> Result<u64, ApiError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| !evaluate(&plan.predicate, row));
        Ok((before - rows.len()) as u64)
    }
}

fn into_object(value: Value) -> JsonRow {
    match value {
        Value::Object(object) => object,
        other => panic!("seed rows must be JSON objects, got {other}"),
    }
}

fn project(mut row: JsonRow, plan: &QueryPlan) -> JsonRow {
    if let Some(attributes) = &plan.attributes {
        let nested: Vec<String> = plan
            .includes
            .iter()
            .map(|include| include.as_alias.clone())
            .collect();
        row.retain(|key, _| attributes.iter().any(|attr| attr == key) || nested.contains(key));
    }
    row
}

/// Look a (possibly dot-qualified) field up in a row with attached includes.
fn field_value<'a>(row: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    match field.split_once('.') {
        Some((assoc, column)) => row.get(assoc)?.as_object()?.get(column),
        None => row.get(field),
    }
}

pub fn evaluate(predicate: &Predicate, row: &Map<String, Value>) -> bool {
    match predicate {
        Predicate::Group { logic, children } => match logic {
            Logic::And => children.iter().all(|child| evaluate(child, row)),
            Logic::Or => {
                !children.is_empty() && children.iter().any(|child| evaluate(child, row))
            }
        },
        Predicate::Leaf(leaf) => {
            let actual = field_value(row, leaf.field.as_str()).unwrap_or(&Value::Null);
            evaluate_leaf(leaf.op, actual, &leaf.value)
        }
    }
}

fn evaluate_leaf(op: Operator, actual: &Value, operand: &Value) -> bool {
    match op {
        Operator::Eq => actual == operand,
        Operator::Neq => actual != operand,
        Operator::Ieq => match (actual.as_str(), operand.as_str()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => actual == operand,
        },
        Operator::Gt => compare(actual, operand) == Some(Ordering::Greater),
        Operator::Gte => matches!(
            compare(actual, operand),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::Lt => compare(actual, operand) == Some(Ordering::Less),
        Operator::Lte => matches!(
            compare(actual, operand),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Operator::In => members(operand).iter().any(|member| member == actual),
        Operator::NotIn => !members(operand).iter().any(|member| member == actual),
        Operator::Contains => str_test(actual, operand, |a, b| a.contains(b)),
        Operator::IContains => {
            str_test(actual, operand, |a, b| a.to_lowercase().contains(&b.to_lowercase()))
        }
        Operator::NotContains => !str_test(actual, operand, |a, b| a.contains(b)),
        Operator::NotIContains => {
            !str_test(actual, operand, |a, b| a.to_lowercase().contains(&b.to_lowercase()))
        }
        Operator::StartsWith => str_test(actual, operand, |a, b| a.starts_with(b)),
        Operator::NotStartsWith => !str_test(actual, operand, |a, b| a.starts_with(b)),
        Operator::EndsWith => str_test(actual, operand, |a, b| a.ends_with(b)),
        Operator::NotEndsWith => !str_test(actual, operand, |a, b| a.ends_with(b)),
        Operator::IsTrue => actual == &Value::Bool(true),
        Operator::IsFalse => actual == &Value::Bool(false),
    }
}

fn members(operand: &Value) -> Vec<Value> {
    operand.as_array().cloned().unwrap_or_default()
}

fn str_test(actual: &Value, operand: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    match (actual.as_str(), operand.as_str()) {
        (Some(a), Some(b)) => test(a, b),
        _ => false,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (a.as_str(), b.as_str()) {
        return Some(a.cmp(b));
    }
    None
}

fn sort_rows(rows: &mut [JsonRow], plan: &QueryPlan) {
    rows.sort_by(|a, b| {
        for key in &plan.sort {
            let left = field_value(a, key.path.as_str()).unwrap_or(&Value::Null);
            let right = field_value(b, key.path.as_str()).unwrap_or(&Value::Null);
            let ordering = compare(left, right).unwrap_or(Ordering::Equal);
            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}
