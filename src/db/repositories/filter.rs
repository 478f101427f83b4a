use sea_orm::sea_query::{Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{ColumnTrait, Condition, Order, QueryFilter, QueryOrder, QuerySelect, Select, Value};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use super::crud::Resource;
use crate::db::RepoError;

/// Upper bound on `limit` accepted from callers.
pub const MAX_LIMIT: u64 = 1000;

/// A `where` clause: field names map to a literal, `null`, or an operator object.
pub type Where = Map<String, JsonValue>;

/// Query options accepted by list endpoints, e.g.
/// `{"where": {"age": {"gte": 30}}, "order": "lastName DESC", "limit": 10, "include": ["movies"]}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Filter {
    #[serde(rename = "where")]
    pub where_clause: Option<Where>,

    pub order: Option<OrderSpec>,

    pub limit: Option<u64>,

    #[serde(alias = "offset")]
    pub skip: Option<u64>,

    pub include: Option<IncludeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OrderSpec {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IncludeSpec {
    One(IncludeItem),
    Many(Vec<IncludeItem>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IncludeItem {
    Name(String),
    Relation { relation: String },
}

impl IncludeItem {
    fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Relation { relation: name } => name,
        }
    }
}

/// Relation names requested by a filter, checked against what the entity offers.
#[derive(Debug, Clone, Default)]
pub struct Inclusions(Vec<&'static str>);

impl Inclusions {
    #[must_use]
    pub fn has(&self, relation: &str) -> bool {
        self.0.iter().any(|name| *name == relation)
    }
}

impl Filter {
    pub fn parse(raw: &str) -> Result<Self, RepoError> {
        serde_json::from_str(raw).map_err(|e| RepoError::invalid_filter(e.to_string()))
    }

    #[must_use]
    pub fn from_where(where_clause: Where) -> Self {
        Self {
            where_clause: Some(where_clause),
            ..Self::default()
        }
    }

    fn include_names(&self) -> Vec<&str> {
        match &self.include {
            None => Vec::new(),
            Some(IncludeSpec::One(item)) => vec![item.name()],
            Some(IncludeSpec::Many(items)) => items.iter().map(IncludeItem::name).collect(),
        }
    }

    pub fn inclusions(&self, allowed: &[&'static str]) -> Result<Inclusions, RepoError> {
        let mut names = Vec::new();
        for requested in self.include_names() {
            let Some(known) = allowed.iter().find(|name| **name == requested) else {
                return Err(RepoError::invalid_filter(format!(
                    "Relation \"{requested}\" is not defined"
                )));
            };
            if !names.contains(known) {
                names.push(*known);
            }
        }
        Ok(Inclusions(names))
    }

    /// Applies `where`, `order`, `limit` and `skip` to a select.
    pub fn apply<E: Resource>(&self, mut select: Select<E>) -> Result<Select<E>, RepoError> {
        if let Some(where_clause) = &self.where_clause {
            select = select.filter(condition::<E>(where_clause)?);
        }

        for (column, order) in self.order_by::<E>()? {
            select = select.order_by(column, order);
        }

        if let Some(limit) = self.limit {
            if limit > MAX_LIMIT {
                return Err(RepoError::invalid_filter(format!(
                    "limit must not exceed {MAX_LIMIT}"
                )));
            }
            select = select.limit(limit);
        }

        if let Some(skip) = self.skip {
            select = select.offset(skip);
        }

        Ok(select)
    }

    fn order_by<E: Resource>(&self) -> Result<Vec<(E::Column, Order)>, RepoError> {
        let clauses: Vec<&str> = match &self.order {
            None => return Ok(Vec::new()),
            Some(OrderSpec::One(clause)) => vec![clause.as_str()],
            Some(OrderSpec::Many(clauses)) => clauses.iter().map(String::as_str).collect(),
        };

        clauses
            .into_iter()
            .map(|clause| {
                let mut parts = clause.split_whitespace();
                let field = parts.next().unwrap_or_default();
                let column = E::column(field).ok_or_else(|| unknown_field(E::NAME, field))?;
                let order = match parts.next().map(str::to_ascii_uppercase).as_deref() {
                    None | Some("ASC") => Order::Asc,
                    Some("DESC") => Order::Desc,
                    Some(other) => {
                        return Err(RepoError::invalid_filter(format!(
                            "Invalid order direction \"{other}\" for \"{field}\""
                        )));
                    }
                };
                if parts.next().is_some() {
                    return Err(RepoError::invalid_filter(format!(
                        "Invalid order clause \"{clause}\""
                    )));
                }
                Ok((column, order))
            })
            .collect()
    }
}

/// Builds a condition from a `where` clause. Top-level keys are combined with AND.
pub fn condition<E: Resource>(where_clause: &Where) -> Result<Condition, RepoError> {
    let mut cond = Condition::all();
    for (key, value) in where_clause {
        cond = match key.as_str() {
            "and" => cond.add(group::<E>(Condition::all(), value)?),
            "or" => cond.add(group::<E>(Condition::any(), value)?),
            field => {
                let column = E::column(field).ok_or_else(|| unknown_field(E::NAME, field))?;
                cond.add(field_condition(column, field, value)?)
            }
        };
    }
    Ok(cond)
}

fn group<E: Resource>(mut combined: Condition, value: &JsonValue) -> Result<Condition, RepoError> {
    let JsonValue::Array(clauses) = value else {
        return Err(RepoError::invalid_filter("\"and\"/\"or\" expect an array of clauses"));
    };
    for clause in clauses {
        let JsonValue::Object(clause) = clause else {
            return Err(RepoError::invalid_filter("\"and\"/\"or\" clauses must be objects"));
        };
        combined = combined.add(condition::<E>(clause)?);
    }
    Ok(combined)
}

fn field_condition<C: ColumnTrait>(
    column: C,
    field: &str,
    value: &JsonValue,
) -> Result<Condition, RepoError> {
    let JsonValue::Object(operators) = value else {
        return Ok(Condition::all().add(equals(column, field, value)?));
    };

    let mut cond = Condition::all();
    for (op, operand) in operators {
        let expr = match op.as_str() {
            "eq" => equals(column, field, operand)?,
            "neq" if operand.is_null() => column.is_not_null(),
            "neq" => column.ne(scalar(field, operand)?),
            "gt" => column.gt(scalar(field, operand)?),
            "gte" => column.gte(scalar(field, operand)?),
            "lt" => column.lt(scalar(field, operand)?),
            "lte" => column.lte(scalar(field, operand)?),
            "inq" => column.is_in(list(field, operand)?),
            "nin" => column.is_not_in(list(field, operand)?),
            "like" => column.like(pattern(field, operand)?.as_str()),
            "nlike" => column.not_like(pattern(field, operand)?.as_str()),
            other => {
                return Err(RepoError::invalid_filter(format!(
                    "Unknown operator \"{other}\" on \"{field}\""
                )));
            }
        };
        cond = cond.add(expr);
    }
    Ok(cond)
}

fn equals<C: ColumnTrait>(column: C, field: &str, value: &JsonValue) -> Result<SimpleExpr, RepoError> {
    if value.is_null() {
        Ok(column.is_null())
    } else {
        Ok(column.eq(scalar(field, value)?))
    }
}

fn scalar(field: &str, value: &JsonValue) -> Result<Value, RepoError> {
    match value {
        JsonValue::String(s) => Ok(Value::from(s.clone())),
        JsonValue::Bool(b) => Ok(Value::from(*b)),
        JsonValue::Number(n) => n
            .as_i64()
            .map(Value::from)
            .or_else(|| n.as_f64().map(Value::from))
            .ok_or_else(|| RepoError::invalid_filter(format!("Number out of range on \"{field}\""))),
        _ => Err(RepoError::invalid_filter(format!(
            "Unsupported value for \"{field}\""
        ))),
    }
}

fn list(field: &str, value: &JsonValue) -> Result<Vec<Value>, RepoError> {
    let JsonValue::Array(items) = value else {
        return Err(RepoError::invalid_filter(format!(
            "\"inq\"/\"nin\" on \"{field}\" expect an array"
        )));
    };
    items.iter().map(|item| scalar(field, item)).collect()
}

fn pattern(field: &str, value: &JsonValue) -> Result<String, RepoError> {
    value.as_str().map(str::to_owned).ok_or_else(|| {
        RepoError::invalid_filter(format!("\"like\" on \"{field}\" expects a string"))
    })
}

fn unknown_field(entity: &str, field: &str) -> RepoError {
    RepoError::invalid_filter(format!("Unknown field \"{field}\" on {entity}"))
}

/// Escapes `%`, `_` and the escape character itself so `input` matches literally.
#[must_use]
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive "starts with" on a text column.
pub fn prefix_match<C: ColumnTrait>(column: C, prefix: &str) -> SimpleExpr {
    let pattern = format!("{}%", escape_like(&prefix.to_lowercase()));
    Expr::expr(Func::lower(Expr::col((column.entity_name(), column))))
        .like(LikeExpr::new(pattern).escape('\\'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::prelude::*;
    use crate::entities::actors;
    use sea_orm::{DbBackend, EntityTrait, QueryTrait};
    use serde_json::json;

    fn sql(select: Select<Actors>) -> String {
        select.build(DbBackend::Sqlite).to_string()
    }

    #[test]
    fn test_parse_full_filter() {
        let filter = Filter::parse(
            r#"{"where":{"age":{"gte":30}},"order":["lastName DESC"],"limit":5,"offset":2,"include":"movies"}"#,
        )
        .unwrap();

        assert_eq!(filter.limit, Some(5));
        assert_eq!(filter.skip, Some(2));
        assert!(filter.inclusions(&["movies"]).unwrap().has("movies"));
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(matches!(
            Filter::parse(r#"{"wher":{}}"#),
            Err(RepoError::InvalidFilter(_))
        ));
        assert!(Filter::parse("not json").is_err());
    }

    #[test]
    fn test_equality_and_operators() {
        let filter = Filter::parse(
            r#"{"where":{"firstName":"Tom","age":{"gt":20,"lte":60},"image":null}}"#,
        )
        .unwrap();
        let query = sql(filter.apply(Actors::find()).unwrap());

        assert!(query.contains(r#""first_name" = 'Tom'"#), "{query}");
        assert!(query.contains(r#""age" > 20"#), "{query}");
        assert!(query.contains(r#""age" <= 60"#), "{query}");
        assert!(query.contains(r#""image" IS NULL"#), "{query}");
    }

    #[test]
    fn test_or_group() {
        let filter =
            Filter::parse(r#"{"where":{"or":[{"firstName":"Tom"},{"lastName":"Hanks"}]}}"#).unwrap();
        let query = sql(filter.apply(Actors::find()).unwrap());

        assert!(query.contains(" OR "), "{query}");
    }

    #[test]
    fn test_inq_and_order() {
        let filter = Filter::parse(
            r#"{"where":{"gender":{"inq":["male","female"]}},"order":"age DESC","limit":3}"#,
        )
        .unwrap();
        let query = sql(filter.apply(Actors::find()).unwrap());

        assert!(query.contains("IN ('male', 'female')"), "{query}");
        assert!(query.contains(r#"ORDER BY "actors"."age" DESC"#), "{query}");
        assert!(query.contains("LIMIT 3"), "{query}");
    }

    #[test]
    fn test_rejects_unknown_field_and_operator() {
        let unknown_field = Filter::parse(r#"{"where":{"nickname":"x"}}"#).unwrap();
        assert!(unknown_field.apply(Actors::find()).is_err());

        let unknown_op = Filter::parse(r#"{"where":{"age":{"between":[1,2]}}}"#).unwrap();
        assert!(unknown_op.apply(Actors::find()).is_err());

        let bad_order = Filter::parse(r#"{"order":"age SIDEWAYS"}"#).unwrap();
        assert!(bad_order.apply(Actors::find()).is_err());
    }

    #[test]
    fn test_limit_is_capped() {
        let filter = Filter {
            limit: Some(MAX_LIMIT + 1),
            ..Filter::default()
        };
        assert!(filter.apply(Actors::find()).is_err());
    }

    #[test]
    fn test_unknown_inclusion() {
        let filter = Filter::parse(r#"{"include":[{"relation":"agents"}]}"#).unwrap();
        assert!(filter.inclusions(&["movies"]).is_err());
    }

    #[test]
    fn test_where_uses_wire_names() {
        let mut where_clause = Where::new();
        where_clause.insert("released_date".to_string(), json!({"like": "2020%"}));
        let query = Movies::find()
            .filter(condition::<Movies>(&where_clause).unwrap())
            .build(DbBackend::Sqlite)
            .to_string();

        assert!(query.contains(r#""released_date" LIKE '2020%'"#), "{query}");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
        assert_eq!(escape_like("Tom"), "Tom");
    }

    #[test]
    fn test_prefix_match_lowercases() {
        let query = Actors::find()
            .filter(prefix_match(actors::Column::FirstName, "To_m"))
            .build(DbBackend::Sqlite)
            .to_string();

        assert!(query.contains("LOWER"), "{query}");
        assert!(query.contains("'to"), "{query}");
        assert!(query.contains("ESCAPE"), "{query}");
    }
}
