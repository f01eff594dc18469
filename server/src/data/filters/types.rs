//! Store-level filter conditions
//!
//! A [`Condition`] is one predicate on one storage field. It is produced from a
//! validated filter by the builder and consumed by each store: SQLite renders
//! it to a parameterised WHERE fragment, the in-memory store evaluates it
//! directly.

use gridline::FilterValue;

use crate::utils::sql::{escape_like_pattern, quote_ident};

/// Text comparison case handling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CasePolicy {
    #[default]
    Insensitive,
    Sensitive,
}

impl CasePolicy {
    pub fn from_sensitive(case_sensitive: bool) -> Self {
        if case_sensitive {
            Self::Sensitive
        } else {
            Self::Insensitive
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    Equals,
    Contains,
    StartsWith,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gt,
    Lt,
}

impl Comparison {
    fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Lt => "<",
        }
    }
}

/// How a multi-valued field is matched against a value list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMatch {
    Any,
    All,
    None,
}

/// One predicate on one storage field
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Text {
        field: String,
        op: TextMatch,
        value: String,
        case: CasePolicy,
    },
    /// Null or empty string (or the negation)
    Empty { field: String, negated: bool },
    Compare {
        field: String,
        op: Comparison,
        value: FilterValue,
    },
    /// Inclusive on both ends
    Range {
        field: String,
        low: FilterValue,
        high: FilterValue,
    },
    Flag { field: String, value: bool },
    /// Scalar field in (or not in) a value list; null rows match the negation
    Membership {
        field: String,
        values: Vec<String>,
        negated: bool,
    },
    /// Array field against a value list
    Tags {
        field: String,
        mode: SetMatch,
        values: Vec<String>,
    },
}

/// SQL bind value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Real(f64),
    Integer(i64),
}

impl From<&FilterValue> for SqlValue {
    /// Dates bind as epoch milliseconds, matching their storage form
    fn from(value: &FilterValue) -> Self {
        match value {
            FilterValue::Text(s) => Self::Text(s.clone()),
            FilterValue::Number(n) => Self::Real(*n),
            FilterValue::Date(dt) => Self::Integer(dt.timestamp_millis()),
        }
    }
}

/// Collects SQL parameters during query building (maintains insertion order)
#[derive(Debug, Default, PartialEq)]
pub struct SqlParams {
    pub values: Vec<SqlValue>,
}

impl SqlParams {
    fn text(&mut self, value: impl Into<String>) {
        self.values.push(SqlValue::Text(value.into()));
    }

    fn placeholders(&mut self, values: &[String]) -> String {
        values.iter().for_each(|v| self.text(v.clone()));
        vec!["?"; values.len()].join(", ")
    }
}

impl Condition {
    pub fn field(&self) -> &str {
        match self {
            Self::Text { field, .. }
            | Self::Empty { field, .. }
            | Self::Compare { field, .. }
            | Self::Range { field, .. }
            | Self::Flag { field, .. }
            | Self::Membership { field, .. }
            | Self::Tags { field, .. } => field,
        }
    }

    /// Generate a SQLite WHERE fragment
    /// Returns the SQL clause with ? placeholders and updates params
    pub fn to_sql(&self, params: &mut SqlParams) -> String {
        let col = quote_ident(self.field());

        match self {
            Self::Text {
                op, value, case, ..
            } => match (case, op) {
                (CasePolicy::Insensitive, TextMatch::Equals) => {
                    params.text(value.clone());
                    format!("LOWER({}) = LOWER(?)", col)
                }
                (CasePolicy::Insensitive, TextMatch::Contains) => {
                    params.text(format!("%{}%", escape_like_pattern(value)));
                    format!("LOWER({}) LIKE LOWER(?) ESCAPE '\\'", col)
                }
                (CasePolicy::Insensitive, TextMatch::StartsWith) => {
                    params.text(format!("{}%", escape_like_pattern(value)));
                    format!("LOWER({}) LIKE LOWER(?) ESCAPE '\\'", col)
                }
                // LIKE ignores ASCII case in SQLite, so exact matching avoids it
                (CasePolicy::Sensitive, TextMatch::Equals) => {
                    params.text(value.clone());
                    format!("{} = ?", col)
                }
                (CasePolicy::Sensitive, TextMatch::Contains) => {
                    params.text(value.clone());
                    format!("instr({}, ?) > 0", col)
                }
                (CasePolicy::Sensitive, TextMatch::StartsWith) => {
                    params.values.push(SqlValue::Integer(value.chars().count() as i64));
                    params.text(value.clone());
                    format!("substr({}, 1, ?) = ?", col)
                }
            },
            Self::Empty { negated, .. } => {
                if *negated {
                    format!("({} IS NOT NULL AND {} <> '')", col, col)
                } else {
                    format!("({} IS NULL OR {} = '')", col, col)
                }
            }
            Self::Compare { op, value, .. } => {
                params.values.push(SqlValue::from(value));
                format!("{} {} ?", col, op.as_sql())
            }
            Self::Range { low, high, .. } => {
                params.values.push(SqlValue::from(low));
                params.values.push(SqlValue::from(high));
                format!("{} BETWEEN ? AND ?", col)
            }
            Self::Flag { value, .. } => {
                let sql_bool = if *value { "TRUE" } else { "FALSE" };
                format!("{} = {}", col, sql_bool)
            }
            Self::Membership {
                values, negated, ..
            } => {
                let placeholders = params.placeholders(values);
                if *negated {
                    format!("({} IS NULL OR {} NOT IN ({}))", col, col, placeholders)
                } else {
                    format!("{} IN ({})", col, placeholders)
                }
            }
            Self::Tags { mode, values, .. } => build_tags_sql(&col, *mode, values, params),
        }
    }
}

/// Tags are stored as a JSON array of strings and matched through json_each
fn build_tags_sql(col: &str, mode: SetMatch, values: &[String], params: &mut SqlParams) -> String {
    let placeholders = params.placeholders(values);
    let matching = format!(
        "SELECT 1 FROM json_each({}) WHERE json_each.value IN ({})",
        col, placeholders
    );

    match mode {
        SetMatch::Any => format!("EXISTS ({})", matching),
        SetMatch::None => format!("NOT EXISTS ({})", matching),
        // Values are distinct, so matching all of them means counting them all
        SetMatch::All => {
            params.values.push(SqlValue::Integer(values.len() as i64));
            format!(
                "(SELECT COUNT(DISTINCT json_each.value) FROM json_each({}) \
                 WHERE json_each.value IN ({})) = ?",
                col, placeholders
            )
        }
    }
}

/// Conjunction of conditions; empty matches every row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    pub conditions: Vec<Condition>,
}

impl Predicate {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Generate the WHERE clause body (without the keyword)
    pub fn to_sql(&self, params: &mut SqlParams) -> String {
        if self.conditions.is_empty() {
            return "1=1".to_string();
        }
        self.conditions
            .iter()
            .map(|c| c.to_sql(params))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// Stable default ordering: creation time descending, then id descending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub created_field: String,
    pub id_field: String,
}

impl OrderKey {
    pub fn new(created_field: impl Into<String>, id_field: impl Into<String>) -> Self {
        Self {
            created_field: created_field.into(),
            id_field: id_field.into(),
        }
    }

    pub fn to_sql(&self) -> String {
        format!(
            "{} DESC, {} DESC",
            quote_ident(&self.created_field),
            quote_ident(&self.id_field)
        )
    }
}
