//! Query serializer
//!
//! Converts a [`FilterSet`] plus a [`Cursor`] to and from an ordered list of
//! `(name, value)` pairs that travels as a URL query string:
//!
//! ```text
//! pageIndex=0&pageSize=20
//!   &filter.status.op=isAnyOf&filter.status.value=pending&filter.status.value=shipped
//!   &filter.price.op=between&filter.price.value=10&filter.price.value=50
//! ```
//!
//! Decoding is all-or-nothing: any malformed parameter rejects the whole
//! query and no partial filter set is produced.

use indexmap::IndexMap;
use thiserror::Error;

use crate::columns::ColumnRegistry;
use crate::model::{FilterDetail, FilterSet, ValidationError};
use crate::operators::{FilterOperator, arity_of};
use crate::value::FilterValue;

pub const PARAM_PAGE_INDEX: &str = "pageIndex";
pub const PARAM_PAGE_SIZE: &str = "pageSize";

const FILTER_PREFIX: &str = "filter.";
const OP_SUFFIX: &str = "op";
const VALUE_SUFFIX: &str = "value";

/// Page size used when the query does not carry one
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Maximum number of filter groups in one query
pub const MAX_FILTERS: usize = 50;

/// Maximum query string size (64KB)
pub const MAX_QUERY_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("pageSize must be greater than 0")]
    ZeroPageSize,
}

/// Zero-based page position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    page_index: u32,
    page_size: u32,
}

impl Cursor {
    pub fn new(page_index: u32, page_size: u32) -> Result<Self, CursorError> {
        if page_size == 0 {
            return Err(CursorError::ZeroPageSize);
        }
        Ok(Self {
            page_index,
            page_size,
        })
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Row offset of the first row on this page
    pub fn offset(&self) -> u64 {
        self.page_index as u64 * self.page_size as u64
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Reasons a transport query is rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedFilterError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Filter on column '{0}' has no operator")]
    MissingOperator(String),

    #[error("Invalid operator '{operator}' for column '{column}'")]
    InvalidOperator { column: String, operator: String },

    #[error("Filter on column '{0}' has more than one operator")]
    DuplicateOperator(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Unexpected parameter: {0}")]
    UnexpectedParameter(String),

    #[error("Invalid {name}: '{value}'")]
    InvalidCursor { name: String, value: String },

    #[error("Parameter '{0}' given more than once")]
    DuplicateParameter(String),

    #[error("Too many filters (max {max})")]
    TooManyFilters { max: usize },

    #[error("Query too large (max {max} bytes)")]
    TooLarge { max: usize },

    #[error("Invalid query encoding: {0}")]
    InvalidEncoding(String),
}

impl MalformedFilterError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownColumn(_) => "UNKNOWN_COLUMN",
            Self::MissingOperator(_) => "MISSING_OPERATOR",
            Self::InvalidOperator { .. } => "INVALID_OPERATOR",
            Self::DuplicateOperator(_) => "DUPLICATE_OPERATOR",
            Self::Validation(e) => e.code(),
            Self::UnexpectedParameter(_) => "UNEXPECTED_PARAMETER",
            Self::InvalidCursor { .. } => "INVALID_CURSOR",
            Self::DuplicateParameter(_) => "DUPLICATE_PARAMETER",
            Self::TooManyFilters { .. } => "TOO_MANY_FILTERS",
            Self::TooLarge { .. } => "QUERY_TOO_LARGE",
            Self::InvalidEncoding(_) => "INVALID_ENCODING",
        }
    }
}

/// Ordered transport parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_query_string(&self) -> Result<String, serde_urlencoded::ser::Error> {
        serde_urlencoded::to_string(&self.0)
    }

    /// Parse a raw query string (without the leading `?`)
    pub fn from_query_string(raw: &str) -> Result<Self, MalformedFilterError> {
        if raw.len() > MAX_QUERY_SIZE {
            return Err(MalformedFilterError::TooLarge {
                max: MAX_QUERY_SIZE,
            });
        }
        serde_urlencoded::from_str::<Vec<(String, String)>>(raw)
            .map(Self)
            .map_err(|e| MalformedFilterError::InvalidEncoding(e.to_string()))
    }
}

impl From<Vec<(String, String)>> for QueryParams {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }
}

impl<'a> IntoIterator for &'a QueryParams {
    type Item = &'a (String, String);
    type IntoIter = std::slice::Iter<'a, (String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn op_param(column_id: &str) -> String {
    format!("{FILTER_PREFIX}{column_id}.{OP_SUFFIX}")
}

fn value_param(column_id: &str) -> String {
    format!("{FILTER_PREFIX}{column_id}.{VALUE_SUFFIX}")
}

/// Serialize filters and cursor into transport parameters
pub fn encode(filters: &FilterSet, cursor: Cursor) -> QueryParams {
    let mut params = QueryParams::new();
    params.push(PARAM_PAGE_INDEX, cursor.page_index().to_string());
    params.push(PARAM_PAGE_SIZE, cursor.page_size().to_string());

    for detail in filters {
        params.push(op_param(detail.column_id()), detail.operator().as_str());
        for value in detail.values() {
            params.push(value_param(detail.column_id()), value.to_param());
        }
    }
    params
}

#[derive(Default)]
struct RawGroup<'a> {
    operators: Vec<&'a str>,
    values: Vec<&'a str>,
}

/// Parse transport parameters back into filters and cursor
///
/// Parameters outside the `filter.` namespace other than `pageIndex` and
/// `pageSize` are ignored so callers can carry their own keys.
pub fn decode(
    registry: &ColumnRegistry,
    params: &QueryParams,
) -> Result<(FilterSet, Cursor), MalformedFilterError> {
    let mut page_index: Option<&str> = None;
    let mut page_size: Option<&str> = None;
    let mut groups: IndexMap<&str, RawGroup<'_>> = IndexMap::new();

    for (name, value) in params {
        let slot = match name.as_str() {
            PARAM_PAGE_INDEX => Some(&mut page_index),
            PARAM_PAGE_SIZE => Some(&mut page_size),
            _ => None,
        };
        if let Some(slot) = slot {
            if slot.replace(value.as_str()).is_some() {
                return Err(MalformedFilterError::DuplicateParameter(name.clone()));
            }
            continue;
        }

        let Some(rest) = name.strip_prefix(FILTER_PREFIX) else {
            continue;
        };
        let (column_id, suffix) = rest
            .rsplit_once('.')
            .filter(|(column_id, _)| !column_id.is_empty())
            .ok_or_else(|| MalformedFilterError::UnexpectedParameter(name.clone()))?;

        let group = groups.entry(column_id).or_default();
        match suffix {
            OP_SUFFIX => group.operators.push(value),
            VALUE_SUFFIX => group.values.push(value),
            _ => return Err(MalformedFilterError::UnexpectedParameter(name.clone())),
        }
    }

    if groups.len() > MAX_FILTERS {
        return Err(MalformedFilterError::TooManyFilters { max: MAX_FILTERS });
    }

    let mut filters = FilterSet::new();
    for (column_id, group) in groups {
        let column = registry
            .get(column_id)
            .map_err(|_| MalformedFilterError::UnknownColumn(column_id.to_string()))?;

        let raw_operator = match group.operators.as_slice() {
            [] => return Err(MalformedFilterError::MissingOperator(column_id.to_string())),
            [op] => *op,
            _ => return Err(MalformedFilterError::DuplicateOperator(column_id.to_string())),
        };
        let operator = FilterOperator::parse(raw_operator).ok_or_else(|| {
            MalformedFilterError::InvalidOperator {
                column: column_id.to_string(),
                operator: raw_operator.to_string(),
            }
        })?;

        // Arity before value parsing so the count error wins over a type error
        let data_type = column.data_type();
        let arity = arity_of(data_type, operator).map_err(|_| {
            ValidationError::UnsupportedOperator {
                column: column_id.to_string(),
                data_type,
                operator,
            }
        })?;
        if !arity.accepts(group.values.len()) {
            return Err(ValidationError::Arity {
                column: column_id.to_string(),
                operator,
                expected: arity,
                got: group.values.len(),
            }
            .into());
        }

        let values = group
            .values
            .iter()
            .map(|raw| {
                FilterValue::parse(data_type, raw).map_err(|reason| {
                    ValidationError::InvalidValue {
                        column: column_id.to_string(),
                        reason,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        filters.insert(FilterDetail::new(column, operator, values)?);
    }

    let cursor = Cursor::new(
        parse_cursor_param(PARAM_PAGE_INDEX, page_index, 0)?,
        parse_cursor_param(PARAM_PAGE_SIZE, page_size, DEFAULT_PAGE_SIZE)?,
    )
    .map_err(|_| MalformedFilterError::InvalidCursor {
        name: PARAM_PAGE_SIZE.to_string(),
        value: "0".to_string(),
    })?;

    Ok((filters, cursor))
}

fn parse_cursor_param(
    name: &str,
    raw: Option<&str>,
    default: u32,
) -> Result<u32, MalformedFilterError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse::<u32>()
            .map_err(|_| MalformedFilterError::InvalidCursor {
                name: name.to_string(),
                value: value.to_string(),
            }),
    }
}
