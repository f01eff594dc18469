//! Column registry
//!
//! Declares the filterable columns of a table view: identifier, data type,
//! storage accessor and display metadata. A registry is assembled once by a
//! domain module and is read-only afterwards, which keeps every operator
//! catalog lookup well-defined for the lifetime of the view.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::operators::{Arity, FilterOperator, arity_of, operators_for};

/// Maximum length of a column identifier
pub const MAX_COLUMN_ID_LENGTH: usize = 64;

/// Data type of a filterable column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnDataType {
    Text,
    Number,
    Date,
    Boolean,
    Option,
    MultiOption,
}

impl ColumnDataType {
    pub const ALL: [ColumnDataType; 6] = [
        Self::Text,
        Self::Number,
        Self::Date,
        Self::Boolean,
        Self::Option,
        Self::MultiOption,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::Option => "option",
            Self::MultiOption => "multiOption",
        }
    }

    /// Whether values for this type are drawn from a declared option list
    pub fn has_options(&self) -> bool {
        matches!(self, Self::Option | Self::MultiOption)
    }
}

impl fmt::Display for ColumnDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Invalid column id '{0}': use 1-64 alphanumeric, '-' or '_' characters")]
    InvalidColumnId(String),
}

/// Validate column id: 1-64 chars, alphanumeric + dash/underscore
pub fn is_valid_column_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_COLUMN_ID_LENGTH
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// A single filterable column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    id: String,
    data_type: ColumnDataType,
    accessor: String,
    label: String,
    options: Vec<String>,
}

impl ColumnDefinition {
    /// Create a column whose accessor and label default to its id
    pub fn new(id: impl Into<String>, data_type: ColumnDataType) -> Self {
        let id = id.into();
        Self {
            accessor: id.clone(),
            label: id.clone(),
            id,
            data_type,
            options: Vec::new(),
        }
    }

    pub fn with_accessor(mut self, accessor: impl Into<String>) -> Self {
        self.accessor = accessor.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Declare the allowed values of an option or multi-option column
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data_type(&self) -> ColumnDataType {
        self.data_type
    }

    /// Storage path the server reads this column from
    pub fn accessor(&self) -> &str {
        &self.accessor
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Client-facing description (the accessor stays server-side)
    pub fn describe(&self) -> ColumnInfo {
        ColumnInfo {
            id: self.id.clone(),
            data_type: self.data_type,
            label: self.label.clone(),
            options: self.options.clone(),
            operators: operators_for(self.data_type)
                .iter()
                .filter_map(|op| {
                    arity_of(self.data_type, *op)
                        .ok()
                        .map(|arity| OperatorInfo {
                            operator: *op,
                            arity,
                        })
                })
                .collect(),
        }
    }
}

/// Operator metadata exposed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorInfo {
    pub operator: FilterOperator,
    pub arity: Arity,
}

/// Column metadata exposed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub id: String,
    pub data_type: ColumnDataType,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub operators: Vec<OperatorInfo>,
}

/// Builder used while a domain module declares its columns
#[derive(Debug, Default)]
pub struct ColumnRegistryBuilder {
    columns: IndexMap<String, ColumnDefinition>,
}

impl ColumnRegistryBuilder {
    pub fn register(&mut self, column: ColumnDefinition) -> Result<&mut Self, RegistryError> {
        if !is_valid_column_id(&column.id) {
            return Err(RegistryError::InvalidColumnId(column.id));
        }
        if self.columns.contains_key(&column.id) {
            return Err(RegistryError::DuplicateColumn(column.id));
        }
        self.columns.insert(column.id.clone(), column);
        Ok(self)
    }

    pub fn build(self) -> ColumnRegistry {
        ColumnRegistry {
            columns: self.columns,
        }
    }
}

/// Immutable set of columns for one table view, in registration order
#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    columns: IndexMap<String, ColumnDefinition>,
}

impl ColumnRegistry {
    pub fn builder() -> ColumnRegistryBuilder {
        ColumnRegistryBuilder::default()
    }

    /// Build a registry from a list of columns, failing on the first duplicate
    pub fn from_columns<I>(columns: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = ColumnDefinition>,
    {
        let mut builder = Self::builder();
        for column in columns {
            builder.register(column)?;
        }
        Ok(builder.build())
    }

    pub fn get(&self, id: &str) -> Result<&ColumnDefinition, RegistryError> {
        self.columns
            .get(id)
            .ok_or_else(|| RegistryError::UnknownColumn(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.columns.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.values()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
