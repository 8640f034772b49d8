//! Descriptors for the queryable tables a data provider exposes, plus the
//! dynamically typed cell/row values that come back from queries.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Storage-level type tag for a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    String,
    Integer,
    Float,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub description: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnSpec {
    pub fn new(description: impl Into<String>, column_type: ColumnType) -> Self {
        Self { description: description.into(), column_type }
    }
}

/// Descriptor of one queryable table: its name and the columns it carries,
/// in source order. Immutable after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct DataSource {
    table_name: String,
    columns: Vec<(String, ColumnSpec)>,
}

impl DataSource {
    pub fn new(table_name: impl Into<String>, columns: Vec<(String, ColumnSpec)>) -> Self {
        Self { table_name: table_name.into(), columns }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn columns(&self) -> &[(String, ColumnSpec)] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(column_name, _)| column_name == name)
    }
}

impl Serialize for DataSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("table", &self.table_name)?;
        map.serialize_entry("columns", &ColumnsInOrder(&self.columns))?;
        map.end()
    }
}

struct ColumnsInOrder<'a>(&'a [(String, ColumnSpec)]);

impl Serialize for ColumnsInOrder<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, spec) in self.0 {
            map.serialize_entry(name, spec)?;
        }
        map.end()
    }
}

/// One JSON block per data source, in a shape an LLM can read back:
/// table name plus column name -> {description, type}.
pub fn schema_text(sources: &[DataSource]) -> String {
    sources
        .iter()
        .map(|source| {
            serde_json::to_string_pretty(source)
                .unwrap_or_else(|_| format!("{{\"table\": \"{}\"}}", source.table_name()))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A single cell coming back from a query. SQLite columns are dynamically
/// typed, so every cell carries its own tag.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Real(f64),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Real(value) => serializer.serialize_f64(*value),
            Self::Null => serializer.serialize_none(),
        }
    }
}

/// An ordered column-name -> value mapping. Serializes as a JSON object with
/// keys in result-set column order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.cells.push((column.into(), value));
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.iter().find(|(name, _)| name == column).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[(String, Value)] {
        &self.cells
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in &self.cells {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Column descriptions for the World Bank 2025 macroeconomic dataset the
/// default deployment ships with. The CLI pairs these with whatever types the
/// loader infers from the CSV.
pub fn world_bank_2025_descriptions() -> Vec<(&'static str, &'static str)> {
    vec![
        ("country_name", "Extended country name the data refers to"),
        ("country_id", "2 letters id of the country"),
        ("year", "Year the data refers to."),
        ("inflation", "Inflation figures (CPI %)."),
        ("gdp", "GDP figure."),
        ("gdp_per_capita", "GDP per capita numbers."),
        ("unemployment_rate", "Unemployment rate."),
        ("interest_rate", "Real interest rate."),
        ("inflation_gdp_deflator", "Inflation as GDP deflator."),
        ("gdp_growth", "GDP growth as annual percentage."),
        ("current_account_balance", "Current Account Balance as % of GDP."),
        ("government_expense", "Government expense as % of GDP."),
        ("government_revenue", "Government revenue as % of GDP."),
        ("tax_revenue", "Tax revenue as % of GDP."),
        ("gross_national_income", "Gross national income in USD."),
        ("public_debt", "Public debt as percent of GDP."),
    ]
}
