//! Table-driven query units.

use crate::collector::{Measurement, ScrapeContext, ScrapeError, ScraperUnit, ValueKind, fq_name};
use crate::db::{Row, Value};

use super::status::{parse_config_string, parse_status};

/// Label carrying the request target on most unit metrics.
pub const INSTANCE_LABEL: &str = "hana_instance";

/// How a value column becomes a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueParse {
    /// Numeric column. `NULL` or non-numeric text fails the unit.
    Number,
    /// Status column, see [`parse_status`]. Unrecognized values are skipped.
    Status,
    /// Configuration column, see [`parse_config_string`]. Unrecognized values are skipped.
    ConfigString,
}

/// Where a label value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSource {
    /// The request target, under [`INSTANCE_LABEL`].
    Instance,
    /// A result column rendered as text. `NULL` renders empty.
    Column { key: String, column: String },
}

impl LabelSource {
    pub fn column(key: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Column {
            key: key.into(),
            column: column.into(),
        }
    }

    fn resolve(&self, row: &Row, ctx: &ScrapeContext) -> Result<(String, String), ScrapeError> {
        match self {
            Self::Instance => Ok((INSTANCE_LABEL.to_string(), ctx.instance().to_string())),
            Self::Column { key, column } => {
                let value = row
                    .get(column)
                    .ok_or_else(|| ScrapeError::MissingColumn(column.clone()))?;
                Ok((key.clone(), value.to_label()))
            }
        }
    }
}

/// One metric read from one result column.
#[derive(Debug, Clone)]
pub struct ValueColumn {
    column: String,
    name: String,
    help: String,
    kind: ValueKind,
    parse: ValueParse,
    labels: Option<Vec<LabelSource>>,
}

impl ValueColumn {
    pub fn gauge(column: impl Into<String>, name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            name: name.into(),
            help: help.into(),
            kind: ValueKind::Gauge,
            parse: ValueParse::Number,
            labels: None,
        }
    }

    pub fn parse(mut self, parse: ValueParse) -> Self {
        self.parse = parse;
        self
    }

    /// Use these labels instead of the unit's.
    pub fn with_labels(mut self, labels: Vec<LabelSource>) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Ok(None)` means the value is skipped for this row.
    fn read(&self, row: &Row) -> Result<Option<f64>, ScrapeError> {
        let value = row
            .get(&self.column)
            .ok_or_else(|| ScrapeError::MissingColumn(self.column.clone()))?;

        match self.parse {
            ValueParse::Number => value.as_f64().map(Some).ok_or_else(|| {
                ScrapeError::scan(&self.column, format!("expected a number, got {}", describe(value)))
            }),
            ValueParse::Status => Ok(parse_status(value)),
            ValueParse::ConfigString => Ok(parse_config_string(value)),
        }
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Text(s) => format!("'{s}'"),
        other => other.to_label(),
    }
}

/// A scraper unit defined by a statement, its label columns and its value columns.
///
/// The unit name doubles as the metric subsystem, so a value column `used_size`
/// of unit `sys_m_disks` is exported as `<ns>_sys_m_disks_used_size`.
#[derive(Debug, Clone)]
pub struct QueryUnit {
    name: String,
    help: String,
    query: String,
    labels: Vec<LabelSource>,
    values: Vec<ValueColumn>,
    enabled_by_default: bool,
}

impl QueryUnit {
    pub fn new(name: impl Into<String>, help: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            query: query.into(),
            labels: Vec::new(),
            values: Vec::new(),
            enabled_by_default: true,
        }
    }

    /// Append the instance label.
    pub fn instance_label(mut self) -> Self {
        self.labels.push(LabelSource::Instance);
        self
    }

    /// Append a label read from `column`.
    pub fn label(mut self, key: impl Into<String>, column: impl Into<String>) -> Self {
        self.labels.push(LabelSource::column(key, column));
        self
    }

    pub fn value(mut self, value: ValueColumn) -> Self {
        self.values.push(value);
        self
    }

    /// Shorthand for a numeric gauge column.
    pub fn gauge(self, column: &str, name: &str, help: &str) -> Self {
        self.value(ValueColumn::gauge(column, name, help))
    }

    pub fn disabled_by_default(mut self) -> Self {
        self.enabled_by_default = false;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn labels(&self) -> &[LabelSource] {
        &self.labels
    }

    pub fn values(&self) -> &[ValueColumn] {
        &self.values
    }

    fn measure(&self, row: &Row, ctx: &ScrapeContext, out: &mut Vec<Measurement>) -> Result<(), ScrapeError> {
        for column in &self.values {
            let Some(value) = column.read(row)? else {
                tracing::trace!(collector = %self.name, column = %column.column, "Skipping unrecognized value");
                continue;
            };

            let labels = column
                .labels
                .as_deref()
                .unwrap_or(&self.labels)
                .iter()
                .map(|label| label.resolve(row, ctx))
                .collect::<Result<Vec<_>, _>>()?;

            out.push(Measurement {
                name: fq_name(ctx.namespace(), &self.name, &column.name),
                help: column.help.clone(),
                kind: column.kind,
                labels,
                value,
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ScraperUnit for QueryUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn help(&self) -> &str {
        &self.help
    }

    fn enabled_by_default(&self) -> bool {
        self.enabled_by_default
    }

    async fn scrape(&self, ctx: &ScrapeContext) -> Result<Vec<Measurement>, ScrapeError> {
        let rows = ctx.query(&self.query).await?;
        let mut out = Vec::with_capacity(rows.len() * self.values.len());
        for row in &rows {
            self.measure(row, ctx, &mut out)?;
        }
        Ok(out)
    }
}
