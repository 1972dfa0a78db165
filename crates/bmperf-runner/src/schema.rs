//! Report column schema.
//!
//! The header and every row are rendered from the same [`ReportSchema`], so a
//! row can never have a different width or order than the header.

use std::collections::BTreeMap;

use bmperf_metrics::Utilization;
use bmperf_stats::{format_float, format_percent};

/// Placeholder for a cell without a value.
pub const NOT_APPLICABLE: &str = "N/A";

/// One report column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Name,
    /// Extra per-configuration attribute, e.g. `prec`.
    Attribute(String),
    Shape,
    Gops,
    Time,
    Throughput,
    EstimatedTime,
    MacUtilization,
    CpuUsage,
    EstimatedMacUtilization,
    DdrUtilization,
    EstimatedDdrBandwidth,
}

impl Column {
    pub fn header(&self) -> &str {
        match self {
            Self::Name => "name",
            Self::Attribute(key) => key,
            Self::Shape => "shape",
            Self::Gops => "gops",
            Self::Time => "time(ms)",
            Self::Throughput => "throughput(fps)",
            Self::EstimatedTime => "cmodel_estimated_time(ms)",
            Self::MacUtilization => "mac_utilization",
            Self::CpuUsage => "cpu_usage",
            Self::EstimatedMacUtilization => "cmodel_estimated_mac_utilization",
            Self::DdrUtilization => "ddr_utilization",
            Self::EstimatedDdrBandwidth => "cmodel_estimated_ddr_bandwidth",
        }
    }
}

/// Everything measured for one configuration, before formatting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowValues {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub shape: String,
    /// GOPs of one batch (`gops * batch_size`).
    pub batch_gops: Option<f64>,
    pub latency_ms: f64,
    pub throughput: f64,
    pub estimated_time_ms: Option<f64>,
    pub cpu_usage: Option<f64>,
    pub utilization: Utilization,
}

/// Ordered column list, fixed for a whole report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSchema {
    columns: Vec<Column>,
    estimates: bool,
}

impl ReportSchema {
    /// `extras` are emitted in the order given (callers sort them).
    /// `estimates` switches in the simulator-estimate columns in place of
    /// throughput.
    pub fn new(extras: &[String], estimates: bool) -> Self {
        let mut columns = vec![Column::Name];
        columns.extend(extras.iter().cloned().map(Column::Attribute));
        columns.extend([Column::Shape, Column::Gops, Column::Time]);
        if estimates {
            columns.extend([
                Column::EstimatedTime,
                Column::MacUtilization,
                Column::CpuUsage,
                Column::EstimatedMacUtilization,
                Column::DdrUtilization,
                Column::EstimatedDdrBandwidth,
            ]);
        } else {
            columns.extend([
                Column::Throughput,
                Column::MacUtilization,
                Column::CpuUsage,
                Column::DdrUtilization,
            ]);
        }
        Self { columns, estimates }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn estimates(&self) -> bool {
        self.estimates
    }

    /// Names of the extra attribute columns, in order.
    pub fn extras(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter_map(|c| match c {
            Column::Attribute(key) => Some(key.as_str()),
            _ => None,
        })
    }

    pub fn header(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.header().to_string())
            .collect()
    }

    pub fn render(&self, row: &RowValues) -> Vec<String> {
        self.columns.iter().map(|c| render_cell(c, row)).collect()
    }
}

fn or_not_applicable(value: Option<f64>, format: fn(f64) -> String) -> String {
    value.map_or_else(|| NOT_APPLICABLE.to_string(), format)
}

fn render_cell(column: &Column, row: &RowValues) -> String {
    let float = |v| or_not_applicable(v, format_float);
    let percent = |v| or_not_applicable(v, format_percent);
    match column {
        Column::Name => row.name.clone(),
        Column::Attribute(key) => row.attributes.get(key).cloned().unwrap_or_default(),
        Column::Shape => row.shape.clone(),
        Column::Gops => float(row.batch_gops),
        Column::Time => format_float(row.latency_ms),
        Column::Throughput => format_float(row.throughput),
        Column::EstimatedTime => float(row.estimated_time_ms),
        Column::MacUtilization => percent(row.utilization.mac),
        Column::CpuUsage => percent(row.cpu_usage),
        Column::EstimatedMacUtilization => percent(row.utilization.estimated_mac),
        Column::DdrUtilization => percent(row.utilization.ddr),
        Column::EstimatedDdrBandwidth => percent(row.utilization.estimated_ddr),
    }
}
