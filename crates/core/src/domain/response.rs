use std::fmt;

use serde::{Serialize, Serializer};

use crate::domain::permission::AccessVerdict;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryResponse {
    pub text: String,
    #[serde(skip_serializing_if = "FieldAccess::is_not_applicable")]
    pub field_access: FieldAccess,
    pub query_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization: Option<Visualization>,
}

/// Outcome of a permission question as seen by the client.
///
/// Serializes as `true`, `false` or `null`; `NotApplicable` is never written
/// because the owning field is skipped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FieldAccess {
    #[default]
    NotApplicable,
    Granted,
    Denied,
    Unknown,
}

impl FieldAccess {
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Self::NotApplicable)
    }
}

impl From<AccessVerdict> for FieldAccess {
    fn from(value: AccessVerdict) -> Self {
        match value {
            AccessVerdict::Granted => Self::Granted,
            AccessVerdict::Denied => Self::Denied,
            AccessVerdict::Unknown => Self::Unknown,
        }
    }
}

impl Serialize for FieldAccess {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Granted => serializer.serialize_bool(true),
            Self::Denied => serializer.serialize_bool(false),
            Self::Unknown | Self::NotApplicable => serializer.serialize_none(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Doughnut,
    Scatter,
    Area,
    Radar,
    PolarArea,
}

impl ChartType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bar" => Some(Self::Bar),
            "line" => Some(Self::Line),
            "pie" => Some(Self::Pie),
            "doughnut" => Some(Self::Doughnut),
            "scatter" => Some(Self::Scatter),
            "area" => Some(Self::Area),
            "radar" => Some(Self::Radar),
            "polararea" => Some(Self::PolarArea),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Pie => "pie",
            Self::Doughnut => "doughnut",
            Self::Scatter => "scatter",
            Self::Area => "area",
            Self::Radar => "radar",
            Self::PolarArea => "polarArea",
        }
    }

    /// Charts that colour each slice/bar rather than each series.
    pub fn colors_per_point(self) -> bool {
        matches!(self, Self::Bar | Self::Pie | Self::Doughnut | Self::PolarArea)
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chart.js-compatible chart description.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Visualization {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub data: ChartData,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartData {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartDataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data: Vec<DataPoint>,
    #[serde(rename = "backgroundColor")]
    pub background_color: Colors,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DataPoint {
    Value(f64),
    Point { x: f64, y: f64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Colors {
    One(String),
    Many(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub models: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PingStatus {
    pub ping: &'static str,
    pub status: &'static str,
    pub model: String,
}

impl PingStatus {
    pub fn for_model(model: impl Into<String>) -> Self {
        Self { ping: "pong", status: "ok", model: model.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub status: &'static str,
    pub message: String,
}
