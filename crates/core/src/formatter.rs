use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::domain::response::{
    ChartData, ChartDataset, ChartType, Colors, DataPoint, FieldAccess, QueryResponse,
    Visualization,
};
use crate::domain::result::RawResult;

pub const CHART_PALETTE: [&str; 10] = [
    "rgba(255, 99, 132, 0.6)",
    "rgba(54, 162, 235, 0.6)",
    "rgba(255, 206, 86, 0.6)",
    "rgba(75, 192, 192, 0.6)",
    "rgba(153, 102, 255, 0.6)",
    "rgba(255, 159, 64, 0.6)",
    "rgba(199, 199, 199, 0.6)",
    "rgba(83, 102, 255, 0.6)",
    "rgba(78, 205, 196, 0.6)",
    "rgba(255, 99, 255, 0.6)",
];

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChartError {
    #[error("chart payload must be an object")]
    NotAnObject,
    #[error("chart type is missing")]
    MissingType,
    #[error("unsupported chart type `{0}`")]
    UnsupportedType(String),
    #[error("chart `data` must be an object")]
    MissingData,
    #[error("chart `data.datasets` must be a non-empty array")]
    MissingDatasets,
    #[error("chart `data.labels` must be an array of strings")]
    InvalidLabels,
    #[error("{0} charts require `data.labels`")]
    MissingLabels(ChartType),
    #[error("dataset {index} is invalid: {reason}")]
    InvalidDataset { index: usize, reason: &'static str },
    #[error("dataset {index} has {actual} points but there are {expected} labels")]
    LengthMismatch { index: usize, expected: usize, actual: usize },
}

/// Shapes an engine result into the client response. `query_text` must be
/// the caller's original string.
pub fn format_response(raw: RawResult, query_text: &str) -> QueryResponse {
    let field_access = raw
        .permission_check
        .as_ref()
        .map(|check| FieldAccess::from(check.verdict))
        .unwrap_or_default();

    let visualization = raw.chart.as_ref().and_then(|chart| match validate_chart(chart) {
        Ok(visualization) => Some(visualization),
        Err(reason) => {
            warn!(
                event_name = "query.format.chart_dropped",
                reason = %reason,
                "dropping malformed chart payload"
            );
            None
        }
    });

    QueryResponse { text: raw.text, field_access, query_text: query_text.to_string(), visualization }
}

pub fn validate_chart(chart: &Value) -> Result<Visualization, ChartError> {
    let chart = chart.as_object().ok_or(ChartError::NotAnObject)?;

    let raw_type = chart.get("type").and_then(Value::as_str).ok_or(ChartError::MissingType)?;
    let chart_type =
        ChartType::parse(raw_type).ok_or_else(|| ChartError::UnsupportedType(raw_type.to_string()))?;

    let title = chart
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string);

    let data = chart.get("data").and_then(Value::as_object).ok_or(ChartError::MissingData)?;
    let labels = parse_labels(data)?;
    if labels.is_empty() && chart_type != ChartType::Scatter {
        return Err(ChartError::MissingLabels(chart_type));
    }

    let raw_datasets = data
        .get("datasets")
        .and_then(Value::as_array)
        .filter(|datasets| !datasets.is_empty())
        .ok_or(ChartError::MissingDatasets)?;

    let mut datasets = Vec::with_capacity(raw_datasets.len());
    for (index, raw_dataset) in raw_datasets.iter().enumerate() {
        let dataset = parse_dataset(index, raw_dataset, chart_type)?;
        if chart_type != ChartType::Scatter && dataset.data.len() != labels.len() {
            return Err(ChartError::LengthMismatch {
                index,
                expected: labels.len(),
                actual: dataset.data.len(),
            });
        }
        datasets.push(dataset);
    }

    Ok(Visualization { chart_type, title, data: ChartData { labels, datasets } })
}

fn parse_labels(data: &Map<String, Value>) -> Result<Vec<String>, ChartError> {
    let Some(raw_labels) = data.get("labels").filter(|labels| !labels.is_null()) else {
        return Ok(Vec::new());
    };
    let raw_labels = raw_labels.as_array().ok_or(ChartError::InvalidLabels)?;
    raw_labels
        .iter()
        .map(|label| match label {
            Value::String(label) => Ok(label.clone()),
            _ => Err(ChartError::InvalidLabels),
        })
        .collect()
}

fn parse_dataset(
    index: usize,
    raw: &Value,
    chart_type: ChartType,
) -> Result<ChartDataset, ChartError> {
    let dataset =
        raw.as_object().ok_or(ChartError::InvalidDataset { index, reason: "not an object" })?;

    let label = match dataset.get("label") {
        None | Some(Value::Null) => None,
        Some(Value::String(label)) => Some(label.clone()),
        Some(_) => return Err(ChartError::InvalidDataset { index, reason: "label is not a string" }),
    };

    let raw_points = dataset
        .get("data")
        .and_then(Value::as_array)
        .ok_or(ChartError::InvalidDataset { index, reason: "data is not an array" })?;

    let data = raw_points
        .iter()
        .map(|point| parse_point(point, chart_type))
        .collect::<Option<Vec<_>>>()
        .ok_or(ChartError::InvalidDataset {
            index,
            reason: if chart_type == ChartType::Scatter {
                "scatter data must be {x, y} points"
            } else {
                "data must contain finite numbers"
            },
        })?;

    let background_color = parse_colors(dataset.get("backgroundColor"))
        .unwrap_or_else(|| palette_colors(chart_type, index, data.len()));

    Ok(ChartDataset { label, data, background_color })
}

fn parse_point(point: &Value, chart_type: ChartType) -> Option<DataPoint> {
    if chart_type == ChartType::Scatter {
        let point = point.as_object()?;
        let x = point.get("x").and_then(Value::as_f64).filter(|x| x.is_finite())?;
        let y = point.get("y").and_then(Value::as_f64).filter(|y| y.is_finite())?;
        return Some(DataPoint::Point { x, y });
    }
    point.as_f64().filter(|value| value.is_finite()).map(DataPoint::Value)
}

// Invalid colour values are replaced, not rejected; colour is cosmetic.
fn parse_colors(raw: Option<&Value>) -> Option<Colors> {
    match raw? {
        Value::String(color) if !color.trim().is_empty() => Some(Colors::One(color.clone())),
        Value::Array(colors) if !colors.is_empty() => colors
            .iter()
            .map(|color| color.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(Colors::Many),
        _ => None,
    }
}

fn palette_colors(chart_type: ChartType, dataset_index: usize, points: usize) -> Colors {
    if chart_type.colors_per_point() && points > 0 {
        Colors::Many(
            (0..points).map(|i| CHART_PALETTE[i % CHART_PALETTE.len()].to_string()).collect(),
        )
    } else {
        Colors::One(CHART_PALETTE[dataset_index % CHART_PALETTE.len()].to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{format_response, validate_chart, ChartError, CHART_PALETTE};
    use crate::domain::permission::{AccessVerdict, FieldRef};
    use crate::domain::response::{ChartType, Colors, DataPoint, FieldAccess};
    use crate::domain::result::{PermissionCheck, RawResult};

    fn check(verdict: AccessVerdict) -> PermissionCheck {
        PermissionCheck {
            target: Some(FieldRef::new("Account", "Rating")),
            verdict,
            message: String::new(),
        }
    }

    #[test]
    fn field_access_follows_the_permission_check() {
        let none = format_response(RawResult::text("plain answer"), "q");
        assert_eq!(none.field_access, FieldAccess::NotApplicable);

        let denied = format_response(
            RawResult::text("no").with_permission_check(check(AccessVerdict::Denied)),
            "q",
        );
        assert_eq!(denied.field_access, FieldAccess::Denied);

        let unknown = format_response(
            RawResult::text("unsure").with_permission_check(check(AccessVerdict::Unknown)),
            "q",
        );
        assert_eq!(unknown.field_access, FieldAccess::Unknown);
    }

    #[test]
    fn query_text_is_echoed_verbatim() {
        let original = "  Zeige mir Opportunities nach Phase 📊 ";
        let response = format_response(RawResult::text("Here you go."), original);
        assert_eq!(response.query_text, original);
        assert_eq!(response.text, "Here you go.");
    }

    #[test]
    fn valid_bar_chart_is_kept_and_coloured_from_palette() {
        let raw = RawResult::text("Accounts by industry").with_chart(json!({
            "type": "bar",
            "title": "Accounts by Industry",
            "data": {
                "labels": ["Technology", "Finance", "Healthcare"],
                "datasets": [{ "label": "Accounts", "data": [35, 20, 15.5] }]
            }
        }));

        let response = format_response(raw, "chart accounts by industry");
        let visualization = response.visualization.expect("chart should survive");
        assert_eq!(visualization.chart_type, ChartType::Bar);
        assert_eq!(visualization.title.as_deref(), Some("Accounts by Industry"));
        assert_eq!(visualization.data.labels.len(), 3);
        let dataset = &visualization.data.datasets[0];
        assert_eq!(dataset.data[2], DataPoint::Value(15.5));
        assert_eq!(
            dataset.background_color,
            Colors::Many(CHART_PALETTE[..3].iter().map(|c| c.to_string()).collect())
        );
    }

    #[test]
    fn scatter_chart_accepts_points_without_labels() {
        let visualization = validate_chart(&json!({
            "type": "scatter",
            "data": { "datasets": [{ "data": [{ "x": 1, "y": 2.5 }, { "x": 2, "y": 3 }], "backgroundColor": "red" }] }
        }))
        .expect("valid scatter");

        assert_eq!(visualization.data.datasets[0].data[0], DataPoint::Point { x: 1.0, y: 2.5 });
        assert_eq!(visualization.data.datasets[0].background_color, Colors::One("red".to_string()));
    }

    #[test]
    fn malformed_charts_are_rejected_with_a_reason() {
        assert_eq!(validate_chart(&json!("bar")), Err(ChartError::NotAnObject));
        assert_eq!(
            validate_chart(&json!({ "type": "hologram", "data": {} })),
            Err(ChartError::UnsupportedType("hologram".to_string()))
        );
        assert_eq!(
            validate_chart(&json!({ "type": "pie", "data": { "labels": ["a"], "datasets": [] } })),
            Err(ChartError::MissingDatasets)
        );
        assert_eq!(
            validate_chart(&json!({
                "type": "line",
                "data": { "labels": ["Q1", "Q2"], "datasets": [{ "data": [1] }] }
            })),
            Err(ChartError::LengthMismatch { index: 0, expected: 2, actual: 1 })
        );
        assert!(matches!(
            validate_chart(&json!({
                "type": "bar",
                "data": { "labels": ["a"], "datasets": [{ "data": ["many"] }] }
            })),
            Err(ChartError::InvalidDataset { index: 0, .. })
        ));
        assert_eq!(
            validate_chart(&json!({
                "type": "bar",
                "data": { "labels": [2023, 2024], "datasets": [{ "data": [1, 2] }] }
            })),
            Err(ChartError::InvalidLabels)
        );
    }

    #[test]
    fn malformed_chart_is_dropped_without_failing_the_response() {
        let raw = RawResult::text("Here is the trend.")
            .with_permission_check(check(AccessVerdict::Granted))
            .with_chart(json!({ "type": "line", "data": { "datasets": "oops" } }));

        let response = format_response(raw, "show me the trend");
        assert!(response.visualization.is_none());
        assert_eq!(response.text, "Here is the trend.");
        assert_eq!(response.field_access, FieldAccess::Granted);
    }
}
