//! Chart types, field bindings and the payload handed to the chart renderer.

use serde::Serialize;

use crate::result::ResultRow;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ChartError {
    #[error("Unknown chart type: {0}")]
    UnknownType(String),
    #[error("Unknown axis type: {0}")]
    UnknownAxis(String),
    #[error("{chart} chart requires {role} to be bound")]
    MissingField { chart: ChartType, role: ChartRole },
}

/// Every chart the renderer knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ChartType {
    Bar,
    #[default]
    Column,
    Area,
    GroupBar,
    RangeBar,
    GroupedColumn,
    Gauge,
    Line,
    Pie,
    Radar,
    Ring,
    StackedBar,
    StackColumn,
    StackArea,
    TinyArea,
    TinyColumn,
    TinyLine,
    Progress,
    RingProgress,
    DualAxes,
}

impl ChartType {
    pub const ALL: [ChartType; 20] = [
        Self::Bar,
        Self::Column,
        Self::Area,
        Self::GroupBar,
        Self::RangeBar,
        Self::GroupedColumn,
        Self::Gauge,
        Self::Line,
        Self::Pie,
        Self::Radar,
        Self::Ring,
        Self::StackedBar,
        Self::StackColumn,
        Self::StackArea,
        Self::TinyArea,
        Self::TinyColumn,
        Self::TinyLine,
        Self::Progress,
        Self::RingProgress,
        Self::DualAxes,
    ];

    /// Types offered by the SQL editor's chart selector.
    pub const SELECTABLE: [ChartType; 5] = [Self::Line, Self::Area, Self::Column, Self::Bar, Self::Pie];

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == s)
    }

    pub fn parse(s: &str) -> Result<Self, ChartError> {
        Self::from_str(s).ok_or_else(|| ChartError::UnknownType(s.to_string()))
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bar => "Bar",
            Self::Column => "Column",
            Self::Area => "Area",
            Self::GroupBar => "GroupBar",
            Self::RangeBar => "RangeBar",
            Self::GroupedColumn => "GroupedColumn",
            Self::Gauge => "Gauge",
            Self::Line => "Line",
            Self::Pie => "Pie",
            Self::Radar => "Radar",
            Self::Ring => "Ring",
            Self::StackedBar => "StackedBar",
            Self::StackColumn => "StackColumn",
            Self::StackArea => "StackArea",
            Self::TinyArea => "TinyArea",
            Self::TinyColumn => "TinyColumn",
            Self::TinyLine => "TinyLine",
            Self::Progress => "Progress",
            Self::RingProgress => "RingProgress",
            Self::DualAxes => "DualAxes",
        }
    }

    /// Pie-like charts bind angle/color instead of x/y.
    pub fn is_radial(self) -> bool {
        matches!(self, Self::Pie | Self::Ring)
    }

    /// Roles that must be bound before the renderer is called.
    pub fn required_roles(self) -> &'static [ChartRole] {
        match self {
            Self::Pie | Self::Ring => &[ChartRole::Angle, ChartRole::Color],
            Self::Gauge | Self::Progress | Self::RingProgress => &[],
            Self::TinyArea | Self::TinyColumn | Self::TinyLine => &[ChartRole::Y],
            _ => &[ChartRole::X, ChartRole::Y],
        }
    }

    /// Whether a temporal x-axis requires the data to be pre-sorted.
    pub fn sorts_temporal_axis(self) -> bool {
        matches!(self, Self::Line | Self::Area | Self::DualAxes)
    }
}

impl std::fmt::Display for ChartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChartRole {
    #[serde(rename = "xField")]
    X,
    #[serde(rename = "yField")]
    Y,
    #[serde(rename = "seriesField")]
    Series,
    #[serde(rename = "angleField")]
    Angle,
    #[serde(rename = "colorField")]
    Color,
}

impl ChartRole {
    pub fn name(self) -> &'static str {
        match self {
            Self::X => "xField",
            Self::Y => "yField",
            Self::Series => "seriesField",
            Self::Angle => "angleField",
            Self::Color => "colorField",
        }
    }
}

impl std::fmt::Display for ChartRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Chart role → result column. An empty string means unbound.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartFieldBinding {
    pub x_field: String,
    pub y_field: String,
    pub series_field: String,
    pub angle_field: String,
    pub color_field: String,
}

impl ChartFieldBinding {
    pub fn get(&self, role: ChartRole) -> &str {
        match role {
            ChartRole::X => &self.x_field,
            ChartRole::Y => &self.y_field,
            ChartRole::Series => &self.series_field,
            ChartRole::Angle => &self.angle_field,
            ChartRole::Color => &self.color_field,
        }
    }

    pub fn set(&mut self, role: ChartRole, column: impl Into<String>) {
        let column = column.into();
        match role {
            ChartRole::X => self.x_field = column,
            ChartRole::Y => self.y_field = column,
            ChartRole::Series => self.series_field = column,
            ChartRole::Angle => self.angle_field = column,
            ChartRole::Color => self.color_field = column,
        }
    }

    pub fn is_bound(&self, role: ChartRole) -> bool {
        !self.get(role).is_empty()
    }

    /// Check the binding against the chart's required roles.
    pub fn validate(&self, chart: ChartType) -> Result<(), ChartError> {
        match chart.required_roles().iter().find(|r| !self.is_bound(**r)) {
            Some(role) => Err(ChartError::MissingField { chart, role: *role }),
            None => Ok(()),
        }
    }
}

/// Scale type of the x-axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AxisType {
    #[default]
    Cat,
    Linear,
    Time,
    TimeCat,
}

impl AxisType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cat" => Some(Self::Cat),
            "linear" => Some(Self::Linear),
            "time" => Some(Self::Time),
            "timeCat" => Some(Self::TimeCat),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self, ChartError> {
        Self::from_str(s).ok_or_else(|| ChartError::UnknownAxis(s.to_string()))
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, Self::Time | Self::TimeCat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct XAxis {
    #[serde(rename = "type")]
    pub axis_type: AxisType,
}

/// Rows for the renderer. Dual-axis charts carry one series per axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartData {
    Single(Vec<ResultRow>),
    Dual([Vec<ResultRow>; 2]),
}

/// Payload handed to the chart renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub data: ChartData,
    pub height: u32,
    pub animation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<XAxis>,
    #[serde(flatten)]
    pub fields: ChartFields,
}

/// Field props, shaped by chart family.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartFields {
    #[serde(rename_all = "camelCase")]
    Radial {
        angle_field: String,
        color_field: String,
    },
    #[serde(rename_all = "camelCase")]
    Cartesian {
        x_field: String,
        y_field: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        series_field: Option<String>,
        is_group: bool,
    },
}

impl ChartFields {
    pub fn from_binding(chart: ChartType, binding: &ChartFieldBinding) -> Self {
        if chart.is_radial() {
            Self::Radial {
                angle_field: binding.angle_field.clone(),
                color_field: binding.color_field.clone(),
            }
        } else {
            let series_field = binding.is_bound(ChartRole::Series).then(|| binding.series_field.clone());
            Self::Cartesian {
                x_field: binding.x_field.clone(),
                y_field: binding.y_field.clone(),
                is_group: series_field.is_some(),
                series_field,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_type_names_round_trip() {
        for chart in ChartType::ALL {
            assert_eq!(ChartType::from_str(chart.name()), Some(chart));
        }
        assert_eq!(ChartType::from_str("Donut"), None);
        assert_eq!(
            ChartType::parse("pie"),
            Err(ChartError::UnknownType("pie".to_string()))
        );
    }

    #[test]
    fn test_default_chart_is_column() {
        assert_eq!(ChartType::default(), ChartType::Column);
        assert!(ChartType::SELECTABLE.contains(&ChartType::default()));
    }

    #[test]
    fn test_required_roles() {
        assert_eq!(ChartType::Pie.required_roles(), &[ChartRole::Angle, ChartRole::Color]);
        assert_eq!(ChartType::Line.required_roles(), &[ChartRole::X, ChartRole::Y]);
        assert!(ChartType::Gauge.required_roles().is_empty());
    }

    #[test]
    fn test_validate_missing_angle() {
        let binding = ChartFieldBinding {
            color_field: "name".to_string(),
            ..Default::default()
        };
        let err = binding.validate(ChartType::Pie).unwrap_err();
        assert_eq!(
            err,
            ChartError::MissingField {
                chart: ChartType::Pie,
                role: ChartRole::Angle
            }
        );
        assert_eq!(err.to_string(), "Pie chart requires angleField to be bound");
    }

    #[test]
    fn test_validate_series_optional() {
        let mut binding = ChartFieldBinding::default();
        binding.set(ChartRole::X, "day");
        binding.set(ChartRole::Y, "total");
        assert!(binding.validate(ChartType::Line).is_ok());
        assert!(!binding.is_bound(ChartRole::Series));
    }

    #[test]
    fn test_axis_type() {
        assert_eq!(AxisType::from_str("timeCat"), Some(AxisType::TimeCat));
        assert!(AxisType::Time.is_temporal());
        assert!(!AxisType::Cat.is_temporal());
        assert!(AxisType::parse("date").is_err());
    }

    #[test]
    fn test_fields_serialization() {
        let binding = ChartFieldBinding {
            x_field: "day".to_string(),
            y_field: "total".to_string(),
            series_field: "region".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(ChartFields::from_binding(ChartType::Line, &binding)).unwrap();
        assert_eq!(json["xField"], "day");
        assert_eq!(json["seriesField"], "region");
        assert_eq!(json["isGroup"], true);
        assert!(json.get("angleField").is_none());

        let json = serde_json::to_value(ChartFields::from_binding(ChartType::Pie, &binding)).unwrap();
        assert_eq!(json["angleField"], "");
        assert!(json.get("xField").is_none());
    }

    #[test]
    fn test_binding_deserializes_partial() {
        let binding: ChartFieldBinding = serde_json::from_str(r#"{"xField": "a"}"#).unwrap();
        assert_eq!(binding.get(ChartRole::X), "a");
        assert!(!binding.is_bound(ChartRole::Y));
    }
}
