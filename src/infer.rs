//! Default chart bindings from a result's column order, plus value coercion
//! and temporal ordering of the rows fed to the renderer.

use log::debug;

use crate::chart::{
    AxisType, ChartConfig, ChartData, ChartError, ChartFieldBinding, ChartFields, ChartRole, ChartType,
    XAxis,
};
use crate::result::{CellValue, ResultRow};

/// Bind chart roles to columns by position.
///
/// Pie-like charts take the first column as color and the second as angle.
/// Bar swaps the axes since it plots the category vertically. Everything
/// else puts the first column on x and the second on y. Roles without a
/// column stay unbound.
pub fn infer_default_bindings(columns: &[String], chart: ChartType) -> ChartFieldBinding {
    let first = columns.first().cloned().unwrap_or_default();
    let second = columns.get(1).cloned().unwrap_or_default();

    let binding = if chart.is_radial() {
        ChartFieldBinding {
            angle_field: second,
            color_field: first,
            ..Default::default()
        }
    } else if chart == ChartType::Bar {
        ChartFieldBinding {
            x_field: second,
            y_field: first,
            ..Default::default()
        }
    } else {
        ChartFieldBinding {
            x_field: first,
            y_field: second,
            ..Default::default()
        }
    };

    debug!("default {} binding over {} columns: {:?}", chart, columns.len(), binding);
    binding
}

/// Numeric value of `raw` if it reads as a number, otherwise `raw` itself.
pub fn coerce_for_plotting(raw: &CellValue) -> CellValue {
    match raw {
        CellValue::String(s) => match crate::result::parse_number(s) {
            Some(n) => CellValue::Number(n),
            None => raw.clone(),
        },
        other => other.clone(),
    }
}

/// Roles whose values are plotted numerically for this chart.
fn plotted_roles(chart: ChartType) -> &'static [ChartRole] {
    if chart.is_radial() {
        &[ChartRole::Angle]
    } else {
        &[ChartRole::X, ChartRole::Y]
    }
}

/// Copy of `rows` with the plotted fields coerced. Other cells are untouched.
pub fn plot_rows(rows: &[ResultRow], binding: &ChartFieldBinding, chart: ChartType) -> Vec<ResultRow> {
    let fields: Vec<&str> = plotted_roles(chart)
        .iter()
        .map(|role| binding.get(*role))
        .filter(|field| !field.is_empty())
        .collect();

    rows.iter()
        .map(|row| {
            let mut row = row.clone();
            for field in &fields {
                if let Some(value) = row.get(field).map(coerce_for_plotting) {
                    row.set(*field, value);
                }
            }
            row
        })
        .collect()
}

/// Copy of `rows` ordered by the date/time in `x_field`, ascending.
///
/// Ties keep their relative order. Rows whose value is not a date/time go
/// last, also in their original order.
pub fn sort_by_time(rows: &[ResultRow], x_field: &str) -> Vec<ResultRow> {
    let mut sorted = rows.to_vec();
    sorted.sort_by_cached_key(|row| {
        let ts = row.get(x_field).and_then(CellValue::as_timestamp);
        (ts.is_none(), ts)
    });
    sorted
}

/// Sort each series of `data` independently by [`sort_by_time`].
pub fn sort_chart_data(data: &ChartData, x_field: &str) -> ChartData {
    match data {
        ChartData::Single(rows) => ChartData::Single(sort_by_time(rows, x_field)),
        ChartData::Dual([left, right]) => {
            ChartData::Dual([sort_by_time(left, x_field), sort_by_time(right, x_field)])
        }
    }
}

/// Rendering options that are not derived from the result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub height: u32,
    pub animation: bool,
    pub x_axis: Option<AxisType>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            height: 260,
            animation: false,
            x_axis: None,
        }
    }
}

/// Build the renderer payload, rejecting bindings the chart cannot draw.
pub fn chart_config(
    rows: &[ResultRow],
    chart: ChartType,
    binding: &ChartFieldBinding,
    options: RenderOptions,
) -> Result<ChartConfig, ChartError> {
    binding.validate(chart)?;

    let plotted = plot_rows(rows, binding, chart);
    let mut data = match chart {
        ChartType::DualAxes => ChartData::Dual([plotted.clone(), plotted]),
        _ => ChartData::Single(plotted),
    };

    let temporal = options.x_axis.is_some_and(AxisType::is_temporal);
    if temporal && chart.sorts_temporal_axis() {
        data = sort_chart_data(&data, &binding.x_field);
    }

    Ok(ChartConfig {
        chart_type: chart,
        data,
        height: options.height,
        animation: options.animation,
        x_axis: options.x_axis.map(|axis_type| XAxis { axis_type }),
        fields: ChartFields::from_binding(chart, binding),
    })
}

/// Chart settings of the SQL editor: the selected type and its bindings.
///
/// Defaults are re-inferred whenever the chart type or the result columns
/// change, discarding manual overrides.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartForm {
    chart: ChartType,
    columns: Vec<String>,
    binding: ChartFieldBinding,
}

impl ChartForm {
    pub fn new(chart: ChartType) -> Self {
        Self {
            chart,
            ..Default::default()
        }
    }

    pub fn chart(&self) -> ChartType {
        self.chart
    }

    pub fn binding(&self) -> &ChartFieldBinding {
        &self.binding
    }

    /// Returns true if the column set changed and bindings were reset.
    pub fn set_columns(&mut self, columns: Vec<String>) -> bool {
        if columns == self.columns {
            return false;
        }
        self.columns = columns;
        self.binding = infer_default_bindings(&self.columns, self.chart);
        true
    }

    pub fn select_chart(&mut self, chart: ChartType) {
        self.chart = chart;
        self.binding = infer_default_bindings(&self.columns, chart);
    }

    /// Manually bind `role`. An empty column clears it.
    pub fn bind(&mut self, role: ChartRole, column: impl Into<String>) {
        self.binding.set(role, column);
    }
}
