pub mod chart;
pub mod config;
pub mod infer;
pub mod measure;
pub mod request;
pub mod result;
pub mod schema;
pub mod table;
pub mod tree;

use wasm_bindgen::prelude::*;

use chart::{AxisType, ChartConfig, ChartError, ChartFieldBinding, ChartType};
use config::ConfigError;
use infer::RenderOptions;
use request::RequestId;
use result::{ResultError, ResultSet, SortOrder};
use schema::{InstanceSchema, SchemaError, SchemaNode};
use tree::TreeIndex;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Query(#[from] ResultError),
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid binding: {0}")]
    Binding(serde_json::Error),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Parse a schema payload into the display tree.
pub fn load_tree(schema_json: &str, separator: &str) -> Result<Vec<SchemaNode>, Error> {
    Ok(InstanceSchema::from_json(schema_json)?.to_tree(separator))
}

/// Build the renderer payload for a query result.
///
/// Without an explicit binding the defaults for `chart` are inferred from
/// the result's columns.
pub fn render_chart(
    result: &ResultSet,
    chart: ChartType,
    binding: Option<ChartFieldBinding>,
    options: RenderOptions,
) -> Result<ChartConfig, Error> {
    let binding = binding.unwrap_or_else(|| infer::infer_default_bindings(&result.columns(), chart));
    Ok(infer::chart_config(&result.rows, chart, &binding, options)?)
}

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

fn to_array(keys: Vec<String>) -> js_sys::Array {
    keys.into_iter().map(JsValue::from).collect()
}

/// Flat pre-order index of a schema payload, as JSON.
#[wasm_bindgen(js_name = "buildFlatIndex")]
pub fn build_flat_index(schema_json: &str) -> Result<String, String> {
    let tree = load_tree(schema_json, schema::DEFAULT_KEY_SEPARATOR).map_err(|e| e.to_string())?;
    to_json(&tree::build_flat_index(&tree))
}

/// Keys to expand so that matches of `search_term` are visible.
#[wasm_bindgen(js_name = "computeExpandedKeys")]
pub fn compute_expanded_keys(search_term: &str, schema_json: &str) -> Result<js_sys::Array, String> {
    let tree = load_tree(schema_json, schema::DEFAULT_KEY_SEPARATOR).map_err(|e| e.to_string())?;
    let index = tree::build_flat_index(&tree);
    Ok(to_array(tree::compute_expanded_keys(search_term, &tree, &index)))
}

/// Default field binding for `chart_type`, as JSON.
#[wasm_bindgen(js_name = "inferDefaultBindings")]
pub fn infer_default_bindings(columns: Vec<String>, chart_type: &str) -> Result<String, String> {
    let chart = ChartType::parse(chart_type).map_err(|e| e.to_string())?;
    to_json(&infer::infer_default_bindings(&columns, chart))
}

/// Number for numeric strings, the value itself otherwise.
#[wasm_bindgen(js_name = "coerceForPlotting")]
pub fn coerce_for_plotting(value: JsValue) -> JsValue {
    match value.as_string().as_deref().and_then(result::parse_number) {
        Some(n) => JsValue::from_f64(n),
        None => value,
    }
}

/// Renderer payload for a query result, as JSON.
#[wasm_bindgen(js_name = "chartConfig")]
pub fn chart_config(
    result_json: &str,
    chart_type: &str,
    binding_json: Option<String>,
    x_axis: Option<String>,
    height: Option<u32>,
) -> Result<String, String> {
    let run = || -> Result<ChartConfig, Error> {
        let result = ResultSet::from_json(result_json)?;
        let chart = ChartType::parse(chart_type)?;
        let binding = binding_json
            .as_deref()
            .map(serde_json::from_str::<ChartFieldBinding>)
            .transpose()
            .map_err(Error::Binding)?;
        let defaults = RenderOptions::default();
        let options = RenderOptions {
            height: height.unwrap_or(defaults.height),
            x_axis: x_axis.as_deref().map(AxisType::parse).transpose()?,
            ..defaults
        };
        render_chart(&result, chart, binding, options)
    };
    run().map_err(|e| e.to_string()).and_then(|config| to_json(&config))
}

/// Result rows sorted on one column for the table view, as JSON.
#[wasm_bindgen(js_name = "sortRows")]
pub fn sort_rows(result_json: &str, column: &str, order: &str) -> Result<String, String> {
    let run = || -> Result<Vec<result::ResultRow>, Error> {
        let result = ResultSet::from_json(result_json)?;
        Ok(result.sort_by_column(column, SortOrder::parse(order)?))
    };
    run().map_err(|e| e.to_string()).and_then(|rows| to_json(&rows))
}

/// Drops responses to superseded schema or query requests.
#[wasm_bindgen(js_name = "RequestTracker")]
#[derive(Default)]
pub struct Requests {
    tracker: request::RequestTracker,
}

#[wasm_bindgen(js_class = "RequestTracker")]
impl Requests {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Requests {
        Requests::default()
    }

    /// New request ID; every earlier ID becomes stale.
    pub fn issue(&self) -> f64 {
        self.tracker.issue().value() as f64
    }

    #[wasm_bindgen(js_name = "isCurrent")]
    pub fn is_current(&self, id: f64) -> bool {
        self.tracker.is_current(RequestId::from(id as u64))
    }

    /// `payload` if `id` is still the latest request, `undefined` otherwise.
    pub fn accept(&self, id: f64, payload: JsValue) -> JsValue {
        self.tracker
            .accept(RequestId::from(id as u64), payload)
            .unwrap_or(JsValue::UNDEFINED)
    }
}

/// Schema tree indexed once per load and queried on every keystroke.
#[wasm_bindgen]
pub struct SchemaTree {
    nodes: Vec<SchemaNode>,
    index: TreeIndex,
}

#[wasm_bindgen]
impl SchemaTree {
    #[wasm_bindgen(constructor)]
    pub fn new(schema_json: &str, separator: Option<String>) -> Result<SchemaTree, String> {
        let separator = separator.unwrap_or_else(|| schema::DEFAULT_KEY_SEPARATOR.to_string());
        let nodes = load_tree(schema_json, &separator).map_err(|e| e.to_string())?;
        let index = TreeIndex::build(&nodes);
        Ok(SchemaTree { nodes, index })
    }

    /// Tree nodes for the tree view, as JSON.
    #[wasm_bindgen(js_name = "treeData")]
    pub fn tree_data(&self) -> Result<String, String> {
        to_json(&self.nodes)
    }

    #[wasm_bindgen(js_name = "flatIndex")]
    pub fn flat_index(&self) -> Result<String, String> {
        to_json(&self.index.entries())
    }

    #[wasm_bindgen(js_name = "expandedKeys")]
    pub fn expanded_keys(&self, search_term: &str) -> js_sys::Array {
        to_array(self.index.expanded_keys(search_term))
    }

    #[wasm_bindgen(js_name = "initialExpandedKeys")]
    pub fn initial_expanded_keys(&self) -> js_sys::Array {
        to_array(schema::initial_expanded_keys(&self.nodes))
    }

    #[wasm_bindgen(js_name = "parentKey")]
    pub fn parent_key(&self, key: &str) -> Option<String> {
        self.index.parent_of(key).map(str::to_string)
    }
}
