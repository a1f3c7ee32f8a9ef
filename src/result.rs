//! Query result sets: cells, ordered rows and the table-view column sorter.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, thiserror::Error)]
pub enum ResultError {
    #[error("Invalid result payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown sort order: {0}")]
    UnknownSortOrder(String),
}

/// A single cell as returned by the query-execution API.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    String(String),
    Number(f64),
    #[default]
    Null,
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric value under browser `Number()` rules, `None` if it is not a
    /// number. Null is never numeric here.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => parse_number(s),
            Self::Null => None,
        }
    }

    /// Epoch milliseconds, if the cell holds a recognisable date/time.
    /// Numbers are taken as epoch milliseconds.
    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n as i64),
            Self::String(s) => parse_timestamp(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Null => f.write_str("NULL"),
        }
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Number(n) => n.as_f64().map(Self::Number).unwrap_or(Self::Null),
            Value::String(s) => Self::String(s),
            Value::Bool(b) => Self::String(b.to_string()),
            other => Self::String(other.to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Number(n) if is_integral(*n) => serializer.serialize_i64(*n as i64),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Null => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

// 2^53: integers beyond this are not exact in f64
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER
}

fn format_number(n: f64) -> String {
    if is_integral(n) {
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}

/// Parse text the way the browser's `Number()` does. Blank text is `0`.
pub fn parse_number(text: &str) -> Option<f64> {
    let t = text.trim();
    if t.is_empty() {
        return Some(0.0);
    }

    let radix = match t.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &t[2..];
        // from_str_radix also takes a leading sign
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        return u64::from_str_radix(digits, radix).ok().map(|n| n as f64);
    }

    match t {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    // f64::from_str also takes "inf" and "NaN"
    if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    t.parse::<f64>().ok()
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parse a date/time string into epoch milliseconds. Zone-less values are
/// read as UTC.
pub fn parse_timestamp(text: &str) -> Option<i64> {
    let t = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.timestamp_millis());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(t, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_millis());
        }
    }
    // Bare year, as stored by YEAR columns
    if t.len() == 4 && t.bytes().all(|b| b.is_ascii_digit()) {
        let year = t.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp_millis());
    }
    None
}

/// One result row, keeping the server's column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultRow {
    cells: Vec<(String, CellValue)>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<CellValue>,
    {
        let mut row = Self::new();
        for (k, v) in pairs {
            row.set(k, v);
        }
        row
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    /// Replace the cell in place, or append a new column.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some((_, cell)) => *cell = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct ResultRowVisitor;

impl<'de> Visitor<'de> for ResultRowVisitor {
    type Value = ResultRow;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping column names to cell values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ResultRow, A::Error> {
        let mut row = ResultRow::new();
        while let Some((name, value)) = access.next_entry::<String, CellValue>()? {
            row.set(name, value);
        }
        Ok(row)
    }
}

impl<'de> Deserialize<'de> for ResultRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ResultRowVisitor)
    }
}

/// Rows returned by one query execution, in server order.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ResultSet {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rows: Vec<ResultRow>,
    /// SQL generated for a natural-language query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ResultRow>, D::Error> {
    Ok(Option::<Vec<ResultRow>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascend,
    Descend,
}

impl SortOrder {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ascend" | "asc" => Some(Self::Ascend),
            "descend" | "desc" => Some(Self::Descend),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self, ResultError> {
        Self::from_str(s).ok_or_else(|| ResultError::UnknownSortOrder(s.to_string()))
    }
}

impl ResultSet {
    pub fn new(rows: Vec<ResultRow>) -> Self {
        Self { rows, sql: None }
    }

    /// Parse the query-execution payload `{rows: [...]}`.
    pub fn from_json(input: &str) -> Result<Self, ResultError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Column names, taken from the first row.
    pub fn columns(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|row| row.columns().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sorted copy of the rows for the table view. Ties keep server order.
    ///
    /// The column is read one way for every row: numerically if any cell is
    /// a number, temporally if any cell is a date, as text otherwise.
    pub fn sort_by_column(&self, column: &str, order: SortOrder) -> Vec<ResultRow> {
        let null = CellValue::Null;
        let cells: Vec<&CellValue> = self
            .rows
            .iter()
            .map(|row| row.get(column).unwrap_or(&null))
            .collect();
        let kind = ColumnKind::of(&cells);

        let mut keyed: Vec<(SortKey, &ResultRow)> = cells
            .iter()
            .map(|cell| kind.sort_key(cell))
            .zip(&self.rows)
            .collect();
        keyed.sort_by(|(a, _), (b, _)| match order {
            SortOrder::Ascend => a.cmp(b),
            SortOrder::Descend => b.cmp(a),
        });
        keyed.into_iter().map(|(_, row)| row.clone()).collect()
    }

    /// Number of pages of `page_size` rows.
    pub fn page_count(&self, page_size: usize) -> usize {
        if page_size == 0 {
            return 0;
        }
        self.rows.len().div_ceil(page_size)
    }
}

/// One page (zero-based) of `rows`; past the end yields an empty slice.
pub fn page(rows: &[ResultRow], index: usize, page_size: usize) -> &[ResultRow] {
    let start = index.saturating_mul(page_size).min(rows.len());
    let end = start.saturating_add(page_size).min(rows.len());
    &rows[start..end]
}

/// How a table column is read when sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Temporal,
    Text,
}

impl ColumnKind {
    pub fn of(cells: &[&CellValue]) -> Self {
        if cells.iter().any(|c| matches!(c, CellValue::Number(_))) {
            Self::Numeric
        } else if cells.iter().any(|c| c.as_timestamp().is_some()) {
            Self::Temporal
        } else {
            Self::Text
        }
    }

    fn sort_key(self, cell: &CellValue) -> SortKey {
        if cell.is_null() {
            return SortKey::Null;
        }
        let key = match self {
            Self::Numeric => cell.as_number().map(SortKey::Number),
            Self::Temporal => cell.as_timestamp().map(SortKey::Time),
            Self::Text => Some(SortKey::Text(cell.to_string())),
        };
        key.unwrap_or(SortKey::Unreadable)
    }
}

/// Nulls first, then readable values, then values the column kind cannot read.
#[derive(Debug, Clone)]
enum SortKey {
    Null,
    Number(f64),
    Time(i64),
    Text(String),
    Unreadable,
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Number(_) => 1,
            Self::Time(_) => 2,
            Self::Text(_) => 3,
            Self::Unreadable => 4,
        }
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "rows": [
            { "name": "beta", "total": 30, "created": "2023-02-01", "flag": true },
            { "name": "alpha", "total": "5", "created": "2023-01-15", "flag": false },
            { "name": "gamma", "total": null, "created": "not a date", "flag": null }
        ]
    }"#;

    #[test]
    fn test_parse_keeps_column_order() {
        let set = ResultSet::from_json(PAYLOAD).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.columns(), vec!["name", "total", "created", "flag"]);
        assert_eq!(set.rows[0].get("total"), Some(&CellValue::Number(30.0)));
        assert_eq!(set.rows[0].get("flag"), Some(&CellValue::String("true".into())));
        assert_eq!(set.rows[2].get("total"), Some(&CellValue::Null));
    }

    #[test]
    fn test_parse_null_rows() {
        let set = ResultSet::from_json(r#"{"rows": null, "sql": "SELECT 1"}"#).unwrap();
        assert!(set.is_empty());
        assert!(set.columns().is_empty());
        assert_eq!(set.sql.as_deref(), Some("SELECT 1"));
    }

    #[test]
    fn test_invalid_payload() {
        assert!(ResultSet::from_json(r#"{"rows": [1, 2]}"#).is_err());
    }

    #[test]
    fn test_serialize_row_order() {
        let row = ResultRow::from_pairs([("z", CellValue::Number(1.0)), ("a", CellValue::from(2.5))]);
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"z":1,"a":2.5}"#);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut row = ResultRow::from_pairs([("a", "1"), ("b", "2")]);
        row.set("a", 1.0);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(row.get("a"), Some(&CellValue::Number(1.0)));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number(" -1.5e2 "), Some(-150.0));
        assert_eq!(parse_number(""), Some(0.0));
        assert_eq!(parse_number("0x1f"), Some(31.0));
        assert_eq!(parse_number("0b101"), Some(5.0));
        assert_eq!(parse_number("Infinity"), Some(f64::INFINITY));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("12px"), None);
        assert_eq!(parse_number("0x+ff"), None);
        assert_eq!(parse_number("0b-1"), None);
        assert_eq!(parse_number("0x"), None);
        assert_eq!(parse_number("0o17"), Some(15.0));
    }

    #[test]
    fn test_parse_timestamp() {
        let day = parse_timestamp("2023-01-02").unwrap();
        assert_eq!(parse_timestamp("2023-01-02 00:00:00"), Some(day));
        assert_eq!(parse_timestamp("2023-01-02T00:00:00Z"), Some(day));
        assert_eq!(parse_timestamp("2023/01/02"), Some(day));
        assert!(parse_timestamp("2023-01-02 10:30:00.250").unwrap() > day);
        assert!(parse_timestamp("2023").unwrap() < day);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(0.25).to_string(), "0.25");
        assert_eq!(CellValue::Null.to_string(), "NULL");
    }

    #[test]
    fn test_sort_numeric_column() {
        let set = ResultSet::from_json(PAYLOAD).unwrap();
        let rows = set.sort_by_column("total", SortOrder::Ascend);
        let names: Vec<String> = rows.iter().map(|r| r.get("name").unwrap().to_string()).collect();
        assert_eq!(names, vec!["gamma", "alpha", "beta"]);
        // canonical order untouched
        assert_eq!(set.rows[0].get("name"), Some(&CellValue::from("beta")));
    }

    #[test]
    fn test_sort_date_column_descending() {
        let set = ResultSet::from_json(PAYLOAD).unwrap();
        let rows = set.sort_by_column("created", SortOrder::Descend);
        let names: Vec<String> = rows.iter().map(|r| r.get("name").unwrap().to_string()).collect();
        // unparseable dates rank after parseable ones, so first when descending
        assert_eq!(names, vec!["gamma", "beta", "alpha"]);
    }

    #[test]
    fn test_sort_string_column() {
        let set = ResultSet::from_json(PAYLOAD).unwrap();
        let rows = set.sort_by_column("name", SortOrder::Ascend);
        let names: Vec<String> = rows.iter().map(|r| r.get("name").unwrap().to_string()).collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let set = ResultSet::new(vec![
            ResultRow::from_pairs([("k", "b"), ("i", "1")]),
            ResultRow::from_pairs([("k", "a"), ("i", "2")]),
            ResultRow::from_pairs([("k", "b"), ("i", "3")]),
        ]);
        let rows = set.sort_by_column("k", SortOrder::Descend);
        let ids: Vec<String> = rows.iter().map(|r| r.get("i").unwrap().to_string()).collect();
        assert_eq!(ids, vec!["1", "3", "2"]);
    }

    #[test]
    fn test_sort_mixed_number_and_string_column() {
        let rows: Vec<ResultRow> = (0..400)
            .map(|n| {
                let cell = if n % 2 == 0 {
                    CellValue::Number(n as f64)
                } else {
                    CellValue::String(n.to_string())
                };
                ResultRow::from_pairs([("v", cell)])
            })
            .rev()
            .collect();
        let set = ResultSet::new(rows);

        let sorted = set.sort_by_column("v", SortOrder::Ascend);
        let values: Vec<f64> = sorted.iter().filter_map(|r| r.get("v")?.as_number()).collect();
        assert_eq!(values, (0..400).map(|n| n as f64).collect::<Vec<_>>());

        let sorted = set.sort_by_column("v", SortOrder::Descend);
        assert_eq!(sorted[0].get("v"), Some(&CellValue::String("399".into())));
        assert_eq!(sorted[399].get("v"), Some(&CellValue::Number(0.0)));
    }

    #[test]
    fn test_sort_numeric_column_ranks_text_after_numbers() {
        let set = ResultSet::new(vec![
            ResultRow::from_pairs([("v", CellValue::from("n/a"))]),
            ResultRow::from_pairs([("v", CellValue::from("10"))]),
            ResultRow::from_pairs([("v", CellValue::Null)]),
            ResultRow::from_pairs([("v", CellValue::Number(2.0))]),
        ]);
        let rows = set.sort_by_column("v", SortOrder::Ascend);
        let values: Vec<String> = rows.iter().map(|r| r.get("v").unwrap().to_string()).collect();
        assert_eq!(values, vec!["NULL", "2", "10", "n/a"]);
    }

    #[test]
    fn test_column_kind() {
        let (n, s, d) = (CellValue::Number(1.0), CellValue::from("x"), CellValue::from("2023-01-01"));
        assert_eq!(ColumnKind::of(&[&s, &d, &n]), ColumnKind::Numeric);
        assert_eq!(ColumnKind::of(&[&s, &d]), ColumnKind::Temporal);
        assert_eq!(ColumnKind::of(&[&s, &CellValue::Null]), ColumnKind::Text);
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse("descend").unwrap(), SortOrder::Descend);
        assert_eq!(SortOrder::parse("asc").unwrap(), SortOrder::Ascend);
        assert!(matches!(SortOrder::parse("up"), Err(ResultError::UnknownSortOrder(_))));
    }

    #[test]
    fn test_pagination() {
        let rows: Vec<ResultRow> = (0..12).map(|i| ResultRow::from_pairs([("n", i as f64)])).collect();
        let set = ResultSet::new(rows);
        assert_eq!(set.page_count(5), 3);
        assert_eq!(page(&set.rows, 0, 5).len(), 5);
        assert_eq!(page(&set.rows, 2, 5).len(), 2);
        assert!(page(&set.rows, 3, 5).is_empty());
        assert_eq!(set.page_count(0), 0);
    }
}
