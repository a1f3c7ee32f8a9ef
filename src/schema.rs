//! Instance schema payload and the database → table → column tree built from it.

use serde::{Deserialize, Deserializer, Serialize};

/// Separator joining ancestor names into a node key.
pub const DEFAULT_KEY_SEPARATOR: &str = "-";

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Invalid schema payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Schema of one instance as delivered by the schema-fetch API.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct InstanceSchema {
    #[serde(default, deserialize_with = "null_as_default")]
    pub databases: Vec<Database>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Database {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Table {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(default)]
    pub data_type: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl InstanceSchema {
    /// Parse the schema-fetch payload.
    pub fn from_json(input: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Build the display tree, joining names with `separator` to form keys.
    pub fn to_tree(&self, separator: &str) -> Vec<SchemaNode> {
        self.databases
            .iter()
            .map(|db| {
                let tables = db
                    .tables
                    .iter()
                    .map(|table| {
                        let table_key = format!("{}{}{}", db.name, separator, table.name);
                        let columns = table
                            .columns
                            .iter()
                            .map(|col| {
                                SchemaNode::column(
                                    format!("{}{}{}", table_key, separator, col.name),
                                    &col.name,
                                    col.data_type.clone(),
                                )
                            })
                            .collect();
                        SchemaNode::table(table_key, &table.name, columns)
                    })
                    .collect();
                SchemaNode::database(&db.name, tables)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Database,
    Table,
    Column,
}

/// A node of the schema tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    pub key: String,
    pub title: String,
    pub kind: NodeKind,
    /// Raw column type, only present on column nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Icon category, only present on column nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<DataTypeCategory>,
    /// `None` on leaves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<SchemaNode>>,
}

impl SchemaNode {
    pub fn database(name: &str, tables: Vec<SchemaNode>) -> Self {
        Self {
            key: name.to_string(),
            title: name.to_string(),
            kind: NodeKind::Database,
            data_type: None,
            category: None,
            children: Some(tables),
        }
    }

    pub fn table(key: String, name: &str, columns: Vec<SchemaNode>) -> Self {
        Self {
            key,
            title: name.to_string(),
            kind: NodeKind::Table,
            data_type: None,
            category: None,
            children: Some(columns),
        }
    }

    pub fn column(key: String, name: &str, data_type: Option<String>) -> Self {
        let category = data_type
            .as_deref()
            .map(DataTypeCategory::classify)
            .unwrap_or(DataTypeCategory::Other);
        Self {
            key,
            title: name.to_string(),
            kind: NodeKind::Column,
            data_type,
            category: Some(category),
            children: None,
        }
    }

    pub fn children(&self) -> &[SchemaNode] {
        self.children.as_deref().unwrap_or(&[])
    }
}

/// Column type family, used to pick a column icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataTypeCategory {
    Number,
    String,
    Binary,
    Time,
    Other,
}

const NUMBER_TYPES: &[&str] = &[
    "tinyint",
    "smallint",
    "mediumint",
    "int",
    "bigint",
    "float",
    "double",
    "double precision",
    "real",
    "decimal",
    "bit",
    "serial",
    "bool",
    "boolean",
    "dec",
    "fixed",
    "numeric",
];

const STRING_TYPES: &[&str] = &[
    "char",
    "varchar",
    "tinytext",
    "mediumtext",
    "text",
    "longtext",
    "enum",
    "set",
];

const BINARY_TYPES: &[&str] = &[
    "tinyblob",
    "mediumblob",
    "blob",
    "longblob",
    "binary",
    "varbinary",
];

const TIME_TYPES: &[&str] = &["date", "datetime", "timestamp", "year", "time"];

impl DataTypeCategory {
    /// Classify a raw type name. Matching is on the whole lower-cased name,
    /// so `varchar(255)` is `Other`.
    pub fn classify(data_type: &str) -> Self {
        let lower = data_type.to_lowercase();
        let lower = lower.as_str();
        if NUMBER_TYPES.contains(&lower) {
            Self::Number
        } else if STRING_TYPES.contains(&lower) {
            Self::String
        } else if BINARY_TYPES.contains(&lower) {
            Self::Binary
        } else if TIME_TYPES.contains(&lower) {
            Self::Time
        } else {
            Self::Other
        }
    }
}

/// Keys expanded right after a schema load: every database.
pub fn initial_expanded_keys(tree: &[SchemaNode]) -> Vec<String> {
    tree.iter()
        .filter(|n| n.kind == NodeKind::Database)
        .map(|n| n.key.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "databases": [
            {
                "name": "shop",
                "tables": [
                    {
                        "name": "orders",
                        "columns": [
                            { "name": "id", "dataType": "BIGINT" },
                            { "name": "note", "dataType": "varchar" }
                        ]
                    },
                    { "name": "empty", "columns": null }
                ]
            },
            { "name": "audit" }
        ]
    }"#;

    #[test]
    fn test_parse_payload() {
        let schema = InstanceSchema::from_json(PAYLOAD).unwrap();
        assert_eq!(schema.databases.len(), 2);
        assert_eq!(schema.databases[0].tables[0].columns[0].data_type.as_deref(), Some("BIGINT"));
        assert!(schema.databases[0].tables[1].columns.is_empty());
        assert!(schema.databases[1].tables.is_empty());
    }

    #[test]
    fn test_null_databases() {
        let schema = InstanceSchema::from_json(r#"{"databases": null}"#).unwrap();
        assert!(schema.to_tree(DEFAULT_KEY_SEPARATOR).is_empty());
    }

    #[test]
    fn test_invalid_payload() {
        assert!(InstanceSchema::from_json("{\"databases\": 3}").is_err());
    }

    #[test]
    fn test_tree_keys() {
        let tree = InstanceSchema::from_json(PAYLOAD).unwrap().to_tree(DEFAULT_KEY_SEPARATOR);
        let orders = &tree[0].children()[0];
        assert_eq!(tree[0].key, "shop");
        assert_eq!(orders.key, "shop-orders");
        assert_eq!(orders.title, "orders");
        assert_eq!(orders.children()[1].key, "shop-orders-note");
        assert_eq!(orders.children()[1].kind, NodeKind::Column);
        assert!(orders.children()[1].children.is_none());
    }

    #[test]
    fn test_custom_separator() {
        let tree = InstanceSchema::from_json(PAYLOAD).unwrap().to_tree(".");
        assert_eq!(tree[0].children()[0].children()[0].key, "shop.orders.id");
    }

    #[test]
    fn test_classify() {
        assert_eq!(DataTypeCategory::classify("BIGINT"), DataTypeCategory::Number);
        assert_eq!(DataTypeCategory::classify("double precision"), DataTypeCategory::Number);
        assert_eq!(DataTypeCategory::classify("longtext"), DataTypeCategory::String);
        assert_eq!(DataTypeCategory::classify("varbinary"), DataTypeCategory::Binary);
        assert_eq!(DataTypeCategory::classify("Timestamp"), DataTypeCategory::Time);
        assert_eq!(DataTypeCategory::classify("json"), DataTypeCategory::Other);
        assert_eq!(DataTypeCategory::classify("varchar(255)"), DataTypeCategory::Other);
    }

    #[test]
    fn test_category_only_on_columns() {
        let tree = InstanceSchema::from_json(PAYLOAD).unwrap().to_tree(DEFAULT_KEY_SEPARATOR);
        assert_eq!(tree[0].category, None);
        let id = &tree[0].children()[0].children()[0];
        assert_eq!(id.category, Some(DataTypeCategory::Number));
        let untyped = SchemaNode::column("a-b-c".to_string(), "c", None);
        assert_eq!(untyped.category, Some(DataTypeCategory::Other));
    }

    #[test]
    fn test_initial_expanded_keys() {
        let tree = InstanceSchema::from_json(PAYLOAD).unwrap().to_tree(DEFAULT_KEY_SEPARATOR);
        assert_eq!(initial_expanded_keys(&tree), vec!["shop", "audit"]);
    }
}
