//! Search index descriptors and the schemas used by the workloads

use serde::{Deserialize, Serialize};
use std::fmt;

/// Document shape an index covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexOn {
    Json,
    Hash,
}

impl fmt::Display for IndexOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexOn::Json => write!(f, "JSON"),
            IndexOn::Hash => write!(f, "HASH"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldKind {
    Numeric,
    Tag,
    Text,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Numeric => write!(f, "NUMERIC"),
            FieldKind::Tag => write!(f, "TAG"),
            FieldKind::Text => write!(f, "TEXT"),
        }
    }
}

/// One `path AS alias TYPE [SORTABLE]` schema entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// JSON path (`$.id`) or hash field name
    pub path: String,
    pub alias: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub sortable: bool,
}

impl SchemaField {
    pub fn new(path: &str, alias: &str, kind: FieldKind) -> Self {
        Self {
            path: path.to_string(),
            alias: alias.to_string(),
            kind,
            sortable: false,
        }
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    /// Document attribute this field reads (`$.id` -> `id`)
    pub fn attribute(&self) -> &str {
        self.path.strip_prefix("$.").unwrap_or(&self.path)
    }
}

/// Name, key-prefix filter and schema of a search index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub on: IndexOn,
    pub prefix: String,
    pub fields: Vec<SchemaField>,
}

impl IndexDescriptor {
    /// Arguments following `FT.CREATE`
    pub fn create_args(&self) -> Vec<String> {
        let mut args = vec![
            self.name.clone(),
            "ON".to_string(),
            self.on.to_string(),
            "PREFIX".to_string(),
            "1".to_string(),
            self.prefix.clone(),
            "SCHEMA".to_string(),
        ];
        for field in &self.fields {
            args.push(field.path.clone());
            args.push("AS".to_string());
            args.push(field.alias.clone());
            args.push(field.kind.to_string());
            if field.sortable {
                args.push("SORTABLE".to_string());
            }
        }
        args
    }

    pub fn field(&self, alias: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.alias == alias)
    }
}

fn merchant_fields() -> Vec<SchemaField> {
    vec![
        SchemaField::new("$.id", "id", FieldKind::Numeric),
        SchemaField::new("$.cnpj", "cnpj", FieldKind::Tag),
        SchemaField::new("$.company_name", "company_name", FieldKind::Text),
        SchemaField::new("$.state", "state", FieldKind::Tag),
        SchemaField::new("$.channel", "channel", FieldKind::Tag),
        SchemaField::new("$.network_code", "network_code", FieldKind::Numeric),
        SchemaField::new("$.mcc", "mcc", FieldKind::Tag),
    ]
}

/// Schema created around the bulk seed; company names are sortable
pub fn merchant_index(name: &str, prefix: &str) -> IndexDescriptor {
    let mut fields = merchant_fields();
    fields[2] = fields[2].clone().sortable();
    IndexDescriptor {
        name: name.to_string(),
        on: IndexOn::Json,
        prefix: prefix.to_string(),
        fields,
    }
}

/// Schema ensured by the probe: merchant fields plus the write timestamp
pub fn probe_index(name: &str, prefix: &str) -> IndexDescriptor {
    let mut fields = merchant_fields();
    fields.push(SchemaField::new("$.t0ms", "t0ms", FieldKind::Numeric));
    IndexDescriptor {
        name: name.to_string(),
        on: IndexOn::Json,
        prefix: prefix.to_string(),
        fields,
    }
}
