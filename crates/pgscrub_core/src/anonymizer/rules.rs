// anonymizer/rules.rs: column policy configuration types and per-table lookup
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    #[serde(alias = "plain")]
    Text,
    Email,
    Json,
    #[serde(alias = "array")]
    TextArray,
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    Random,
    KeyedHash,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct ColumnPolicy {
    #[serde(rename = "type", default)]
    pub category: Category,
    #[serde(default)]
    pub persist: bool,
    #[serde(default)]
    pub set_null: bool,
    /// First suffix the raw value ends with is kept on the replacement.
    #[serde(default)]
    pub suffixes: Vec<String>,
    /// JSON keys to replace; only meaningful for `Category::Json`.
    #[serde(default)]
    pub keys: Vec<String>,
    pub max_length: Option<usize>,
    /// column -> values; a row matching any of them is left untouched.
    #[serde(default)]
    pub ignore_rows: HashMap<String, Vec<String>>,
}

impl ColumnPolicy {
    pub fn new(category: Category) -> Self {
        Self { category, ..Self::default() }
    }

    pub fn persisted(mut self) -> Self {
        self.persist = true;
        self
    }
}

/// Column name -> policy for one fully-qualified table.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(transparent)]
pub struct TablePolicy {
    pub columns: HashMap<String, ColumnPolicy>,
}

impl TablePolicy {
    pub fn column(&self, name: &str) -> Option<&ColumnPolicy> {
        self.columns.get(name)
    }

    /// True when some ignore rule matches the row's value at its designated column.
    /// Rules naming a column the block does not carry never match.
    pub fn is_ignored_row<S: AsRef<[u8]>>(&self, column_names: &[String], fields: &[S]) -> bool {
        self.columns
            .values()
            .flat_map(|p| p.ignore_rows.iter())
            .any(|(column, values)| {
                column_names
                    .iter()
                    .zip(fields)
                    .filter(|(name, _)| *name == column)
                    .any(|(_, field)| values.iter().any(|v| v.as_bytes() == field.as_ref()))
            })
    }
}

/// Full policy set: fully-qualified table name -> table policy.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct PolicyConfig {
    pub version: Option<u32>,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub tables: HashMap<String, TablePolicy>,
}

impl PolicyConfig {
    pub fn table(&self, name: &str) -> Option<&TablePolicy> {
        self.tables.get(name)
    }

    pub fn with_table(mut self, name: &str, columns: Vec<(&str, ColumnPolicy)>) -> Self {
        let table = TablePolicy {
            columns: columns.into_iter().map(|(c, p)| (c.to_string(), p)).collect(),
        };
        self.tables.insert(name.to_string(), table);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_deserialize_column_policy() {
        let p: ColumnPolicy = serde_json::from_str(
            r#"{ "type": "array", "persist": true, "suffixes": ["-TRIAL"], "max_length": 8 }"#,
        )
        .unwrap();
        assert_eq!(p.category, Category::TextArray);
        assert!(p.persist);
        assert!(!p.set_null);
        assert_eq!(p.suffixes, vec!["-TRIAL"]);
        assert_eq!(p.max_length, Some(8));

        let d: ColumnPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(d.category, Category::Text);
        assert!(d.keys.is_empty() && d.ignore_rows.is_empty());
    }

    #[test]
    fn test_table_lookup() {
        let cfg = PolicyConfig::default()
            .with_table("public.\"Users\"", vec![("Email", ColumnPolicy::new(Category::Email))]);
        assert!(cfg.table("public.\"Users\"").is_some());
        assert!(cfg.table("public.Users").is_none());
        let t = cfg.table("public.\"Users\"").unwrap();
        assert_eq!(t.column("Email").unwrap().category, Category::Email);
        assert!(t.column("Name").is_none());
    }

    #[test]
    fn test_ignored_row_matching() {
        let mut key = ColumnPolicy::new(Category::Text);
        key.ignore_rows.insert("Key".to_string(), vec!["BG785VXY".to_string()]);
        let cfg = PolicyConfig::default().with_table("t", vec![("Key", key)]);
        let t = cfg.table("t").unwrap();
        let names = cols(&["Key", "UserId"]);

        assert!(t.is_ignored_row(&names, &["BG785VXY", "1"]));
        assert!(!t.is_ignored_row(&names, &["OTHER", "1"]));
        // Value only matches at the designated column
        assert!(!t.is_ignored_row(&names, &["OTHER", "BG785VXY"]));
        // Designated column absent from the block
        assert!(!t.is_ignored_row(&cols(&["Id"]), &["BG785VXY"]));
    }
}
