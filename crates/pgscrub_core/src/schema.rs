// schema.rs: policy document loading and validation
use log::{info, warn};
use std::fs;
use std::path::Path;

use crate::anonymizer::rules::{Category, PolicyConfig};
use crate::error::{Result, ScrubError};

pub const SUPPORTED_VERSION: u32 = 1;

pub fn policies_from_json(json: &str) -> Result<PolicyConfig> {
    let cfg: PolicyConfig = serde_json::from_str(json)
        .map_err(|e| ScrubError::Config(format!("Failed to parse policy JSON: {}", e)))?;
    validate(&cfg)?;
    Ok(cfg)
}

pub fn load_policies(path: &Path) -> Result<PolicyConfig> {
    let data = fs::read_to_string(path)
        .map_err(|e| ScrubError::Config(format!("Failed to read policy file {}: {}", path.display(), e)))?;
    let cfg = policies_from_json(&data)?;
    let columns: usize = cfg.tables.values().map(|t| t.columns.len()).sum();
    info!(
        "loaded policies from {}: {} tables, {} columns, {:?} strategy",
        path.display(),
        cfg.tables.len(),
        columns,
        cfg.strategy
    );
    Ok(cfg)
}

fn validate(cfg: &PolicyConfig) -> Result<()> {
    if let Some(v) = cfg.version {
        if v != SUPPORTED_VERSION {
            return Err(ScrubError::Config(format!("Unsupported policy config version: {}", v)));
        }
    }
    for (table, policy) in &cfg.tables {
        for (column, p) in &policy.columns {
            if p.max_length == Some(0) {
                return Err(ScrubError::Config(format!("{}.{}: max_length must be positive", table, column)));
            }
            if !p.keys.is_empty() && p.category != Category::Json {
                warn!("{}.{}: keys only apply to json columns, ignoring", table, column);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymizer::rules::Strategy;
    use std::io::Write;

    const POLICY: &str = r#"{
      "version": 1,
      "strategy": "keyed_hash",
      "tables": {
        "public.\"Users\"": {
          "Email": { "type": "email", "persist": true },
          "ScreenName": { "type": "text" },
          "CompanyInfo": { "type": "json", "keys": ["TaxId", "PostalCode"] },
          "PasswordHash": { "set_null": true }
        },
        "public.\"LicenseKeys\"": {
          "Key": { "persist": true, "suffixes": ["-TRIAL", "-NFR"], "ignore_rows": { "Key": ["SERVICE"] } }
        },
        "public.\"TransferRequests\"": {
          "Keys": { "type": "text_array", "persist": true }
        }
      }
    }"#;

    #[test]
    fn test_policies_from_json() {
        let cfg = policies_from_json(POLICY).expect("policy");
        assert_eq!(cfg.strategy, Strategy::KeyedHash);
        assert_eq!(cfg.tables.len(), 3);
        let users = cfg.table("public.\"Users\"").unwrap();
        assert_eq!(users.column("CompanyInfo").unwrap().keys, vec!["TaxId", "PostalCode"]);
        assert!(users.column("PasswordHash").unwrap().set_null);
        let keys = cfg.table("public.\"LicenseKeys\"").unwrap().column("Key").unwrap();
        assert_eq!(keys.category, Category::Text);
        assert_eq!(keys.ignore_rows.get("Key").unwrap(), &vec!["SERVICE".to_string()]);
    }

    #[test]
    fn test_rejects_bad_documents() {
        for bad in [
            r#"{ "version": 2 }"#,
            r#"{ "tables": { "t": { "c": { "type": "blob" } } } }"#,
            r#"{ "tables": { "t": { "c": { "max_length": 0 } } } }"#,
            r#"{ "strategy": "xor" }"#,
            "not json",
        ] {
            assert!(matches!(policies_from_json(bad), Err(ScrubError::Config(_))), "accepted {}", bad);
        }
        // version and strategy are optional
        let cfg = policies_from_json("{}").unwrap();
        assert_eq!(cfg.strategy, Strategy::Random);
        assert!(cfg.tables.is_empty());
    }

    #[test]
    fn test_load_policies_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(POLICY.as_bytes()).unwrap();
        let cfg = load_policies(f.path()).expect("load");
        assert!(cfg.table("public.\"TransferRequests\"").is_some());

        let missing = f.path().with_extension("missing");
        assert!(matches!(load_policies(&missing), Err(ScrubError::Config(_))));
    }
}
