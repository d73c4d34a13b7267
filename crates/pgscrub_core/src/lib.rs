// pgscrub_core: streaming COPY-block parser and column anonymization engine for PostgreSQL dumps.
use std::io::{BufRead, Write};

pub mod anonymizer;
pub mod error;
pub mod parser;
pub mod scanner;
pub mod schema;
pub mod tokenizer;

pub use anonymizer::{
    generator_for, Category, ColumnPolicy, KeyedHashGenerator, PersistenceMemo, PolicyConfig,
    RandomGenerator, Strategy, TablePolicy, Transformer, ValueGenerator, NULL_SENTINEL,
};
pub use error::{Result, ScrubError};
pub use parser::{parse_copy_header, CopyHeader};
pub use scanner::{classify, DumpScanner, LineEvent, ScanState, ScanStats};
pub use schema::{load_policies, policies_from_json};

/// Run one dump through the scanner. `memo` outlives the call so a driver can
/// report on it or carry it into a second input of the same run.
pub fn sanitize_dump<R: BufRead, W: Write>(
    policies: &PolicyConfig,
    generator: &dyn ValueGenerator,
    memo: &mut PersistenceMemo,
    reader: R,
    writer: W,
) -> Result<ScanStats> {
    DumpScanner::new(policies, generator, memo).run(reader, writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const POLICY: &str = r#"{
      "version": 1,
      "tables": {
        "public.\"Users\"": {
          "Email": { "type": "email", "persist": true },
          "CompanyInfo": { "type": "json", "keys": ["TaxId"] }
        },
        "public.\"Orders\"": {
          "Email": { "type": "email", "persist": true }
        }
      }
    }"#;

    #[test]
    fn test_memo_spans_inputs_of_one_run() {
        let cfg = policies_from_json(POLICY).unwrap();
        let generator = generator_for(cfg.strategy).unwrap();
        let mut memo = PersistenceMemo::new();

        let users = "COPY public.\"Users\" (\"Id\", \"Email\", \"CompanyInfo\") FROM stdin;\n\
                     1\tabc123@somedomain.com\t{\"TaxId\": \"SE123123-ABC\"}\n\
                     \\.\n";
        let orders = "COPY public.\"Orders\" (\"Id\", \"Email\") FROM stdin;\n\
                      5\tabc123@somedomain.com\n\
                      \\.\n";
        let mut out1 = Vec::new();
        let mut out2 = Vec::new();
        sanitize_dump(&cfg, &*generator, &mut memo, Cursor::new(users), &mut out1).unwrap();
        let stats = sanitize_dump(&cfg, &*generator, &mut memo, Cursor::new(orders), &mut out2).unwrap();
        assert_eq!(stats.rows_rewritten, 1);
        assert_eq!(memo.len(), 1);

        let replacement = memo.get("abc123@somedomain.com").unwrap().to_string();
        let out1 = String::from_utf8(out1).unwrap();
        let out2 = String::from_utf8(out2).unwrap();
        assert!(!out1.contains("abc123@somedomain.com") && !out1.contains("SE123123-ABC"));
        assert!(out1.contains(&replacement));
        assert!(out2.contains(&format!("5\t{}\n", replacement)));
    }
}
