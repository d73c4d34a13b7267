// anonymizer/transform.rs: per-field and per-row replacement engine
use serde_json::Value;
use std::borrow::Cow;

use super::generator::ValueGenerator;
use super::memo::PersistenceMemo;
use super::rules::{Category, ColumnPolicy, TablePolicy};
use crate::error::{Result, ScrubError};
use crate::tokenizer::{decode_field, encode_field, escape_copy_text, join_row, unescape_copy_text};

pub const NULL_SENTINEL: &str = "\\N";
pub const JSON_VALUE_LEN: usize = 10;
pub const EMAIL_MIN_LOCAL_LEN: usize = 6;
pub const EMAIL_TLD: &str = ".com";
const EMAIL_DOMAIN_TRIM: usize = 4;

#[derive(Debug, PartialEq, Eq)]
pub enum RowOutcome {
    /// An ignore rule matched; the row must be emitted as read.
    Ignored,
    Rewritten { line: Vec<u8>, replaced: usize },
}

/// Borrows the run's generator and memo; the driver keeps ownership of both.
pub struct Transformer<'a> {
    generator: &'a dyn ValueGenerator,
    memo: &'a mut PersistenceMemo,
}

impl<'a> Transformer<'a> {
    pub fn new(generator: &'a dyn ValueGenerator, memo: &'a mut PersistenceMemo) -> Self {
        Self { generator, memo }
    }

    pub fn memo(&self) -> &PersistenceMemo {
        &*self.memo
    }

    /// Positions in `fields` correspond to `columns`; the caller checks the counts.
    pub fn sanitize_row(
        &mut self,
        table: &TablePolicy,
        columns: &[String],
        fields: &[&[u8]],
    ) -> Result<RowOutcome> {
        if table.is_ignored_row(columns, fields) {
            return Ok(RowOutcome::Ignored);
        }
        let mut out: Vec<Cow<'_, [u8]>> = Vec::with_capacity(fields.len());
        let mut replaced = 0usize;
        for (name, &raw) in columns.iter().zip(fields) {
            match table.column(name) {
                Some(policy) => {
                    let (text, single_byte) = decode_field(raw);
                    let v = self.transform_field(name, policy, &text)?;
                    if v != text {
                        replaced += 1;
                    }
                    out.push(Cow::Owned(encode_field(&v, single_byte)));
                }
                None => out.push(Cow::Borrowed(raw)),
            }
        }
        Ok(RowOutcome::Rewritten { line: join_row(&out), replaced })
    }

    pub fn transform_field(&mut self, column: &str, policy: &ColumnPolicy, raw: &str) -> Result<String> {
        if raw == NULL_SENTINEL {
            return Ok(raw.to_string());
        }
        if policy.set_null {
            return Ok(NULL_SENTINEL.to_string());
        }
        match policy.category {
            Category::Json => self.json_value(column, policy, raw),
            Category::TextArray => self.array_value(policy, raw),
            Category::Text | Category::Email => self.scalar_value(policy, raw),
        }
    }

    fn scalar_value(&mut self, policy: &ColumnPolicy, raw: &str) -> Result<String> {
        if policy.persist {
            if let Some(hit) = self.memo.get(raw) {
                return Ok(hit.to_string());
            }
        }
        let candidate = match policy.category {
            Category::Email => self.email_candidate(policy, raw)?,
            _ => self.plain_candidate(policy, raw)?,
        };
        let value = apply_suffix(candidate, raw, &policy.suffixes);
        if policy.persist {
            Ok(self.memo.put(raw, value).to_string())
        } else {
            Ok(value)
        }
    }

    fn plain_candidate(&self, policy: &ColumnPolicy, raw: &str) -> Result<String> {
        let len = raw.chars().count();
        let target = policy.max_length.map_or(len, |m| len.min(m));
        self.generator.generate(raw, target)
    }

    fn email_candidate(&self, policy: &ColumnPolicy, raw: &str) -> Result<String> {
        let Some((local, domain)) = raw.rsplit_once('@') else {
            return self.plain_candidate(policy, raw);
        };
        let mut local_len = local.chars().count().max(EMAIL_MIN_LOCAL_LEN);
        let stem_len = domain.chars().count().saturating_sub(EMAIL_DOMAIN_TRIM);
        let mut stem_gen = stem_len.max(1);
        if let Some(m) = policy.max_length {
            // '@' and the TLD are fixed; local and stem need one char each
            let fixed = 1 + EMAIL_TLD.len();
            if m < fixed + 2 {
                return self.plain_candidate(policy, raw);
            }
            let budget = m - fixed;
            if local_len + stem_gen > budget {
                local_len = budget.saturating_sub(stem_gen).max(1);
                stem_gen = budget - local_len;
            }
        }
        let stem: String = domain.chars().take(stem_len).collect();
        let new_local = self.generator.generate(local, local_len)?;
        let new_stem = self.generator.generate(&stem, stem_gen)?;
        Ok(format!("{}@{}{}", new_local, new_stem, EMAIL_TLD))
    }

    fn json_value(&mut self, column: &str, policy: &ColumnPolicy, raw: &str) -> Result<String> {
        if policy.keys.is_empty() {
            return Ok(NULL_SENTINEL.to_string());
        }
        let decoded = unescape_copy_text(raw);
        let mut doc: Value = serde_json::from_str(&decoded)
            .map_err(|source| ScrubError::MalformedJson { column: column.to_string(), source })?;
        let obj = doc
            .as_object_mut()
            .ok_or_else(|| ScrubError::JsonNotObject(column.to_string()))?;
        for key in &policy.keys {
            if let Some(v) = obj.get_mut(key) {
                let seed = match &*v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                *v = Value::String(self.generator.generate(&seed, JSON_VALUE_LEN)?);
            }
        }
        let text = serde_json::to_string(&doc)
            .map_err(|source| ScrubError::JsonSerialize { column: column.to_string(), source })?;
        Ok(escape_copy_text(&text))
    }

    fn array_value(&mut self, policy: &ColumnPolicy, raw: &str) -> Result<String> {
        let inner = raw.strip_prefix('{').unwrap_or(raw);
        let inner = inner.strip_suffix('}').unwrap_or(inner);
        let mut out = String::with_capacity(raw.len() + 2);
        out.push('{');
        if !inner.is_empty() {
            for (i, element) in inner.split(',').enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&self.scalar_value(policy, element)?);
            }
        }
        out.push('}');
        Ok(out)
    }
}

/// Overwrites the tail of `candidate` with the first suffix `raw` ends with.
pub fn apply_suffix(candidate: String, raw: &str, suffixes: &[String]) -> String {
    let Some(suffix) = suffixes.iter().find(|s| !s.is_empty() && raw.ends_with(s.as_str())) else {
        return candidate;
    };
    // candidates are ASCII, any byte offset is a char boundary
    let keep = candidate.len().saturating_sub(suffix.len());
    let mut out = String::with_capacity(keep + suffix.len());
    out.push_str(&candidate[..keep]);
    out.push_str(suffix);
    out
}
