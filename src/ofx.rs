//! Statement boundary: turns an OFX document (SGML 1.x or XML 2.x) or a
//! JSON tree of an already-parsed OFX object into a flat list of
//! `RawStatementRecord`s. Nothing past this module looks at statement shape.

use serde_json::Value;
use tracing::debug;

use crate::error::{LedgerwiseError, Result};
use crate::models::RawStatementRecord;

/// Parse statement text, picking the format from its first character.
pub fn parse_statement(content: &str) -> Result<Vec<RawStatementRecord>> {
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with('{') {
        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| LedgerwiseError::Parse(format!("invalid JSON: {e}")))?;
        records_from_json(&value)
    } else {
        records_from_sgml(trimmed)
    }
}

// ---------------------------------------------------------------------------
// SGML / XML
// ---------------------------------------------------------------------------

pub fn records_from_sgml(content: &str) -> Result<Vec<RawStatementRecord>> {
    let upper = content.to_ascii_uppercase();
    if !upper.contains("<OFX>") {
        return Err(LedgerwiseError::Parse("missing <OFX> element".into()));
    }
    let has_list = upper.contains("<BANKTRANLIST>");
    let blocks = extract_blocks(content, "STMTTRN");
    if !has_list && blocks.is_empty() {
        return Err(LedgerwiseError::Parse("no transaction list in statement".into()));
    }

    let records: Vec<RawStatementRecord> = blocks
        .into_iter()
        .map(|block| RawStatementRecord {
            trnamt: extract_tag_value(block, "TRNAMT"),
            memo: extract_tag_value(block, "MEMO"),
            name: extract_tag_value(block, "NAME"),
            dtposted: extract_tag_value(block, "DTPOSTED"),
            fitid: extract_tag_value(block, "FITID"),
        })
        .collect();
    debug!(count = records.len(), "parsed OFX statement records");
    Ok(records)
}

fn extract_blocks<'a>(content: &'a str, tag: &str) -> Vec<&'a str> {
    let u = content.to_ascii_uppercase();
    let open = format!("<{}>", tag.to_ascii_uppercase());
    let close = format!("</{}>", tag.to_ascii_uppercase());

    let mut blocks = Vec::new();
    let mut search_from = 0usize;
    while let Some(start_rel) = u[search_from..].find(&open) {
        let start = search_from + start_rel + open.len();
        let rest = &u[start..];
        // SGML lets the closing tag go missing; stop at the next opening one.
        let end = match (rest.find(&close), rest.find(&open)) {
            (Some(c), Some(o)) => start + c.min(o),
            (Some(c), None) => start + c,
            (None, Some(o)) => start + o,
            (None, None) => content.len(),
        };
        blocks.push(&content[start..end]);
        search_from = end;
    }
    blocks
}

fn extract_tag_value(content: &str, tag: &str) -> Option<String> {
    let u = content.to_ascii_uppercase();
    let needle = format!("<{}>", tag.to_ascii_uppercase());
    let start = u.find(&needle)? + needle.len();
    let rest = &content[start..];
    let end = rest.find('<').unwrap_or(rest.len());
    let v = decode_entities(rest[..end].trim());
    (!v.is_empty()).then_some(v)
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

// ---------------------------------------------------------------------------
// JSON tree
// ---------------------------------------------------------------------------

const BANK_PATH: &[&str] = &["BANKMSGSRSV1", "STMTTRNRS", "STMTRS", "BANKTRANLIST"];
const CARD_PATH: &[&str] = &["CREDITCARDMSGSRSV1", "CCSTMTTRNRS", "CCSTMTRS", "BANKTRANLIST"];

pub fn records_from_json(value: &Value) -> Result<Vec<RawStatementRecord>> {
    let root = value.get("OFX").unwrap_or(value);
    let list = [BANK_PATH, CARD_PATH]
        .iter()
        .find_map(|path| walk(root, path))
        .ok_or_else(|| LedgerwiseError::Parse("no transaction list in statement".into()))?;

    let entries: Vec<&Value> = match list.get("STMTTRN") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single @ Value::Object(_)) => vec![single],
        Some(_) => return Err(LedgerwiseError::Parse("STMTTRN is not an object or list".into())),
    };

    let records: Vec<RawStatementRecord> = entries
        .into_iter()
        .map(|entry| RawStatementRecord {
            trnamt: scalar(entry, "TRNAMT"),
            memo: scalar(entry, "MEMO"),
            name: scalar(entry, "NAME"),
            dtposted: scalar(entry, "DTPOSTED"),
            fitid: scalar(entry, "FITID"),
        })
        .collect();
    debug!(count = records.len(), "parsed JSON statement records");
    Ok(records)
}

fn walk<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| node.get(*key))
}

fn scalar(entry: &Value, key: &str) -> Option<String> {
    match entry.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
