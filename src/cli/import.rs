use std::path::Path;

use anyhow::{bail, Context as _};
use serde_json::Value;

use crate::cli::Context;
use crate::store::{DocumentStore, Fields};

/// Documents in `value`: an array (ids assigned, or taken from an `id`
/// field) or an object keyed by id.
fn documents(value: Value) -> anyhow::Result<Vec<(Option<String>, Fields)>> {
    let as_fields = |v: Value, at: &str| -> anyhow::Result<Fields> {
        match v {
            Value::Object(map) => Ok(map),
            other => bail!("document {at} is not an object: {other}"),
        }
    };
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| -> anyhow::Result<(Option<String>, Fields)> {
                let mut fields = as_fields(v, &format!("#{}", i + 1))?;
                let id = match fields.remove("id") {
                    Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
                    Some(other) if !other.is_null() => {
                        fields.insert("id".to_string(), other);
                        None
                    }
                    _ => None,
                };
                Ok((id, fields))
            })
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .map(|(id, v)| -> anyhow::Result<(Option<String>, Fields)> {
                let fields = as_fields(v, &id)?;
                Ok((Some(id), fields))
            })
            .collect(),
        _ => bail!("expected a JSON array or object of documents"),
    }
}

pub fn run(file: &str, collection: &str) -> anyhow::Result<()> {
    let path = Path::new(file);
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let docs = documents(value)?;

    let ctx = Context::open()?;
    let mut written = 0;
    for (id, fields) in docs {
        match id {
            Some(id) => ctx.store.write_document(collection, &id, fields, false)?,
            None => {
                ctx.store.insert_document(collection, fields)?;
            }
        }
        written += 1;
    }

    println!("{written} documents imported into {collection}");
    Ok(())
}
