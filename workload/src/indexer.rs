//! Inverted index. For every word, the number of sources containing it
//! and their sorted, comma separated names.

use std::collections::BTreeSet;

use anyhow::Result;
use bytes::Bytes;

use common::utils::string_from_bytes;
use common::{KeyValue, MapOutput};

pub fn map(kv: KeyValue) -> MapOutput {
    let source = kv.key.clone();
    let contents = string_from_bytes(kv.value)?;

    let words = contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>();

    let iter = words
        .into_iter()
        .map(move |w| -> Result<KeyValue> { Ok(KeyValue::new(w, source.clone())) });
    Ok(Box::new(iter))
}

pub fn reduce(_key: Bytes, values: Box<dyn Iterator<Item = Bytes> + '_>) -> Result<Bytes> {
    // A re-executed map task may deliver the same source twice.
    let sources = values
        .map(string_from_bytes)
        .collect::<Result<BTreeSet<_>>>()?;
    let count = sources.len();
    let joined = sources.into_iter().collect::<Vec<_>>().join(",");
    Ok(Bytes::from(format!("{} {}", count, joined)))
}
