//! Word count. Emits `(word, "1")` for every word and sums them up.

use anyhow::Result;
use bytes::Bytes;

use common::utils::{parse_u64, string_from_bytes};
use common::{KeyValue, MapOutput};

pub fn map(kv: KeyValue) -> MapOutput {
    let contents = string_from_bytes(kv.value)?;
    let words = contents
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| Ok(KeyValue::new(w.to_string(), "1")))
        .collect::<Vec<Result<KeyValue>>>();
    Ok(Box::new(words.into_iter()))
}

pub fn reduce(_key: Bytes, values: Box<dyn Iterator<Item = Bytes> + '_>) -> Result<Bytes> {
    let mut count = 0u64;
    for value in values {
        count += parse_u64(&value)?;
    }
    Ok(Bytes::from(count.to_string()))
}
