//! On-disk record format shared by map and reduce executors.
//!
//! Every record is one line: the key, a single space, the value and a
//! trailing newline. Keys must not contain a space or a newline. The
//! value runs to the end of the line and may contain spaces.

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, Result};
use bytes::Bytes;

use crate::KeyValue;

pub const FIELD_SEPARATOR: u8 = b' ';
pub const RECORD_SEPARATOR: u8 = b'\n';

/// Name of the intermediate file written by map job `map_index` for
/// reduce shard `reduce_index`.
pub fn partition_file_name(map_index: u32, reduce_index: u32) -> String {
    format!("mr-{}-{}", map_index, reduce_index)
}

/// Name of the final output file of reduce shard `reduce_index`.
pub fn output_file_name(reduce_index: u32) -> String {
    format!("mr-out-{}", reduce_index)
}

/// Write a single `key value` line.
pub fn write_record<W: Write>(writer: &mut W, key: &[u8], value: &[u8]) -> io::Result<()> {
    writer.write_all(key)?;
    writer.write_all(&[FIELD_SEPARATOR])?;
    writer.write_all(value)?;
    writer.write_all(&[RECORD_SEPARATOR])
}

/// Parse a single line (without its trailing newline) into a record.
pub fn parse_record(line: &[u8]) -> Result<KeyValue> {
    let split = line
        .iter()
        .position(|&b| b == FIELD_SEPARATOR)
        .ok_or_else(|| anyhow!("malformed record `{}`", String::from_utf8_lossy(line)))?;

    Ok(KeyValue {
        key: Bytes::copy_from_slice(&line[..split]),
        value: Bytes::copy_from_slice(&line[split + 1..]),
    })
}

/// Lazily read records from a buffered reader, one per line. Empty lines
/// are skipped.
pub fn read_records<R: BufRead>(reader: R) -> impl Iterator<Item = Result<KeyValue>> {
    reader
        .split(RECORD_SEPARATOR)
        .filter(|line| !matches!(line, Ok(line) if line.is_empty()))
        .map(|line| parse_record(&line?))
}
