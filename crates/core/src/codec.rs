//! Raw codec
//!
//! Converts caller-owned key/value views into store-owned entries, projects
//! records through mappers, and defines the persisted record layout.
//!
//! ## Persisted Layout
//!
//! ```text
//! key_len: u32 LE | key bytes (UTF-8) | value_len: u32 LE | value bytes | sequence: u64 LE
//! ```

use crate::error::{Result, StoreError};
use crate::record::{Entry, Record, RecordView};
use crate::types::{Key, SequenceNumber, Value};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

/// Fixed overhead of an encoded record (two length prefixes + sequence)
pub const RECORD_OVERHEAD: usize = 4 + 4 + 8;

/// Copy a borrowed key/value pair into an owned entry
///
/// The caller keeps ownership of both buffers.
pub fn encode(key: &str, value: &[u8]) -> Entry {
    Entry {
        key: Key::from(key),
        value: Value::from(value),
    }
}

/// Project a record through a caller-supplied mapper
///
/// Pure: the store is never touched.
pub fn decode<T, F>(record: RecordView<'_>, mapper: F) -> T
where
    F: FnOnce(RecordView<'_>) -> T,
{
    mapper(record)
}

/// Encoded size of a record
pub fn encoded_len(record: RecordView<'_>) -> usize {
    RECORD_OVERHEAD + record.key.len() + record.value.len()
}

fn len_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| StoreError::Serialization(format!("{} length {} exceeds u32", what, len)))
}

/// Append a length-prefixed key
pub fn write_key(buf: &mut Vec<u8>, key: &str) -> Result<()> {
    buf.write_u32::<LittleEndian>(len_u32(key.len(), "key")?)?;
    buf.extend_from_slice(key.as_bytes());
    Ok(())
}

/// Read a length-prefixed key
pub fn read_key(cursor: &mut Cursor<&[u8]>) -> Result<Key> {
    let bytes = read_len_prefixed(cursor, "key")?;
    String::from_utf8(bytes)
        .map(Key::from)
        .map_err(|e| StoreError::Corruption(format!("key is not valid UTF-8: {}", e)))
}

fn read_len_prefixed(cursor: &mut Cursor<&[u8]>, what: &str) -> Result<Vec<u8>> {
    let len = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| truncated(what))? as usize;
    let remaining = cursor.get_ref().len() as u64 - cursor.position();
    if (len as u64) > remaining {
        return Err(truncated(what));
    }
    let mut bytes = vec![0u8; len];
    cursor.read_exact(&mut bytes).map_err(|_| truncated(what))?;
    Ok(bytes)
}

fn truncated(what: &str) -> StoreError {
    StoreError::Corruption(format!("truncated record: incomplete {}", what))
}

/// Append a record in the persisted layout
pub fn write_record(buf: &mut Vec<u8>, record: RecordView<'_>) -> Result<()> {
    buf.reserve(encoded_len(record));
    write_key(buf, record.key)?;
    buf.write_u32::<LittleEndian>(len_u32(record.value.len(), "value")?)?;
    buf.extend_from_slice(record.value);
    buf.write_u64::<LittleEndian>(record.sequence_number.as_u64())?;
    Ok(())
}

/// Read a record from the cursor's position
pub fn read_record_from(cursor: &mut Cursor<&[u8]>) -> Result<Record> {
    let key = read_key(cursor)?;
    let value = Value::from(read_len_prefixed(cursor, "value")?);
    let sequence_number = cursor
        .read_u64::<LittleEndian>()
        .map_err(|_| truncated("sequence number"))?;
    Ok(Record {
        key,
        value,
        sequence_number: SequenceNumber::new(sequence_number),
    })
}

/// Decode a record from the start of `buf`
///
/// Returns the record and the number of bytes consumed.
pub fn read_record(buf: &[u8]) -> Result<(Record, usize)> {
    let mut cursor = Cursor::new(buf);
    let record = read_record_from(&mut cursor)?;
    Ok((record, cursor.position() as usize))
}
