//! WAL entry framing
//!
//! ## Frame Layout
//!
//! ```text
//! len: u32 LE | crc32: u32 LE | kind: u8 | body
//! ```
//!
//! `len` counts `kind + body`; the CRC covers the same bytes. Bodies:
//!
//! | Kind | Entry | Body |
//! |------|-------|------|
//! | 1 | BeginTxn | txn_id: u64, timestamp_ms: i64 |
//! | 2 | Put | persisted record layout (see `rawkv_core::codec`) |
//! | 3 | Delete | length-prefixed key, retired sequence: u64 |
//! | 4 | CommitTxn | txn_id: u64, commit_version: u64 |

use crate::wal::WalEntry;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use rawkv_core::{codec, SequenceNumber, StoreError};
use std::io::Cursor;
use thiserror::Error;

/// Bytes before the entry kind: length + checksum
pub const FRAME_HEADER_SIZE: usize = 8;

const KIND_BEGIN: u8 = 1;
const KIND_PUT: u8 = 2;
const KIND_DELETE: u8 = 3;
const KIND_COMMIT: u8 = 4;

/// WAL read/write failures
#[derive(Debug, Error)]
pub enum WalError {
    /// File I/O failure
    #[error("WAL I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame cut short (torn write)
    #[error("incomplete entry at {offset}: need {needed} bytes, have {have}")]
    Incomplete {
        /// Offset of the frame
        offset: u64,
        /// Bytes available
        have: usize,
        /// Bytes required
        needed: usize,
    },

    /// Frame checksum does not match its contents
    #[error("checksum mismatch at {offset}: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Offset of the frame
        offset: u64,
        /// Checksum in the frame header
        stored: u32,
        /// Checksum of the frame contents
        computed: u32,
    },

    /// Frame decoded but its contents are not a valid entry
    #[error("malformed entry at {offset}: {reason}")]
    Malformed {
        /// Offset of the frame
        offset: u64,
        /// What was wrong
        reason: String,
    },
}

impl From<WalError> for StoreError {
    fn from(e: WalError) -> Self {
        match e {
            WalError::Io(io) => StoreError::Io(io),
            other => StoreError::Corruption(other.to_string()),
        }
    }
}

/// Append one framed entry to `buf`
pub fn encode_entry(entry: &WalEntry, buf: &mut Vec<u8>) -> Result<(), WalError> {
    let start = buf.len();
    buf.extend_from_slice(&[0u8; FRAME_HEADER_SIZE]);

    let malformed = |e: StoreError| WalError::Malformed {
        offset: start as u64,
        reason: e.to_string(),
    };

    match entry {
        WalEntry::BeginTxn {
            txn_id,
            timestamp_ms,
        } => {
            buf.push(KIND_BEGIN);
            buf.write_u64::<LittleEndian>(*txn_id)?;
            buf.write_i64::<LittleEndian>(*timestamp_ms)?;
        }
        WalEntry::Put(record) => {
            buf.push(KIND_PUT);
            codec::write_record(buf, record.view()).map_err(malformed)?;
        }
        WalEntry::Delete { key, retired } => {
            buf.push(KIND_DELETE);
            codec::write_key(buf, key.as_str()).map_err(malformed)?;
            buf.write_u64::<LittleEndian>(retired.as_u64())?;
        }
        WalEntry::CommitTxn {
            txn_id,
            commit_version,
        } => {
            buf.push(KIND_COMMIT);
            buf.write_u64::<LittleEndian>(*txn_id)?;
            buf.write_u64::<LittleEndian>(*commit_version)?;
        }
    }

    let body = &buf[start + FRAME_HEADER_SIZE..];
    let len = u32::try_from(body.len()).map_err(|_| WalError::Malformed {
        offset: start as u64,
        reason: format!("entry of {} bytes exceeds frame limit", body.len()),
    })?;
    let crc = crc32fast::hash(body);
    LittleEndian::write_u32(&mut buf[start..start + 4], len);
    LittleEndian::write_u32(&mut buf[start + 4..start + 8], crc);
    Ok(())
}

/// Total size of the frame at the start of `buf`, read from its header
///
/// `None` if the header itself is incomplete.
pub fn frame_size(buf: &[u8]) -> Option<usize> {
    if buf.len() < FRAME_HEADER_SIZE {
        return None;
    }
    Some(FRAME_HEADER_SIZE + LittleEndian::read_u32(&buf[0..4]) as usize)
}

/// Decode one framed entry from the start of `buf`
///
/// `offset` is the absolute position of `buf` in the log, used for error
/// reporting. Returns the entry and the number of bytes consumed.
pub fn decode_entry(buf: &[u8], offset: u64) -> Result<(WalEntry, usize), WalError> {
    if buf.len() < FRAME_HEADER_SIZE {
        return Err(WalError::Incomplete {
            offset,
            have: buf.len(),
            needed: FRAME_HEADER_SIZE,
        });
    }
    let total = frame_size(buf).unwrap_or(FRAME_HEADER_SIZE);
    let stored = LittleEndian::read_u32(&buf[4..8]);
    if buf.len() < total {
        return Err(WalError::Incomplete {
            offset,
            have: buf.len(),
            needed: total,
        });
    }

    let body = &buf[FRAME_HEADER_SIZE..total];
    let computed = crc32fast::hash(body);
    if computed != stored {
        return Err(WalError::ChecksumMismatch {
            offset,
            stored,
            computed,
        });
    }

    let malformed = |reason: String| WalError::Malformed { offset, reason };
    let (kind, payload) = body
        .split_first()
        .ok_or_else(|| malformed("empty frame".to_string()))?;
    let mut cursor = Cursor::new(payload);

    let entry = match *kind {
        KIND_BEGIN => WalEntry::BeginTxn {
            txn_id: cursor.read_u64::<LittleEndian>()?,
            timestamp_ms: cursor.read_i64::<LittleEndian>()?,
        },
        KIND_PUT => {
            WalEntry::Put(codec::read_record_from(&mut cursor).map_err(|e| malformed(e.to_string()))?)
        }
        KIND_DELETE => {
            let key = codec::read_key(&mut cursor).map_err(|e| malformed(e.to_string()))?;
            let retired = SequenceNumber::new(cursor.read_u64::<LittleEndian>()?);
            WalEntry::Delete { key, retired }
        }
        KIND_COMMIT => WalEntry::CommitTxn {
            txn_id: cursor.read_u64::<LittleEndian>()?,
            commit_version: cursor.read_u64::<LittleEndian>()?,
        },
        other => return Err(malformed(format!("unknown entry kind {}", other))),
    };

    if cursor.position() as usize != payload.len() {
        return Err(malformed(format!(
            "{} trailing bytes in frame",
            payload.len() - cursor.position() as usize
        )));
    }
    Ok((entry, total))
}
