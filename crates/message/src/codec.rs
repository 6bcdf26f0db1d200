//! Wire codec for shipping batches between processes.
//!
//! The frame is self-describing: a big-endian `u32` part count, then for
//! each part a big-endian `u32` length followed by exactly that many
//! bytes. Truncated frames, inconsistent lengths and trailing bytes are
//! all rejected.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Batch, Error, Part};

#[cfg(test)]
#[path = "codec_test.rs"]
mod tests;

/// Serialise a batch into its wire frame.
pub fn encode_batch(batch: &Batch) -> Bytes {
    let payload: usize = batch.iter().map(|p| 4 + p.body().len()).sum();
    let mut buf = BytesMut::with_capacity(4 + payload);
    buf.put_u32(batch.len() as u32);
    for part in batch {
        buf.put_u32(part.body().len() as u32);
        buf.put_slice(part.body());
    }
    buf.freeze()
}

/// Deserialise a batch from its wire frame.
pub fn decode_batch(data: &[u8]) -> Result<Batch, Error> {
    if data.len() < 4 {
        return Err(Error::InvalidFormat(
            "frame shorter than part count".to_owned(),
        ));
    }
    let count = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;

    let mut rest = &data[4..];
    let mut batch = Batch::new();
    for i in 0..count {
        if rest.len() < 4 {
            return Err(Error::InvalidFormat(format!(
                "truncated length prefix for part {i}"
            )));
        }
        let len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        rest = &rest[4..];
        if rest.len() < len {
            return Err(Error::InvalidFormat(format!(
                "part {i} declares {len} bytes, {} remain",
                rest.len()
            )));
        }
        batch.push(Part::new(Bytes::copy_from_slice(&rest[..len])));
        rest = &rest[len..];
    }
    if !rest.is_empty() {
        return Err(Error::InvalidFormat(format!(
            "{} trailing bytes after final part",
            rest.len()
        )));
    }
    Ok(batch)
}
