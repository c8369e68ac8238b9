//! Binary encoding.
//!
//! A digest is encoded as:
//!
//! | field        | encoding                              |
//! |--------------|---------------------------------------|
//! | version      | `u8`, currently `1`                   |
//! | error bound  | `f64`, little-endian                  |
//! | zero count   | unsigned varint                       |
//! | bucket count | unsigned varint, `k`                  |
//! | buckets      | `k` x (index delta, count)            |
//!
//! Buckets are written in ascending index order. Each index is written as the zig-zag encoded difference from the
//! previous bucket's index (the first from zero), followed by the bucket's count as an unsigned varint. Varints use
//! seven bits per byte, least significant group first, with the high bit set on all but the last byte.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use snafu::{ensure, OptionExt as _, ResultExt as _};
use tracing::{debug, trace};

use crate::digest::Digest;
use crate::error::*;
use crate::mapping::BucketIndexer;
use crate::store::SparseStore;

const FORMAT_VERSION: u8 = 1;

// Every bucket needs at least one byte for its index delta and one for its count.
const MIN_BUCKET_LEN: usize = 2;

impl Digest {
    /// Returns the length of this digest's binary encoding, in bytes.
    pub fn encoded_len(&self) -> usize {
        let mut len = 1 + 8 + sizeof_varint(self.zero_count()) + sizeof_varint(self.size() as u64);
        let mut previous = 0i64;
        for (index, count) in self.buckets() {
            len += sizeof_varint(zigzag_encode(index.wrapping_sub(previous))) + sizeof_varint(count);
            previous = index;
        }
        len
    }

    /// Writes the binary encoding of this digest to `buf`.
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(FORMAT_VERSION);
        buf.put_f64_le(self.error_bound());
        put_varint(buf, self.zero_count());
        put_varint(buf, self.size() as u64);

        let mut previous = 0i64;
        for (index, count) in self.buckets() {
            put_varint(buf, zigzag_encode(index.wrapping_sub(previous)));
            put_varint(buf, count);
            previous = index;
        }
    }

    /// Returns the binary encoding of this digest.
    pub fn marshal_binary(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Decodes a digest from its binary encoding.
    ///
    /// The buffer must hold exactly one encoded digest.
    ///
    /// # Errors
    ///
    /// If the buffer is truncated, has trailing bytes, uses an unknown format version, or otherwise does not describe a
    /// valid digest, an error is returned.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let digest = decode_digest(buf)
            .inspect_err(|e| debug!(error = %e, len = buf.len(), "Failed to decode digest."))
            .context(CorruptData)?;

        trace!(
            error_bound = digest.error_bound(),
            buckets = digest.size(),
            count = digest.count(),
            "Decoded digest."
        );

        Ok(digest)
    }

    /// Replaces the state of this digest with the one decoded from `buf`.
    ///
    /// This is not a merge: the current error bound and counts are discarded. The error bound of the encoded digest is
    /// adopted.
    ///
    /// # Errors
    ///
    /// If decoding fails, an error is returned and this digest is left unchanged. See [`Digest::decode`].
    pub fn unmarshal_binary(&mut self, buf: &[u8]) -> Result<(), Error> {
        *self = Self::decode(buf)?;
        Ok(())
    }
}

fn decode_digest(mut buf: &[u8]) -> Result<Digest, DecodeError> {
    ensure!(buf.has_remaining(), Truncated { field: "version" });
    let version = buf.get_u8();
    ensure!(version == FORMAT_VERSION, UnsupportedVersion { version });

    ensure!(buf.remaining() >= 8, Truncated { field: "error bound" });
    let error_bound = buf.get_f64_le();
    let indexer = BucketIndexer::new(error_bound)
        .ok()
        .context(ErrorBoundOutOfRange { error_bound })?;

    let zero_count = get_varint(&mut buf, "zero count")?;
    let declared = get_varint(&mut buf, "number of buckets")?;
    let remaining = buf.remaining();
    ensure!(
        declared <= (remaining / MIN_BUCKET_LEN) as u64,
        BucketCountMismatch { declared, remaining }
    );

    // Decode into a fresh store so a failure part way through never leaks into a live digest.
    let mut store = SparseStore::new();
    let mut total = zero_count;
    let mut previous: Option<i64> = None;
    for _ in 0..declared {
        let delta = zigzag_decode(get_varint(&mut buf, "bucket index")?);
        let base = previous.unwrap_or(0);
        let index = base
            .checked_add(delta)
            .context(IndexOverflow { previous: base, delta })?;
        if let Some(previous) = previous {
            ensure!(index > previous, NonIncreasingIndex { previous, index });
        }

        let count = get_varint(&mut buf, "bucket count")?;
        ensure!(count > 0, EmptyBucket { index });
        total = total.checked_add(count).context(TotalCountOverflow)?;

        store.add(index, count).ok().context(TotalCountOverflow)?;
        previous = Some(index);
    }

    ensure!(
        !buf.has_remaining(),
        TrailingBytes {
            remaining: buf.remaining()
        }
    );

    Ok(Digest::from_parts(indexer, store, zero_count))
}

fn put_varint<B: BufMut>(buf: &mut B, mut v: u64) {
    while v > 0x7F {
        buf.put_u8(((v as u8) & 0x7F) | 0x80);
        v >>= 7;
    }
    buf.put_u8(v as u8);
}

fn get_varint(buf: &mut &[u8], field: &'static str) -> Result<u64, DecodeError> {
    let mut value = 0u64;
    for shift in (0..64).step_by(7) {
        ensure!(buf.has_remaining(), Truncated { field });
        let byte = buf.get_u8();

        // The tenth byte carries only the top bit of a u64.
        ensure!(shift < 63 || byte <= 1, VarintOverflow { field });

        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }

    VarintOverflow { field }.fail()
}

/// Computes the encoded size of a varint.
fn sizeof_varint(v: u64) -> usize {
    match v {
        0x0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1FFFFF => 3,
        0x200000..=0xFFFFFFF => 4,
        0x10000000..=0x7FFFFFFFF => 5,
        0x0800000000..=0x3FFFFFFFFFF => 6,
        0x040000000000..=0x1FFFFFFFFFFFF => 7,
        0x02000000000000..=0xFFFFFFFFFFFFFF => 8,
        0x0100000000000000..=0x7FFFFFFFFFFFFFFF => 9,
        _ => 10,
    }
}

const fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

const fn zigzag_decode(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}
