// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The byte-stream serialization contract used by the whole engine.
//!
//! Every value the engine persists (component records, system state blobs,
//! the container snapshot itself) flows through [`ByteCodec`]. Types come
//! in two flavours:
//!
//! - **Trivial** types (`TRIVIAL == true`) are stored as their raw memory
//!   layout at a fixed size. These are `bytemuck::Pod` types wired up via
//!   the [`impl_trivial_codec!`](crate::impl_trivial_codec) macro.
//! - **Complex** types provide explicit length/encode/decode logic and are
//!   stored behind a fixed-width `u32` length prefix wherever record
//!   boundaries must be recoverable (component pools, sequence elements).
//!
//! The contract is offset-based rather than cursor-based: callers grow the
//! stream to the required size first, then ask the value to write itself at
//! a given offset. This is what lets the component pools treat their
//! backing storage as one packed byte array with patchable offset tables.

mod collections;
mod primitives;

/// Width in bytes of the length prefix carried by complex records.
pub const LEN_PREFIX: usize = 4;

/// Contract for computing a byte length, writing a value into a byte stream
/// at an offset, and reading a value back from a byte stream at an offset.
///
/// `encoded_len` excludes any leading length prefix; prefixes belong to the
/// container that needs them (pools, sequences), not to the value itself.
pub trait ByteCodec: Sized {
    /// True when the value is stored bit-for-bit at a fixed size.
    const TRIVIAL: bool;

    /// Exact number of bytes `encode` will write for this value.
    fn encoded_len(&self) -> usize;

    /// Writes the value starting at `offset` and returns the bytes written.
    ///
    /// The caller must have grown `stream` to hold at least
    /// `offset + self.encoded_len()` bytes.
    fn encode(&self, stream: &mut [u8], offset: usize) -> usize;

    /// Reads a value starting at `offset`.
    ///
    /// Malformed input is a logic error on the writer's side; decoding does
    /// not validate beyond slice bounds ("debug-check or be correct").
    fn decode(stream: &[u8], offset: usize) -> Self;

    /// Bounds-checked variant of [`decode`](Self::decode) for reading
    /// untrusted streams: returns the value together with the number of
    /// input bytes it occupied, or `None` when the stream is too short to
    /// hold one.
    ///
    /// The consumed count is measured on the *input*, so cursors driven by
    /// it stay aligned even when decoding recovers lossily (e.g. mangled
    /// UTF-8 in a `String`).
    fn try_decode(stream: &[u8], offset: usize) -> Option<(Self, usize)>;
}

/// Implements [`ByteCodec`] for one or more [`bytemuck::Pod`] types using
/// their raw memory layout.
///
/// This is the hook consumers use to wire their own plain-old-data
/// component types into the engine:
///
/// ```
/// use vesper_core::impl_trivial_codec;
///
/// #[repr(C)]
/// #[derive(Debug, Clone, Copy, Default, bytemuck::Pod, bytemuck::Zeroable)]
/// struct Position { x: f32, y: f32, z: f32 }
///
/// impl_trivial_codec!(Position);
/// ```
#[macro_export]
macro_rules! impl_trivial_codec {
    ($($ty:ty),* $(,)?) => {$(
        impl $crate::codec::ByteCodec for $ty {
            const TRIVIAL: bool = true;

            fn encoded_len(&self) -> usize {
                core::mem::size_of::<$ty>()
            }

            fn encode(&self, stream: &mut [u8], offset: usize) -> usize {
                let bytes = $crate::bytemuck::bytes_of(self);
                stream[offset..offset + bytes.len()].copy_from_slice(bytes);
                bytes.len()
            }

            fn decode(stream: &[u8], offset: usize) -> Self {
                // `pod_read_unaligned` copies out of the stream, so the
                // byte pool never needs to honour the type's alignment.
                $crate::bytemuck::pod_read_unaligned(
                    &stream[offset..offset + core::mem::size_of::<$ty>()],
                )
            }

            fn try_decode(stream: &[u8], offset: usize) -> Option<(Self, usize)> {
                let size = core::mem::size_of::<$ty>();
                let end = offset.checked_add(size)?;
                if end > stream.len() {
                    return None;
                }
                Some((
                    $crate::bytemuck::pod_read_unaligned(&stream[offset..end]),
                    size,
                ))
            }
        }
    )*};
}

/// Reads the `u32` length prefix stored at `offset`.
pub fn read_len_prefix(stream: &[u8], offset: usize) -> usize {
    u32::decode(stream, offset) as usize
}

/// Writes a `u32` length prefix at `offset`.
pub fn write_len_prefix(stream: &mut [u8], offset: usize, len: usize) {
    (len as u32).encode(stream, offset);
}

/// Appends `value` to the end of `stream`, growing it as needed, and
/// returns the offset the value was written at.
pub fn append<T: ByteCodec>(stream: &mut Vec<u8>, value: &T) -> usize {
    let offset = stream.len();
    stream.resize(offset + value.encoded_len(), 0);
    value.encode(stream, offset);
    offset
}

/// Encodes `value` into a fresh byte vector.
pub fn encode_to_vec<T: ByteCodec>(value: &T) -> Vec<u8> {
    let mut stream = Vec::with_capacity(value.encoded_len());
    append(&mut stream, value);
    stream
}

/// Grows or shrinks the length-prefixed record at `offset` to `new_len`
/// body bytes, shifting the remainder of the stream, rewriting the prefix,
/// and returning the signed size delta so callers can patch their offset
/// tables.
pub fn resize_record(stream: &mut Vec<u8>, offset: usize, new_len: usize) -> isize {
    let old_len = read_len_prefix(stream, offset);
    let delta = new_len as isize - old_len as isize;

    let body = offset + LEN_PREFIX;
    match delta {
        0 => {}
        d if d > 0 => {
            // Grow: open a gap right after the current body.
            let gap = std::iter::repeat(0u8).take(d as usize);
            stream.splice(body + old_len..body + old_len, gap);
        }
        _ => {
            // Shrink: close the tail of the body.
            stream.drain(body + new_len..body + old_len);
        }
    }
    write_len_prefix(stream, offset, new_len);
    delta
}
