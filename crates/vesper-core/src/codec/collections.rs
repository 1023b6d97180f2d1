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

//! [`ByteCodec`] adapters for strings, sequences, and mappings.
//!
//! Sequences are length-prefixed with their element count; each element of a
//! complex element type additionally carries its own `u32` length prefix so
//! that variable-size payloads stay navigable. Mappings encode as a sequence
//! of `(key, value)` pairs written in key-sorted order, which keeps the
//! encoding deterministic regardless of hash-map iteration order.

use super::{read_len_prefix, write_len_prefix, ByteCodec, LEN_PREFIX};
use std::collections::HashMap;
use std::hash::Hash;

impl ByteCodec for String {
    const TRIVIAL: bool = false;

    fn encoded_len(&self) -> usize {
        LEN_PREFIX + self.len()
    }

    fn encode(&self, stream: &mut [u8], offset: usize) -> usize {
        write_len_prefix(stream, offset, self.len());
        stream[offset + LEN_PREFIX..offset + LEN_PREFIX + self.len()]
            .copy_from_slice(self.as_bytes());
        LEN_PREFIX + self.len()
    }

    fn decode(stream: &[u8], offset: usize) -> Self {
        let len = read_len_prefix(stream, offset);
        let body = &stream[offset + LEN_PREFIX..offset + LEN_PREFIX + len];
        // Lossy rather than panicking: a mangled name in a snapshot should
        // surface as a registry mismatch, not a crash.
        String::from_utf8_lossy(body).into_owned()
    }

    fn try_decode(stream: &[u8], offset: usize) -> Option<(Self, usize)> {
        let (len, _) = u32::try_decode(stream, offset)?;
        let len = len as usize;
        let body = offset.checked_add(LEN_PREFIX)?;
        let end = body.checked_add(len)?;
        if end > stream.len() {
            return None;
        }
        Some((
            String::from_utf8_lossy(&stream[body..end]).into_owned(),
            LEN_PREFIX + len,
        ))
    }
}

/// Bytes one element occupies inside a sequence, including its per-element
/// prefix when the element type is complex.
fn element_len<T: ByteCodec>(value: &T) -> usize {
    if T::TRIVIAL {
        value.encoded_len()
    } else {
        LEN_PREFIX + value.encoded_len()
    }
}

fn encode_element<T: ByteCodec>(value: &T, stream: &mut [u8], offset: usize) -> usize {
    if T::TRIVIAL {
        value.encode(stream, offset)
    } else {
        write_len_prefix(stream, offset, value.encoded_len());
        LEN_PREFIX + value.encode(stream, offset + LEN_PREFIX)
    }
}

fn try_decode_element<T: ByteCodec>(stream: &[u8], offset: usize) -> Option<(T, usize)> {
    if T::TRIVIAL {
        T::try_decode(stream, offset)
    } else {
        let (len, _) = u32::try_decode(stream, offset)?;
        let len = len as usize;
        let body = offset.checked_add(LEN_PREFIX)?;
        if body.checked_add(len)? > stream.len() {
            return None;
        }
        let (value, _) = T::try_decode(stream, body)?;
        Some((value, LEN_PREFIX + len))
    }
}

fn decode_element<T: ByteCodec>(stream: &[u8], offset: usize) -> (T, usize) {
    if T::TRIVIAL {
        let value = T::decode(stream, offset);
        let len = value.encoded_len();
        (value, len)
    } else {
        let len = read_len_prefix(stream, offset);
        let value = T::decode(stream, offset + LEN_PREFIX);
        (value, LEN_PREFIX + len)
    }
}

impl<T: ByteCodec> ByteCodec for Vec<T> {
    const TRIVIAL: bool = false;

    fn encoded_len(&self) -> usize {
        LEN_PREFIX + self.iter().map(element_len).sum::<usize>()
    }

    fn encode(&self, stream: &mut [u8], offset: usize) -> usize {
        write_len_prefix(stream, offset, self.len());
        let mut cursor = offset + LEN_PREFIX;
        for value in self {
            cursor += encode_element(value, stream, cursor);
        }
        cursor - offset
    }

    fn decode(stream: &[u8], offset: usize) -> Self {
        let count = read_len_prefix(stream, offset);
        let mut cursor = offset + LEN_PREFIX;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let (value, consumed) = decode_element::<T>(stream, cursor);
            cursor += consumed;
            values.push(value);
        }
        values
    }

    fn try_decode(stream: &[u8], offset: usize) -> Option<(Self, usize)> {
        let (count, _) = u32::try_decode(stream, offset)?;
        let mut cursor = offset.checked_add(LEN_PREFIX)?;
        let mut values = Vec::new();
        for _ in 0..count {
            let (value, consumed) = try_decode_element::<T>(stream, cursor)?;
            cursor = cursor.checked_add(consumed)?;
            values.push(value);
        }
        Some((values, cursor - offset))
    }
}

impl<K, V> ByteCodec for HashMap<K, V>
where
    K: ByteCodec + Eq + Hash + Ord,
    V: ByteCodec,
{
    const TRIVIAL: bool = false;

    fn encoded_len(&self) -> usize {
        LEN_PREFIX
            + self
                .iter()
                .map(|(k, v)| element_len(k) + element_len(v))
                .sum::<usize>()
    }

    fn encode(&self, stream: &mut [u8], offset: usize) -> usize {
        let mut entries: Vec<(&K, &V)> = self.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));

        write_len_prefix(stream, offset, entries.len());
        let mut cursor = offset + LEN_PREFIX;
        for (key, value) in entries {
            cursor += encode_element(key, stream, cursor);
            cursor += encode_element(value, stream, cursor);
        }
        cursor - offset
    }

    fn decode(stream: &[u8], offset: usize) -> Self {
        let count = read_len_prefix(stream, offset);
        let mut cursor = offset + LEN_PREFIX;
        let mut map = HashMap::with_capacity(count);
        for _ in 0..count {
            let (key, consumed) = decode_element::<K>(stream, cursor);
            cursor += consumed;
            let (value, consumed) = decode_element::<V>(stream, cursor);
            cursor += consumed;
            map.insert(key, value);
        }
        map
    }

    fn try_decode(stream: &[u8], offset: usize) -> Option<(Self, usize)> {
        let (count, _) = u32::try_decode(stream, offset)?;
        let mut cursor = offset.checked_add(LEN_PREFIX)?;
        let mut map = HashMap::new();
        for _ in 0..count {
            let (key, consumed) = try_decode_element::<K>(stream, cursor)?;
            cursor = cursor.checked_add(consumed)?;
            let (value, consumed) = try_decode_element::<V>(stream, cursor)?;
            cursor = cursor.checked_add(consumed)?;
            map.insert(key, value);
        }
        Some((map, cursor - offset))
    }
}
