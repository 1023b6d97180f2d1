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

//! Built-in [`ByteCodec`](super::ByteCodec) adapters for the primitive types.

use super::ByteCodec;

crate::impl_trivial_codec!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

// `bool` is not `Pod` (only 0 and 1 are valid bit patterns), so it gets an
// explicit one-byte encoding instead of going through the macro.
impl ByteCodec for bool {
    const TRIVIAL: bool = true;

    fn encoded_len(&self) -> usize {
        1
    }

    fn encode(&self, stream: &mut [u8], offset: usize) -> usize {
        stream[offset] = u8::from(*self);
        1
    }

    fn decode(stream: &[u8], offset: usize) -> Self {
        stream[offset] != 0
    }

    fn try_decode(stream: &[u8], offset: usize) -> Option<(Self, usize)> {
        if offset >= stream.len() {
            return None;
        }
        Some((stream[offset] != 0, 1))
    }
}
