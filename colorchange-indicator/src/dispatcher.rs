// Copyright 2025 The Drasi Authors.
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

//! Maps received payloads to indicator colors.

use crate::color::IndicatorColor;

/// Recognized tokens, checked in order.
const TOKENS: [(&[u8], IndicatorColor); 3] = [
    (b"RED", IndicatorColor::Red),
    (b"GREEN", IndicatorColor::Green),
    (b"BLUE", IndicatorColor::Blue),
];

/// Convert a raw payload into the color it asks for.
///
/// The payload is read as a NUL-terminated token: only the bytes before the
/// first NUL take part in the comparison. Matching is exact and
/// case-sensitive. Anything unrecognized, including an empty payload, yields
/// [`IndicatorColor::White`].
pub fn dispatch(payload: &[u8]) -> IndicatorColor {
    let token = payload_text(payload);
    TOKENS
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, color)| *color)
        .unwrap_or_default()
}

fn payload_text(payload: &[u8]) -> &[u8] {
    match payload.iter().position(|&b| b == 0) {
        Some(end) => &payload[..end],
        None => payload,
    }
}
