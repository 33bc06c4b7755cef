use std::fmt;
use std::str::FromStr;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::error::{ExplorerError, Result};

/// Side length of the downsampled grayscale grid the hash is computed on.
pub const HASH_SIDE: u32 = 16;

/// Total number of bits in a fingerprint.
pub const HASH_BITS: u32 = HASH_SIDE * HASH_SIDE;

/// Spread (max - min luma) under which a capture counts as blank.
const BLANK_SPREAD: u8 = 3;

/// 256-bit average hash of a captured view.
///
/// Each bit is set when the corresponding cell of the 16x16 grayscale
/// thumbnail is brighter than the thumbnail's mean. Small rendering noise
/// (a ticking clock, a spinner) flips a handful of bits; a layout change
/// flips many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint([u64; 4]);

impl Fingerprint {
    pub fn from_words(words: [u64; 4]) -> Self {
        Self(words)
    }

    pub fn hamming_distance(&self, other: &Fingerprint) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    /// 1.0 for identical hashes, 0.0 for fully inverted ones.
    pub fn similarity(&self, other: &Fingerprint) -> f32 {
        1.0 - self.hamming_distance(other) as f32 / HASH_BITS as f32
    }

    /// First eight hex digits, for log lines.
    pub fn short(&self) -> String {
        format!("{:016x}", self.0[0])[..8].to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for word in &self.0 {
            write!(f, "{:016x}", word)?;
        }
        Ok(())
    }
}

impl FromStr for Fingerprint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.len() != 64 || !s.is_ascii() {
            return Err(format!("fingerprint must be 64 hex digits, got '{}'", s));
        }
        let mut words = [0u64; 4];
        for (i, word) in words.iter_mut().enumerate() {
            let chunk = &s[i * 16..(i + 1) * 16];
            *word = u64::from_str_radix(chunk, 16)
                .map_err(|e| format!("invalid fingerprint '{}': {}", s, e))?;
        }
        Ok(Self(words))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.to_string()
    }
}

/// Compute the average hash of an encoded screenshot.
///
/// Fails with `ExplorerError::Identity` for empty, undecodable or blank
/// (uniform) captures.
pub fn compute_fingerprint(image_bytes: &[u8]) -> Result<Fingerprint> {
    if image_bytes.is_empty() {
        return Err(ExplorerError::Identity("empty capture".into()));
    }

    let decoded = image::load_from_memory(image_bytes)
        .map_err(|e| ExplorerError::Identity(format!("undecodable capture: {}", e)))?;

    let thumb = decoded
        .grayscale()
        .resize_exact(HASH_SIDE, HASH_SIDE, FilterType::Triangle)
        .to_luma8();

    let cells: Vec<u8> = thumb.pixels().map(|p| p.0[0]).collect();
    let min = cells.iter().copied().min().unwrap_or(0);
    let max = cells.iter().copied().max().unwrap_or(0);
    if max.saturating_sub(min) < BLANK_SPREAD {
        return Err(ExplorerError::Identity("blank capture".into()));
    }

    let mean = cells.iter().map(|&c| c as f64).sum::<f64>() / cells.len() as f64;

    let mut words = [0u64; 4];
    for (i, &cell) in cells.iter().enumerate() {
        if cell as f64 > mean {
            words[i / 64] |= 1u64 << (63 - (i % 64));
        }
    }

    Ok(Fingerprint(words))
}
