//! Proof-of-work puzzles the dislike API hands out on registration and voting.
//!
//! The challenge is 16 base64-encoded bytes. A solution is a 4-byte
//! little-endian counter such that `sha512(counter || challenge)` starts with
//! at least `difficulty` zero bits.

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha512};

const COUNTER_LEN: usize = 4;
const CHALLENGE_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Puzzle {
    pub challenge: String,
    pub difficulty: u32,
}

pub fn solve(puzzle: &Puzzle) -> Result<String> {
    let challenge = STANDARD
        .decode(puzzle.challenge.trim())
        .context("puzzle: decode challenge")?;
    if challenge.len() != CHALLENGE_LEN {
        bail!(
            "puzzle: challenge must be {CHALLENGE_LEN} bytes, got {}",
            challenge.len()
        );
    }
    if puzzle.difficulty > 32 {
        bail!("puzzle: difficulty {} out of range", puzzle.difficulty);
    }

    let mut buffer = [0u8; COUNTER_LEN + CHALLENGE_LEN];
    buffer[COUNTER_LEN..].copy_from_slice(&challenge);

    let max_count = (1u64 << puzzle.difficulty) * 5;
    for counter in 0..max_count.min(u64::from(u32::MAX) + 1) {
        buffer[..COUNTER_LEN].copy_from_slice(&(counter as u32).to_le_bytes());
        let digest = Sha512::digest(buffer);
        if leading_zero_bits(&digest) >= puzzle.difficulty {
            return Ok(STANDARD.encode(&buffer[..COUNTER_LEN]));
        }
    }
    bail!(
        "puzzle: no solution within {max_count} attempts at difficulty {}",
        puzzle.difficulty
    )
}

fn leading_zero_bits(bytes: &[u8]) -> u32 {
    let mut zeros = 0;
    for byte in bytes {
        if *byte == 0 {
            zeros += 8;
        } else {
            return zeros + byte.leading_zeros();
        }
    }
    zeros
}

pub fn verify(puzzle: &Puzzle, solution: &str) -> Result<bool> {
    let challenge = STANDARD
        .decode(puzzle.challenge.trim())
        .context("puzzle: decode challenge")?;
    let counter = STANDARD
        .decode(solution.trim())
        .context("puzzle: decode solution")?;
    let mut hasher = Sha512::new();
    hasher.update(&counter);
    hasher.update(&challenge);
    Ok(leading_zero_bits(&hasher.finalize()) >= puzzle.difficulty)
}
