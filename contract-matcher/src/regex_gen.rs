//! Example generation from regular expressions.
//!
//! The consumer side of a pattern-valued field needs a concrete value. It is
//! produced by walking the parsed pattern with a generator seeded from the
//! pattern text, so the same pattern always yields the same example.

use crate::error::ModelError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex_syntax::hir::{Class, ClassBytesRange, ClassUnicodeRange, Hir, HirKind};

/// Open-ended repetitions emit at most this many items beyond their minimum.
const MAX_EXTRA_REPEATS: u32 = 3;

/// Printable ASCII window preferred when picking from a class.
const PRINTABLE: (u32, u32) = (0x20, 0x7e);

/// Generate a string fully matched by `pattern`.
///
/// # Errors
///
/// Returns [`ModelError::InvalidPattern`] if the pattern does not parse or
/// contains a class that matches nothing.
///
/// # Examples
///
/// ```
/// use contract_matcher::regex_gen::example;
///
/// let value = example("[0-9]{3}").unwrap();
/// assert_eq!(value.len(), 3);
/// assert!(value.chars().all(|c| c.is_ascii_digit()));
/// assert_eq!(value, example("[0-9]{3}").unwrap());
/// ```
pub fn example(pattern: &str) -> Result<String, ModelError> {
    let hir = regex_syntax::parse(pattern)
        .map_err(|e| ModelError::invalid_pattern(pattern, e.to_string()))?;
    let mut rng = StdRng::seed_from_u64(seed_for(pattern));
    let mut out = Vec::new();
    emit(&hir, &mut rng, &mut out)
        .ok_or_else(|| ModelError::invalid_pattern(pattern, "pattern matches no string"))?;
    String::from_utf8(out).map_err(|e| ModelError::invalid_pattern(pattern, e.to_string()))
}

/// FNV-1a over the pattern bytes.
fn seed_for(pattern: &str) -> u64 {
    pattern.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

fn emit(hir: &Hir, rng: &mut StdRng, out: &mut Vec<u8>) -> Option<()> {
    match hir.kind() {
        HirKind::Empty | HirKind::Look(_) => {}
        HirKind::Literal(literal) => out.extend_from_slice(&literal.0),
        HirKind::Class(Class::Unicode(class)) => {
            let c = pick_char(class.ranges(), rng)?;
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
        HirKind::Class(Class::Bytes(class)) => out.push(pick_byte(class.ranges(), rng)?),
        HirKind::Repetition(rep) => {
            let ceiling = rep.min.saturating_add(MAX_EXTRA_REPEATS);
            let upper = rep.max.map_or(ceiling, |max| max.min(ceiling));
            let count = rng.gen_range(rep.min..=upper);
            for _ in 0..count {
                emit(&rep.sub, rng, out)?;
            }
        }
        HirKind::Capture(capture) => emit(&capture.sub, rng, out)?,
        HirKind::Concat(parts) => {
            for part in parts {
                emit(part, rng, out)?;
            }
        }
        HirKind::Alternation(branches) => {
            let branch = branches.get(rng.gen_range(0..branches.len()))?;
            emit(branch, rng, out)?;
        }
    }
    Some(())
}

fn pick_char(ranges: &[ClassUnicodeRange], rng: &mut StdRng) -> Option<char> {
    let bounds: Vec<(u32, u32)> = ranges
        .iter()
        .map(|r| (u32::from(r.start()), u32::from(r.end())))
        .collect();
    if let Some(c) = pick_printable(&bounds, rng).and_then(char::from_u32) {
        return Some(c);
    }
    let range = ranges.get(rng.gen_range(0..ranges.len().max(1)))?;
    Some(range.start())
}

fn pick_byte(ranges: &[ClassBytesRange], rng: &mut StdRng) -> Option<u8> {
    let bounds: Vec<(u32, u32)> = ranges
        .iter()
        .map(|r| (u32::from(r.start()), u32::from(r.end())))
        .collect();
    if let Some(code) = pick_printable(&bounds, rng) {
        return u8::try_from(code).ok();
    }
    let range = ranges.get(rng.gen_range(0..ranges.len().max(1)))?;
    Some(range.start())
}

fn pick_printable(bounds: &[(u32, u32)], rng: &mut StdRng) -> Option<u32> {
    let windows: Vec<(u32, u32)> = bounds
        .iter()
        .filter_map(|&(start, end)| {
            let lo = start.max(PRINTABLE.0);
            let hi = end.min(PRINTABLE.1);
            (lo <= hi).then_some((lo, hi))
        })
        .collect();
    if windows.is_empty() {
        return None;
    }
    let (lo, hi) = windows[rng.gen_range(0..windows.len())];
    Some(rng.gen_range(lo..=hi))
}
