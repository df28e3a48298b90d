//! DNA string helpers shared by the input graph and the side graph.

#[inline]
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'a' => b't',
        b'C' => b'G',
        b'c' => b'g',
        b'G' => b'C',
        b'g' => b'c',
        b'T' => b'A',
        b't' => b'a',
        other => other,
    }
}

/// Reverse complement of a DNA string. Bases other than ACGT (in
/// either case) are kept as they are.
pub fn reverse_complement(dna: &str) -> String {
    dna.bytes().rev().map(|b| complement(b) as char).collect()
}

/// The slice of `dna` that a walk of `length` bases visits starting
/// at `offset`, reverse complemented when the walk runs backwards
/// (from `offset` down to `offset - length + 1`).
pub fn oriented_slice(
    dna: &str,
    offset: usize,
    length: usize,
    reversed: bool,
) -> Option<String> {
    if !reversed {
        let end = offset.checked_add(length)?;
        dna.get(offset..end).map(String::from)
    } else {
        let start = (offset + 1).checked_sub(length)?;
        dna.get(start..=offset).map(reverse_complement)
    }
}
