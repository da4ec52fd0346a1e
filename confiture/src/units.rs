//! SI decimal and IEC binary unit suffixes recognized by the lexer
//! (spec.md §4.1).
//!
//! Multipliers are kept as `i128`: the largest IEC suffix, `Yi = 2^80`, does
//! not fit in `i64`/`u64`. Whether the final scaled value still fits an
//! `i64` (and thus stays [`crate::tree::Payload::Int`]) or must fall back to
//! [`crate::tree::Payload::Float`] is decided where the suffix is applied, in
//! `parser.rs`.

/// Looks up the multiplier for a unit keyword (`"k"`, `"Ki"`, ...).
///
/// Returns `None` if `name` is not a recognized unit keyword -- the caller
/// should then try it as a plain identifier.
pub fn lookup(name: &str) -> Option<i128> {
    let value = match name {
        "k" => 10i128.pow(3),
        "M" => 10i128.pow(6),
        "G" => 10i128.pow(9),
        "T" => 10i128.pow(12),
        "P" => 10i128.pow(15),
        "E" => 10i128.pow(18),
        "Z" => 10i128.pow(21),
        "Y" => 10i128.pow(24),
        "Ki" => 1i128 << 10,
        "Mi" => 1i128 << 20,
        "Gi" => 1i128 << 30,
        "Ti" => 1i128 << 40,
        "Pi" => 1i128 << 50,
        "Ei" => 1i128 << 60,
        "Zi" => 1i128 << 70,
        "Yi" => 1i128 << 80,
        _ => return None,
    };
    Some(value)
}

/// `true` if `name` is one of the reserved unit keywords and thus cannot be
/// used as a plain identifier.
pub fn is_unit_keyword(name: &str) -> bool {
    lookup(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn si_and_iec_multipliers() {
        assert_eq!(lookup("k"), Some(1_000));
        assert_eq!(lookup("M"), Some(1_000_000));
        assert_eq!(lookup("Ki"), Some(1024));
        assert_eq!(lookup("Gi"), Some(1024i128.pow(3)));
        assert_eq!(lookup("Yi"), Some(1i128 << 80));
        assert_eq!(lookup("not_a_unit"), None);
    }
}
