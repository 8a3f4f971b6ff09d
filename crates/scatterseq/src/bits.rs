/// Reverses the bit order of a 64-bit identifier value.
///
/// The value is treated as an unsigned 64-bit bit pattern, sign bit
/// included, so sequential counter values scatter across the whole signed
/// range instead of clustering at the low end of the key space.
///
/// The transform is total, a bijection, and its own inverse:
/// `reverse_bits(reverse_bits(v)) == v` for every `v`.
///
/// # Example
/// ```
/// use scatterseq::reverse_bits;
///
/// assert_eq!(reverse_bits(1), i64::MIN);
/// assert_eq!(reverse_bits(reverse_bits(42)), 42);
/// ```
#[must_use]
pub const fn reverse_bits(v: i64) -> i64 {
    (v as u64).reverse_bits() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_mappings() {
        assert_eq!(reverse_bits(0), 0);
        assert_eq!(reverse_bits(-1), -1);
        assert_eq!(reverse_bits(1), i64::MIN);
        assert_eq!(reverse_bits(i64::MIN), 1);
        assert_eq!(reverse_bits(2), 1i64 << 62);
        assert_eq!(reverse_bits(i64::MAX), -2);
    }

    #[test]
    fn self_inverse() {
        let samples = [
            0,
            1,
            -1,
            2,
            3,
            42,
            50_000,
            i64::MIN,
            i64::MAX,
            i64::MIN + 1,
            i64::MAX - 1,
            0x5555_5555_5555_5555,
            -0x0123_4567_89ab_cdef,
        ];
        for v in samples {
            assert_eq!(reverse_bits(reverse_bits(v)), v, "not an involution for {v}");
        }
        for v in -4096..=4096 {
            assert_eq!(reverse_bits(reverse_bits(v)), v);
        }
    }

    #[test]
    fn sequential_values_scatter() {
        // Adjacent counter values must not map to adjacent keys.
        let a = reverse_bits(1);
        let b = reverse_bits(2);
        assert!(a.abs_diff(b) > u64::MAX / 8);
    }
}
