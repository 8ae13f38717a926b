//! 32-bit integer primitives. Every result wraps modulo 2^32.

/// Two's-complement view of a 32-bit word.
pub fn to_signed32(v: u32) -> i32 {
    v as i32
}

/// Sign-extend the low 16 bits of `v`.
pub fn to_signed16(v: u32) -> i32 {
    v as u16 as i16 as i32
}

/// Sign-extend the low 8 bits of `v`.
pub fn to_signed8(v: u32) -> i32 {
    v as u8 as i8 as i32
}

pub fn to_unsigned32(v: i32) -> u32 {
    v as u32
}

/// Sign-extend the low `bits` bits of `value`.
pub fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

pub fn add(a: u32, b: u32) -> u32 {
    a.wrapping_add(b)
}

pub fn sub(a: u32, b: u32) -> u32 {
    a.wrapping_sub(b)
}

pub fn xor(a: u32, b: u32) -> u32 {
    a ^ b
}

pub fn or(a: u32, b: u32) -> u32 {
    a | b
}

pub fn and(a: u32, b: u32) -> u32 {
    a & b
}

pub fn shift_left(a: u32, b: u32) -> u32 {
    a.wrapping_shl(b & 0x1f)
}

pub fn shift_right_logical(a: u32, b: u32) -> u32 {
    a.wrapping_shr(b & 0x1f)
}

pub fn shift_right_arithmetic(a: u32, b: u32) -> u32 {
    to_unsigned32(to_signed32(a).wrapping_shr(b & 0x1f))
}

pub fn less_than_unsigned(a: u32, b: u32) -> u32 {
    (a < b) as u32
}

pub fn less_than_signed(a: u32, b: u32) -> u32 {
    (to_signed32(a) < to_signed32(b)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn right_shifts_differ_on_sign() {
        assert_eq!(shift_right_arithmetic(0x8000_0000, 4), 0xf800_0000);
        assert_eq!(shift_right_logical(0x8000_0000, 4), 0x0800_0000);
        assert_eq!(shift_right_arithmetic(0x4000_0000, 4), 0x0400_0000);
    }

    #[test]
    fn shift_amount_uses_low_five_bits() {
        assert_eq!(shift_left(1, 33), 2);
        assert_eq!(shift_right_logical(0x8000_0000, 32), 0x8000_0000);
        assert_eq!(shift_left(0xffff_ffff, 31), 0x8000_0000);
    }

    #[test]
    fn comparisons_respect_signedness() {
        assert_eq!(less_than_signed(0xffff_ffff, 0), 1);
        assert_eq!(less_than_unsigned(0xffff_ffff, 0), 0);
        assert_eq!(less_than_signed(3, 3), 0);
        assert_eq!(less_than_unsigned(2, 3), 1);
    }

    #[test]
    fn narrow_sign_extension() {
        assert_eq!(to_signed8(0x80), -128);
        assert_eq!(to_signed8(0x7f), 127);
        assert_eq!(to_signed16(0xffff), -1);
        assert_eq!(to_signed16(0x1_7fff), 0x7fff);
        assert_eq!(to_unsigned32(-1), 0xffff_ffff);
        assert_eq!(sign_extend(0x800, 12), -2048);
        assert_eq!(sign_extend(0x7ff, 12), 2047);
    }

    #[test]
    fn bitwise_ops() {
        assert_eq!(and(0xf0f0_1234, 0x0ff0_ffff), 0x00f0_1234);
        assert_eq!(or(0xf000_0000, 0x0000_000f), 0xf000_000f);
        assert_eq!(xor(0xffff_0000, 0xff00_ff00), 0x00ff_ff00);
    }

    proptest! {
        #[test]
        fn add_and_sub_wrap(a: u32, b: u32) {
            prop_assert_eq!(add(a, b) as u64, (a as u64 + b as u64) % (1 << 32));
            prop_assert_eq!(sub(a, b) as i64, (a as i64 - b as i64).rem_euclid(1 << 32));
        }
    }
}
