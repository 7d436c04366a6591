use crate::register::Gain;

/// Largest positive 24-bit code
const POSITIVE_FULL_SCALE: u32 = 0x7F_FFFF;
/// 2^24, the modulus of the 24-bit two's complement code
const CODE_MODULUS: i32 = 0x100_0000;
/// 2^23, the number of codes on each side of zero
const HALF_SCALE: f32 = 8_388_608.0;

/// Reassemble a conversion result sent most significant byte first
pub(crate) fn assemble_sample(bytes: [u8; 3]) -> u32 {
    (u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2])
}

/// Interpret a 24-bit code as two's complement
///
/// Bits above bit 23 are ignored.
#[must_use]
pub fn sign_extend(raw: u32) -> i32 {
    let raw = raw & 0xFF_FFFF;
    #[allow(clippy::cast_possible_wrap)]
    let value = raw as i32;
    if raw > POSITIVE_FULL_SCALE {
        value - CODE_MODULUS
    } else {
        value
    }
}

/// Convert a raw 24-bit code to volts
///
/// One LSB is `2 * vref / 2^23` at unity gain and the input range shrinks by
/// the PGA gain.
#[must_use]
pub fn to_voltage(raw: u32, vref: f32, gain: Gain) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let code = sign_extend(raw) as f32;
    (2.0 * vref / HALF_SCALE) * code / f32::from(gain.multiplier())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_big_endian() {
        assert_eq!(assemble_sample([0x12, 0x34, 0x56]), 0x12_3456);
        assert_eq!(assemble_sample([0xFF, 0xFF, 0xFF]), 0xFF_FFFF);
        assert_eq!(assemble_sample([0x00, 0x00, 0x01]), 1);
    }

    #[test]
    fn sign_extension_boundaries() {
        assert_eq!(sign_extend(0), 0);
        assert_eq!(sign_extend(0x7F_FFFF), 8_388_607);
        assert_eq!(sign_extend(0x80_0000), -8_388_608);
        assert_eq!(sign_extend(0xFF_FFFF), -1);
    }

    #[test]
    fn converts_positive_sample() {
        let volts = to_voltage(0x12_3456, 2.5, Gain::X1);
        assert!((volts - 0.711_110_8).abs() < 1e-6);
    }

    #[test]
    fn minus_one_lsb() {
        let volts = to_voltage(0xFF_FFFF, 2.5, Gain::X1);
        assert_eq!(volts, -5.0 / 8_388_608.0);
    }

    #[test]
    fn gain_divides_range() {
        let unity = to_voltage(0x40_0000, 2.5, Gain::X1);
        let x64 = to_voltage(0x40_0000, 2.5, Gain::X64);
        assert_eq!(unity, 2.5);
        assert_eq!(x64, 2.5 / 64.0);
    }
}
