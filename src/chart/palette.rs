//! Cyclical "ice and fire" colour scale for count-coloured map points.

const ICE_FIRE: [[u8; 3]; 17] = [
    [0x00, 0x00, 0x00],
    [0x00, 0x1f, 0x4d],
    [0x00, 0x37, 0x86],
    [0x0e, 0x58, 0xa8],
    [0x21, 0x7e, 0xb8],
    [0x30, 0xa4, 0xca],
    [0x54, 0xc8, 0xdf],
    [0x9b, 0xe4, 0xef],
    [0xe1, 0xe9, 0xd1],
    [0xf3, 0xd5, 0x73],
    [0xe7, 0xb0, 0x00],
    [0xda, 0x82, 0x00],
    [0xc6, 0x54, 0x00],
    [0xac, 0x23, 0x01],
    [0x82, 0x00, 0x00],
    [0x4c, 0x00, 0x00],
    [0x00, 0x00, 0x00],
];

/// Index of the stop used when every value is the same.
const FLAT_STOP: usize = 8;

/// Colour for `value` on a scale spanning `[min, max]`.
///
/// The closing stop repeats the opening one, so the scale stops one short
/// of it to keep `min` and `max` distinguishable.
pub fn ice_fire(value: f64, min: f64, max: f64) -> [u8; 3] {
    let span = max - min;
    if span.is_nan() || span <= 0.0 {
        return ICE_FIRE[FLAT_STOP];
    }
    let last = ICE_FIRE.len() - 2;
    let t = ((value - min) / span).clamp(0.0, 1.0);
    let scaled = t * last as f64;
    let lower = scaled.floor() as usize;
    let upper = (lower + 1).min(last);
    let frac = scaled - lower as f64;

    let mut out = [0u8; 3];
    for (channel, slot) in out.iter_mut().enumerate() {
        let a = f64::from(ICE_FIRE[lower][channel]);
        let b = f64::from(ICE_FIRE[upper][channel]);
        *slot = (a + (b - a) * frac).round() as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_and_midpoint() {
        assert_eq!(ice_fire(0.0, 0.0, 15.0), ICE_FIRE[0]);
        assert_eq!(ice_fire(8.0, 0.0, 15.0), ICE_FIRE[8]);
        assert_eq!(ice_fire(99.0, 0.0, 15.0), ICE_FIRE[15]);
    }

    #[test]
    fn flat_range_uses_middle() {
        assert_eq!(ice_fire(3.0, 3.0, 3.0), ICE_FIRE[8]);
    }
}
