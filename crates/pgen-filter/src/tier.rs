/// Rates at or below this value are tier 0.
pub const TIER_BASE: u64 = 8;

/// Each tier step divides the rate by this factor.
pub const TIER_DIVISOR: u64 = 4;

/// Processing tier of a recipe rate.
///
/// Counts how many times the rate is divided by [`TIER_DIVISOR`] before it falls
/// to [`TIER_BASE`] or below: 8 → 0, 32 → 1, 128 → 2, 512 → 3, ...
pub fn tier_of(rate: u32) -> u8 {
    let mut r = u64::from(rate);
    let mut tier = 0u8;
    while r > TIER_BASE {
        r /= TIER_DIVISOR;
        tier += 1;
    }
    tier
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries() {
        assert_eq!(tier_of(0), 0);
        assert_eq!(tier_of(8), 0);
        assert_eq!(tier_of(9), 1);
        assert_eq!(tier_of(30), 1);
        assert_eq!(tier_of(32), 1);
        assert_eq!(tier_of(120), 2);
        assert_eq!(tier_of(480), 3);
        assert_eq!(tier_of(1920), 4);
    }

    #[test]
    fn max_rate_does_not_overflow() {
        assert!(tier_of(u32::MAX) > 10);
    }
}
