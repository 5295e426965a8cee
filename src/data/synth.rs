//! Synthetic column backfill.
//!
//! When a source lacks a column entirely, the normalizer fills it with values
//! drawn from these fixed policies so every view has something to show.

use std::ops::RangeInclusive;

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;

/// Regions used when the source has no region column.
pub const REGIONS: [&str; 5] = ["Jakarta", "Bandung", "Surabaya", "Medan", "Yogyakarta"];

/// Number of distinct product labels cycled through when ids are synthesized.
pub const PRODUCT_LABEL_COUNT: usize = 5;

/// Inclusive range for synthesized unit counts.
pub const UNITS_RANGE: RangeInclusive<u32> = 20..=200;

/// First day of a synthesized date column.
pub fn synthetic_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Build the RNG for a session.
///
/// A fixed seed makes synthesized columns reproducible; otherwise we use OS entropy.
pub fn session_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Daily dates starting at the epoch, one per row.
pub fn dates(n: usize) -> Vec<NaiveDate> {
    let epoch = synthetic_epoch();
    (0..n)
        .map(|i| {
            epoch
                .checked_add_signed(Duration::days(i as i64))
                .unwrap_or(NaiveDate::MAX)
        })
        .collect()
}

pub fn regions(rng: &mut StdRng, n: usize) -> Vec<String> {
    (0..n)
        .map(|_| REGIONS[rng.gen_range(0..REGIONS.len())].to_string())
        .collect()
}

pub fn promotions(rng: &mut StdRng, n: usize) -> Vec<bool> {
    (0..n).map(|_| rng.gen_bool(0.5)).collect()
}

pub fn units(rng: &mut StdRng, n: usize) -> Vec<u32> {
    (0..n).map(|_| rng.gen_range(UNITS_RANGE)).collect()
}

/// `Product-1`, `Product-2`, … cycling by row index.
pub fn product_ids(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("Product-{}", i % PRODUCT_LABEL_COUNT + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn units_stay_in_range() {
        let mut rng = session_rng(Some(7));
        let v = units(&mut rng, 5_000);
        assert!(v.iter().all(|u| UNITS_RANGE.contains(u)));
        // Both ends of the range are reachable.
        assert!(v.contains(&20));
        assert!(v.contains(&200));
    }

    #[test]
    fn product_ids_cycle_through_five_labels() {
        let ids = product_ids(23);
        let distinct: HashSet<_> = ids.iter().collect();
        assert_eq!(distinct.len(), PRODUCT_LABEL_COUNT);
        assert_eq!(ids[0], "Product-1");
        assert_eq!(ids[4], "Product-5");
        assert_eq!(ids[5], "Product-1");
    }

    #[test]
    fn dates_are_contiguous_from_epoch() {
        let d = dates(30);
        assert_eq!(d.len(), 30);
        assert_eq!(d[0], synthetic_epoch());
        for w in d.windows(2) {
            assert_eq!(w[1] - w[0], Duration::days(1));
        }
    }

    #[test]
    fn regions_come_from_fixed_set() {
        let mut rng = session_rng(Some(1));
        assert!(regions(&mut rng, 100).iter().all(|r| REGIONS.contains(&r.as_str())));
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let a = promotions(&mut session_rng(Some(42)), 50);
        let b = promotions(&mut session_rng(Some(42)), 50);
        assert_eq!(a, b);
    }
}
