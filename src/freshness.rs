//! Pure freshness accounting. Depends only on its arguments, no I/O, no
//! clock reads of its own.

use crate::domain::Residency;

/// Ideal storage degrades at 1x; any other area degrades at 2x.
const DEGRADATION_RATE_IDEAL: i64 = 1;
const DEGRADATION_RATE_NON_IDEAL: i64 = 2;

/// Result of evaluating a residency's freshness at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Freshness {
    pub ratio: f64,
    pub remaining_seconds: i64,
}

impl Freshness {
    pub fn is_spoiled(&self) -> bool {
        self.ratio <= 0.0
    }
}

/// `age_seconds = floor((now - entered_at) / 1_000_000)`, truncated toward
/// zero. `now_micros >= residency.entered_at_micros` is a precondition.
fn age_seconds(residency: &Residency, now_micros: u64) -> i64 {
    debug_assert!(now_micros >= residency.entered_at_micros);
    let elapsed = now_micros.saturating_sub(residency.entered_at_micros);
    (elapsed / 1_000_000) as i64
}

fn degradation_rate(residency: &Residency) -> i64 {
    if residency.is_ideal() {
        DEGRADATION_RATE_IDEAL
    } else {
        DEGRADATION_RATE_NON_IDEAL
    }
}

/// Evaluate a residency's freshness at `now_micros`.
pub fn evaluate(residency: &Residency, now_micros: u64) -> Freshness {
    let age = age_seconds(residency, now_micros);
    let effective_age = age * degradation_rate(residency);
    let budget = residency.order.freshness as i64;

    let remaining_seconds = budget - effective_age;
    let ratio = if budget <= 0 {
        0.0
    } else {
        (remaining_seconds as f64 / budget as f64).clamp(0.0, 1.0)
    };

    Freshness {
        ratio,
        remaining_seconds,
    }
}

/// Convenience: is this residency spoiled at `now_micros`?
pub fn is_spoiled(residency: &Residency, now_micros: u64) -> bool {
    evaluate(residency, now_micros).is_spoiled()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Area, Order, Temp};

    fn order(freshness: u64, temp: Temp) -> Order {
        Order {
            id: "o1".into(),
            name: "test".into(),
            temp,
            price: 1.0,
            freshness,
        }
    }

    #[test]
    fn ideal_storage_degrades_at_one_x() {
        let residency = Residency {
            order: order(120, Temp::Hot),
            area: Area::Heater,
            entered_at_micros: 0,
        };
        let f = evaluate(&residency, 60_000_000);
        assert_eq!(f.remaining_seconds, 60);
        assert!((f.ratio - 0.5).abs() < 1e-9);
        assert!(!f.is_spoiled());
    }

    #[test]
    fn non_ideal_storage_degrades_at_two_x() {
        let residency = Residency {
            order: order(120, Temp::Room),
            area: Area::Heater,
            entered_at_micros: 0,
        };
        let f = evaluate(&residency, 30_000_000);
        // age=30s, rate=2 -> effective_age=60, remaining=60, ratio=0.5
        assert_eq!(f.remaining_seconds, 60);
        assert!((f.ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn spoiled_when_ratio_non_positive() {
        let residency = Residency {
            order: order(5, Temp::Room),
            area: Area::Shelf,
            entered_at_micros: 0,
        };
        let f = evaluate(&residency, 10_000_000);
        assert!(f.is_spoiled());
        assert_eq!(f.ratio, 0.0);
    }

    #[test]
    fn age_truncates_toward_zero_within_the_second() {
        let residency = Residency {
            order: order(60, Temp::Hot),
            area: Area::Heater,
            entered_at_micros: 0,
        };
        // 1_999_999us -> 1 whole second of age, not 2.
        let f = evaluate(&residency, 1_999_999);
        assert_eq!(f.remaining_seconds, 59);
    }
}
