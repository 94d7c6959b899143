//! Time-tiered refund policy engine.
//!
//! Pure computation: given the event date, the current time, a price, and a
//! quantity, produce the refund owed. No I/O, no clock reads, no state. The
//! cancellation workflow feeds it the booking's price snapshot so a later
//! price change on the event never alters what a holder gets back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::types::Money;

/// Slack applied when classifying a cancellation into a tier, in days.
///
/// Absorbs clock skew and floating-point noise so a cancellation submitted
/// at exactly seven days out lands in the seven-day tier.
pub const TIER_EPSILON_DAYS: f64 = 0.001;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// The time window a cancellation falls into, relative to the event date
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefundTier {
    /// Seven or more days before the event
    Early,
    /// Between one and seven days before the event
    Standard,
    /// Less than one day before the event (or after it)
    Late,
}

impl RefundTier {
    /// Classifies a fractional day count into a tier.
    #[must_use]
    pub fn classify(days_until_event: f64) -> Self {
        if days_until_event + TIER_EPSILON_DAYS >= 7.0 {
            Self::Early
        } else if days_until_event + TIER_EPSILON_DAYS >= 1.0 {
            Self::Standard
        } else {
            Self::Late
        }
    }

    /// Returns the canonical lowercase name for this tier
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Early => "early",
            Self::Standard => "standard",
            Self::Late => "late",
        }
    }
}

impl fmt::Display for RefundTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refund percentages per tier.
///
/// Organizers may override the defaults per event; the break points between
/// tiers are fixed, only the percentages move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundPolicy {
    /// Percentage refunded seven or more days out
    pub early_percent: u8,
    /// Percentage refunded between one and seven days out
    pub standard_percent: u8,
    /// Percentage refunded under one day out
    pub late_percent: u8,
}

impl RefundPolicy {
    /// Builds a policy from three tier percentages.
    #[must_use]
    pub const fn new(early_percent: u8, standard_percent: u8, late_percent: u8) -> Self {
        Self {
            early_percent,
            standard_percent,
            late_percent,
        }
    }

    /// The percentage this policy grants for a tier.
    #[must_use]
    pub const fn percent_for(&self, tier: RefundTier) -> u8 {
        match tier {
            RefundTier::Early => self.early_percent,
            RefundTier::Standard => self.standard_percent,
            RefundTier::Late => self.late_percent,
        }
    }

    fn validate(&self) -> Result<(), CoreError> {
        for percent in [self.early_percent, self.standard_percent, self.late_percent] {
            if percent > 100 {
                return Err(CoreError::validation(format!(
                    "refund percentage {percent} exceeds 100"
                )));
            }
        }
        Ok(())
    }
}

impl Default for RefundPolicy {
    /// The platform defaults: 100% a week out, 50% inside a week, nothing on
    /// event day.
    fn default() -> Self {
        Self::new(100, 50, 0)
    }
}

/// A priced refund decision
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefundQuote {
    /// The window the cancellation fell into
    pub tier: RefundTier,
    /// Percentage of the paid amount refunded
    pub percentage: u8,
    /// Amount refunded
    pub amount: Money,
    /// Fractional days between the cancellation and the event
    pub days_until_event: f64,
}

/// Computes the refund owed for cancelling `quantity` seats bought at
/// `unit_price`, at `now`, for an event happening at `event_date`.
///
/// The amount is `unit_price * quantity * percentage / 100`, computed in
/// integer cents and rounded half up. Passing a booking's total as
/// `unit_price` with a quantity of one prices the whole booking in a single
/// rounding step.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if the policy carries a percentage
/// above 100 or the amount overflows.
pub fn calculate_refund(
    event_date: DateTime<Utc>,
    now: DateTime<Utc>,
    unit_price: Money,
    quantity: u32,
    policy: RefundPolicy,
) -> Result<RefundQuote, CoreError> {
    policy.validate()?;

    let days_until_event = days_between(now, event_date);
    let tier = RefundTier::classify(days_until_event);
    let percentage = policy.percent_for(tier);

    let gross = unit_price
        .checked_multiply(quantity)
        .ok_or_else(|| CoreError::validation("refund amount overflows"))?;
    let amount = percent_of(gross, percentage)
        .ok_or_else(|| CoreError::validation("refund amount overflows"))?;

    Ok(RefundQuote {
        tier,
        percentage,
        amount,
        days_until_event,
    })
}

/// Fractional days from `from` to `to`; negative once `to` is in the past.
fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let millis = (to - from).num_milliseconds() as f64;
    millis / MILLIS_PER_DAY
}

/// `percentage` of `amount` in integer cents, rounded half up.
const fn percent_of(amount: Money, percentage: u8) -> Option<Money> {
    let cents = match amount.cents().checked_mul(percentage as u64) {
        Some(product) => product,
        None => return None,
    };
    match cents.checked_add(50) {
        Some(biased) => Some(Money::from_cents(biased / 100)),
        None => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn base_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn quote(
        offset: Duration,
        unit_price_cents: u64,
        quantity: u32,
        policy: RefundPolicy,
    ) -> RefundQuote {
        let now = base_now();
        calculate_refund(
            now + offset,
            now,
            Money::from_cents(unit_price_cents),
            quantity,
            policy,
        )
        .unwrap()
    }

    #[test]
    fn ten_days_out_refunds_everything() {
        let q = quote(Duration::days(10), 1000, 2, RefundPolicy::default());
        assert_eq!(q.percentage, 100);
        assert_eq!(q.amount, Money::from_cents(2000));
        assert_eq!(q.tier, RefundTier::Early);
    }

    #[test]
    fn five_days_out_refunds_half() {
        let q = quote(Duration::days(5), 1000, 2, RefundPolicy::default());
        assert_eq!(q.percentage, 50);
        assert_eq!(q.amount, Money::from_cents(1000));
        assert_eq!(q.tier, RefundTier::Standard);
    }

    #[test]
    fn half_day_out_refunds_nothing() {
        let q = quote(Duration::hours(12), 1000, 2, RefundPolicy::default());
        assert_eq!(q.percentage, 0);
        assert_eq!(q.amount, Money::from_cents(0));
        assert_eq!(q.tier, RefundTier::Late);
    }

    #[test]
    fn exactly_seven_days_lands_in_the_early_tier() {
        let q = quote(Duration::days(7), 500, 1, RefundPolicy::default());
        assert_eq!(q.percentage, 100);
        assert_eq!(q.amount, Money::from_cents(500));
    }

    #[test]
    fn exactly_one_day_lands_in_the_standard_tier() {
        let q = quote(Duration::days(1), 800, 3, RefundPolicy::default());
        assert_eq!(q.percentage, 50);
        assert_eq!(q.amount, Money::from_cents(1200));
    }

    #[test]
    fn epsilon_absorbs_a_shaved_boundary() {
        // 30 seconds inside the epsilon window still counts as seven days.
        let q = quote(
            Duration::days(7) - Duration::seconds(30),
            1000,
            1,
            RefundPolicy::default(),
        );
        assert_eq!(q.percentage, 100);

        // Two minutes is beyond the epsilon and drops to the next tier.
        let q = quote(
            Duration::days(7) - Duration::minutes(2),
            1000,
            1,
            RefundPolicy::default(),
        );
        assert_eq!(q.percentage, 50);
    }

    #[test]
    fn past_events_fall_into_the_late_tier() {
        let q = quote(Duration::days(-2), 1000, 4, RefundPolicy::default());
        assert_eq!(q.tier, RefundTier::Late);
        assert_eq!(q.amount, Money::from_cents(0));
        assert!(q.days_until_event < 0.0);
    }

    #[test]
    fn organizer_override_replaces_every_tier() {
        let generous = RefundPolicy::new(100, 90, 25);
        let q = quote(Duration::hours(6), 1000, 2, generous);
        assert_eq!(q.percentage, 25);
        assert_eq!(q.amount, Money::from_cents(500));

        let q = quote(Duration::days(3), 1000, 2, generous);
        assert_eq!(q.percentage, 90);
        assert_eq!(q.amount, Money::from_cents(1800));
    }

    #[test]
    fn rounds_half_up_on_odd_cents() {
        // 50% of 25 cents is 12.5, which rounds to 13.
        let q = quote(Duration::days(3), 25, 1, RefundPolicy::default());
        assert_eq!(q.amount, Money::from_cents(13));
    }

    #[test]
    fn rejects_percentages_above_one_hundred() {
        let broken = RefundPolicy::new(150, 50, 0);
        let result = calculate_refund(
            base_now() + Duration::days(10),
            base_now(),
            Money::from_cents(1000),
            1,
            broken,
        );
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    proptest! {
        #[test]
        fn refund_never_exceeds_the_gross_amount(
            offset_hours in -720_i64..8760,
            unit_price in 0_u64..10_000_000,
            quantity in 1_u32..=10,
        ) {
            let now = base_now();
            let q = calculate_refund(
                now + Duration::hours(offset_hours),
                now,
                Money::from_cents(unit_price),
                quantity,
                RefundPolicy::default(),
            )
            .unwrap();
            let gross = unit_price * u64::from(quantity);
            prop_assert!(q.amount.cents() <= gross);
        }

        #[test]
        fn identical_inputs_always_price_identically(
            offset_hours in -720_i64..8760,
            unit_price in 0_u64..10_000_000,
            quantity in 1_u32..=10,
        ) {
            let now = base_now();
            let event_date = now + Duration::hours(offset_hours);
            let price = Money::from_cents(unit_price);
            let first =
                calculate_refund(event_date, now, price, quantity, RefundPolicy::default())
                    .unwrap();
            let second =
                calculate_refund(event_date, now, price, quantity, RefundPolicy::default())
                    .unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn percentage_always_matches_the_policy_table(
            offset_hours in -720_i64..8760,
        ) {
            let now = base_now();
            let q = calculate_refund(
                now + Duration::hours(offset_hours),
                now,
                Money::from_cents(1000),
                1,
                RefundPolicy::default(),
            )
            .unwrap();
            let expected = RefundPolicy::default().percent_for(q.tier);
            prop_assert_eq!(q.percentage, expected);
        }
    }
}
