//! # Money Module
//!
//! Integer currency types for Mesa POS.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A cart that adds and removes lines all evening drifts by fractions   │
//! │  of a cent with every operation.                                        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every amount is an i64 count of cents. Sums are exact.              │
//! │    The only rounding point is weight × price-per-gram.                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mesa_core::money::{GramRate, Money};
//!
//! let price = Money::from_cents(1099);
//! let doubled = price * 2;
//! assert_eq!(doubled.cents(), 2198);
//!
//! // 59.90 per kilogram, 350 g on the scale
//! let rate = GramRate::from_cents_per_kg(5990);
//! assert_eq!(rate.price_for_grams(350).unwrap().cents(), 2097);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (centavos / cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: differences such as `subtotal - discount` may go
///   negative before clamping
/// - **Single field tuple struct**: zero-cost abstraction over i64
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use mesa_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a unit count. `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use mesa_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).unwrap().cents(), 897);
    /// assert!(Money::from_cents(i64::MAX).multiply_quantity(2).is_none());
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Clamps negative values to zero.
    ///
    /// ## Example
    /// ```rust
    /// use mesa_core::money::Money;
    ///
    /// let owed = Money::from_cents(2000) - Money::from_cents(2500);
    /// assert_eq!(owed.clamp_non_negative(), Money::zero());
    /// ```
    #[inline]
    pub fn clamp_non_negative(self) -> Self {
        Money(self.0.max(0))
    }
}

/// Debug-oriented rendering: `12.50`, `-3.05`.
///
/// Currency symbols and locale separators belong to the UI layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Gram Rate
// =============================================================================

/// Price per gram for weighable products.
///
/// ## Unit
/// Stored as thousandths of a cent per gram ("millicents per gram").
/// That is numerically the same as cents per kilogram, so a buffet priced
/// at 59.90/kg is `GramRate::from_millicents(5990)`.
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Why not Money per gram?                                                │
/// │                                                                         │
/// │  59.90/kg = 0.0599 per gram = 5.99 cents per gram                      │
/// │  Whole cents per gram cannot express it; millicents can.               │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GramRate(i64);

impl GramRate {
    /// Creates a rate from thousandths of a cent per gram.
    #[inline]
    pub const fn from_millicents(millicents_per_gram: i64) -> Self {
        GramRate(millicents_per_gram)
    }

    /// Creates a rate from a per-kilogram price in cents.
    #[inline]
    pub const fn from_cents_per_kg(cents_per_kg: i64) -> Self {
        GramRate(cents_per_kg)
    }

    #[inline]
    pub const fn millicents(&self) -> i64 {
        self.0
    }

    /// Price per kilogram, for display next to the product.
    #[inline]
    pub const fn per_kg(&self) -> Money {
        Money::from_cents(self.0)
    }

    /// Prices a weight in grams, rounding half away from zero to whole cents.
    ///
    /// Returns `None` when the price does not fit in an `i64` of cents.
    ///
    /// ## Example
    /// ```rust
    /// use mesa_core::money::GramRate;
    ///
    /// let rate = GramRate::from_millicents(5990);
    /// // 1 kg at 59.90/kg
    /// assert_eq!(rate.price_for_grams(1000).unwrap().cents(), 5990);
    /// // 125 g → 748.75 cents → 749
    /// assert_eq!(rate.price_for_grams(125).unwrap().cents(), 749);
    /// ```
    pub fn price_for_grams(&self, grams: i64) -> Option<Money> {
        // i64 × i64 always fits in i128
        let raw = grams as i128 * self.0 as i128;
        let cents = if raw >= 0 {
            (raw + 500) / 1000
        } else {
            (raw - 500) / 1000
        };
        i64::try_from(cents).ok().map(Money::from_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
