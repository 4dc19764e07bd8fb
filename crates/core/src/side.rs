use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Direction of a signal, position, or order.
///
/// Integer-backed: `Short = -1`, `Flat = 0`, `Long = 1`. The numeric form is
/// what crosses the wire and what the price arithmetic is defined over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    Short = -1,
    #[default]
    Flat = 0,
    Long = 1,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid side value: {0} (expected -1, 0, or 1)")]
pub struct InvalidSide(pub i8);

impl Side {
    /// Sign as a `Decimal`, for price arithmetic.
    #[must_use]
    pub fn factor(self) -> Decimal {
        Decimal::from(self as i8)
    }

    /// The opposite direction. `Flat` stays `Flat`.
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::Short => Self::Long,
            Self::Flat => Self::Flat,
            Self::Long => Self::Short,
        }
    }

    /// A price improved for this side by `offset`: lower for longs, higher
    /// for shorts. `base - side * offset`.
    #[must_use]
    pub fn better_price(self, base: Decimal, offset: Decimal) -> Decimal {
        base - self.factor() * offset
    }

    /// Index into an `[ask0, bid0]` book pair: `(1 - side) / 2`.
    ///
    /// Longs cross the ask (0), shorts cross the bid (1). `None` for `Flat`;
    /// there is no best price to quote against without a direction.
    #[must_use]
    pub const fn book_index(self) -> Option<usize> {
        match self {
            Self::Long => Some(0),
            Self::Short => Some(1),
            Self::Flat => None,
        }
    }

    /// Direction implied by a signed quantity.
    #[must_use]
    pub fn from_signed_qty(qty: Decimal) -> Self {
        if qty > Decimal::ZERO {
            Self::Long
        } else if qty < Decimal::ZERO {
            Self::Short
        } else {
            Self::Flat
        }
    }

    #[must_use]
    pub const fn is_flat(self) -> bool {
        matches!(self, Self::Flat)
    }
}

impl std::ops::Neg for Side {
    type Output = Self;

    fn neg(self) -> Self {
        self.flip()
    }
}

impl TryFrom<i8> for Side {
    type Error = InvalidSide;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Short),
            0 => Ok(Self::Flat),
            1 => Ok(Self::Long),
            other => Err(InvalidSide(other)),
        }
    }
}

impl Serialize for Side {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(*self as i8)
    }
}

impl<'de> Deserialize<'de> for Side {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i8::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}
