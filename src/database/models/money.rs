use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Monetary amount. Integral values go out as JSON integers, everything else
/// as a JSON number; strings such as "150.25" are accepted on input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(pub Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Money(amount.normalize())
    }

    /// Split into `parts` amounts rounded to cents; the last part absorbs the remainder
    pub fn split(&self, parts: u32) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }
        let share = (self.0 / Decimal::from(parts)).round_dp(2);
        let mut out = vec![Money::new(share); parts as usize - 1];
        let allocated: Decimal = share * Decimal::from(parts - 1);
        out.push(Money::new(self.0 - allocated));
        out
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Money(Decimal::from(value))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money::new(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money::new(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.0.normalize();
        if value.fract().is_zero() {
            if let Some(int) = value.to_i64() {
                return serializer.serialize_i64(int);
            }
        }
        match value.to_f64() {
            Some(float) => serializer.serialize_f64(float),
            None => Err(serde::ser::Error::custom("amount out of range")),
        }
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number or numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Ok(Money::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        Ok(Money(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Decimal::from_f64(v)
            .map(Money::new)
            .ok_or_else(|| E::custom(format!("invalid amount: {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        Decimal::from_str(v.trim().replace(',', ".").as_str())
            .map(Money::new)
            .map_err(|_| E::custom(format!("invalid amount: {}", v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integral_amounts_serialize_as_integers() {
        let m: Money = serde_json::from_value(json!(100)).unwrap();
        assert_eq!(serde_json::to_value(m).unwrap(), json!(100));

        let m: Money = serde_json::from_value(json!(100.0)).unwrap();
        assert_eq!(serde_json::to_value(m).unwrap(), json!(100));
    }

    #[test]
    fn fractional_amounts_keep_cents() {
        let m: Money = serde_json::from_value(json!(99.5)).unwrap();
        assert_eq!(serde_json::to_value(m).unwrap(), json!(99.5));

        let m: Money = serde_json::from_value(json!("150,25")).unwrap();
        assert_eq!(m.to_string(), "150.25");
    }

    #[test]
    fn split_assigns_remainder_to_last_part() {
        let parts = Money::from(100).split(3);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].to_string(), "33.33");
        assert_eq!(parts[2].to_string(), "33.34");
        assert_eq!(parts.iter().sum::<Money>(), Money::from(100));
    }
}
