use std::fmt;

use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

/// The seven SI base dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumCount)]
#[strum(serialize_all = "lowercase")]
pub enum BaseDimension {
    Length,
    Mass,
    Time,
    Current,
    Temperature,
    Amount,
    Luminosity,
}

/// Integer exponents over [`BaseDimension`], e.g. pressure is `mass^1 length^-1 time^-2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimension([i8; BaseDimension::COUNT]);

impl Dimension {
    pub const DIMENSIONLESS: Dimension = Dimension([0; BaseDimension::COUNT]);

    pub fn base(dim: BaseDimension) -> Self {
        let mut exponents = [0; BaseDimension::COUNT];
        exponents[dim as usize] = 1;
        Dimension(exponents)
    }

    pub fn exponent(&self, dim: BaseDimension) -> i8 {
        self.0[dim as usize]
    }

    pub fn is_dimensionless(&self) -> bool {
        *self == Self::DIMENSIONLESS
    }

    /// Raise to an integer power. `None` if an exponent leaves the `i8` range.
    pub fn checked_powi(self, n: i32) -> Option<Self> {
        let mut exponents = self.0;
        for e in exponents.iter_mut() {
            *e = i8::try_from(i32::from(*e).checked_mul(n)?).ok()?;
        }
        Some(Dimension(exponents))
    }

    /// Dimension of a product. `None` if an exponent leaves the `i8` range.
    pub fn checked_mul(self, rhs: Dimension) -> Option<Self> {
        let mut exponents = self.0;
        for (e, r) in exponents.iter_mut().zip(rhs.0) {
            *e = e.checked_add(r)?;
        }
        Some(Dimension(exponents))
    }

    /// Dimension of a quotient. `None` if an exponent leaves the `i8` range.
    pub fn checked_div(self, rhs: Dimension) -> Option<Self> {
        let mut exponents = self.0;
        for (e, r) in exponents.iter_mut().zip(rhs.0) {
            *e = e.checked_sub(r)?;
        }
        Some(Dimension(exponents))
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "[]");
        }

        let mut first = true;
        for dim in BaseDimension::iter() {
            let exp = self.exponent(dim);
            if exp == 0 {
                continue;
            }
            if !first {
                write!(f, " ")?;
            }
            first = false;
            match exp {
                1 => write!(f, "[{dim}]")?,
                _ => write!(f, "[{dim}]^{exp}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressure_dimension() {
        let length = Dimension::base(BaseDimension::Length);
        let mass = Dimension::base(BaseDimension::Mass);
        let time = Dimension::base(BaseDimension::Time);

        let pressure = time
            .checked_powi(2)
            .and_then(|t2| length.checked_mul(t2))
            .and_then(|d| mass.checked_div(d))
            .unwrap();
        assert_eq!(pressure.exponent(BaseDimension::Mass), 1);
        assert_eq!(pressure.exponent(BaseDimension::Length), -1);
        assert_eq!(pressure.exponent(BaseDimension::Time), -2);
        assert_eq!(pressure.to_string(), "[length]^-1 [mass] [time]^-2");
        assert!(pressure.checked_div(pressure).unwrap().is_dimensionless());
    }

    #[test]
    fn exponent_overflow_is_detected() {
        let length = Dimension::base(BaseDimension::Length);
        let big = length.checked_powi(100).unwrap();
        assert_eq!(big.exponent(BaseDimension::Length), 100);
        assert_eq!(big.checked_mul(big), None);
        assert_eq!(length.checked_powi(256), None);
        assert_eq!(length.checked_powi(-128).unwrap().exponent(BaseDimension::Length), -128);
        assert_eq!(big.checked_div(length.checked_powi(-100).unwrap()), None);
    }
}
