//! Registry of named units and SI prefixes.
use std::collections::BTreeMap;

use log::debug;

use crate::{
    dimension::{BaseDimension, Dimension},
    error::UnitError,
    parser::{UnitExpr, parse_unit_expr},
    unit::Unit,
};

/// Prefixes with their multiplier. Long spellings first so that `kilo` wins over `k`.
const PREFIXES: &[(&str, f64)] = &[
    ("yotta", 1e24),
    ("zetta", 1e21),
    ("exa", 1e18),
    ("peta", 1e15),
    ("tera", 1e12),
    ("giga", 1e9),
    ("mega", 1e6),
    ("kilo", 1e3),
    ("hecto", 1e2),
    ("deca", 1e1),
    ("deci", 1e-1),
    ("centi", 1e-2),
    ("milli", 1e-3),
    ("micro", 1e-6),
    ("nano", 1e-9),
    ("pico", 1e-12),
    ("femto", 1e-15),
    ("atto", 1e-18),
    ("zepto", 1e-21),
    ("yocto", 1e-24),
    ("da", 1e1),
    ("Y", 1e24),
    ("Z", 1e21),
    ("E", 1e18),
    ("P", 1e15),
    ("T", 1e12),
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("h", 1e2),
    ("d", 1e-1),
    ("c", 1e-2),
    ("m", 1e-3),
    ("u", 1e-6),
    ("µ", 1e-6),
    ("μ", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
    ("a", 1e-18),
    ("z", 1e-21),
    ("y", 1e-24),
];

#[derive(Debug, Clone, PartialEq)]
struct UnitDef {
    factor: f64,
    dimension: Dimension,
    prefixable: bool,
}

/// Named units known to the engine.
///
/// [`UnitRegistry::default`] ships SI base and derived units, the non-SI units
/// common in materials data (angstrom, eV, bar, atm, cal, ...) and the SI prefixes.
/// Additional aliases can be added with [`UnitRegistry::define`].
#[derive(Debug, Clone, PartialEq)]
pub struct UnitRegistry {
    units: BTreeMap<String, UnitDef>,
}

impl UnitRegistry {
    /// A registry with no units at all.
    pub fn empty() -> Self {
        Self {
            units: BTreeMap::new(),
        }
    }

    fn insert(&mut self, names: &[&str], factor: f64, dimension: Dimension, prefixable: bool) {
        for name in names {
            self.units.insert(
                name.to_string(),
                UnitDef {
                    factor,
                    dimension,
                    prefixable,
                },
            );
        }
    }

    fn insert_derived(&mut self, names: &[&str], definition: &str, prefixable: bool) {
        // Definitions below only reference units inserted before them.
        match self.parse(definition) {
            Ok(unit) => self.insert(names, unit.factor, unit.dimension, prefixable),
            Err(e) => debug!("skipping builtin unit {names:?}: {e}"),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    /// Number of registered names (aliases count separately, prefixed forms do not).
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Register `name` as an alias for the unit expression `expr`.
    ///
    /// `define("atom", "[]")` registers a dimensionless counting unit. Redefining a
    /// name with the same meaning is accepted; a different meaning is rejected.
    pub fn define(&mut self, name: &str, expr: &str) -> Result<(), UnitError> {
        let valid_name = !name.is_empty() && name.chars().all(|c| c.is_alphabetic() || c == '_');
        if !valid_name {
            return Err(UnitError::InvalidDefinition {
                name: name.to_string(),
                reason: "unit names may only contain letters and underscores".to_string(),
            });
        }

        let unit = self.parse(expr)?;
        let def = UnitDef {
            factor: unit.factor,
            dimension: unit.dimension,
            prefixable: true,
        };

        if let Some(existing) = self.units.get(name) {
            let same = Unit::new(existing.factor, existing.dimension, name) == unit;
            if !same {
                return Err(UnitError::InvalidDefinition {
                    name: name.to_string(),
                    reason: format!("already defined with a different meaning than `{expr}`"),
                });
            }
            return Ok(());
        }

        debug!("defined unit `{name} = {expr}`");
        self.units.insert(name.to_string(), def);
        Ok(())
    }

    /// Resolve a single unit name, trying exact, prefixed and plural spellings.
    fn lookup(&self, name: &str) -> Option<(f64, Dimension)> {
        if let Some(def) = self.units.get(name) {
            return Some((def.factor, def.dimension));
        }

        for (prefix, multiplier) in PREFIXES {
            if let Some(rest) = name.strip_prefix(prefix)
                && let Some(def) = self.units.get(rest)
                && def.prefixable
            {
                return Some((multiplier * def.factor, def.dimension));
            }
        }

        name.strip_suffix('s')
            .filter(|singular| !singular.is_empty())
            .and_then(|singular| self.lookup(singular))
    }

    fn resolve(&self, expr: &UnitExpr, text: &str) -> Result<(f64, Dimension), UnitError> {
        let overflow = || UnitError::ExponentOverflow {
            text: text.to_string(),
        };

        match expr {
            UnitExpr::Scale(x) => Ok((*x, Dimension::DIMENSIONLESS)),
            UnitExpr::Dimensionless => Ok((1.0, Dimension::DIMENSIONLESS)),
            UnitExpr::Name(name) => self
                .lookup(name)
                .ok_or_else(|| UnitError::UnknownUnit(name.clone())),
            UnitExpr::Mul(lhs, rhs) => {
                let (fl, dl) = self.resolve(lhs, text)?;
                let (fr, dr) = self.resolve(rhs, text)?;
                Ok((fl * fr, dl.checked_mul(dr).ok_or_else(overflow)?))
            }
            UnitExpr::Div(lhs, rhs) => {
                let (fl, dl) = self.resolve(lhs, text)?;
                let (fr, dr) = self.resolve(rhs, text)?;
                Ok((fl / fr, dl.checked_div(dr).ok_or_else(overflow)?))
            }
            UnitExpr::Pow(base, n) => {
                let (f, d) = self.resolve(base, text)?;
                Ok((f.powi(*n), d.checked_powi(*n).ok_or_else(overflow)?))
            }
        }
    }

    /// Parse a unit expression such as `g / cm^3`, `GPa` or `1 / GPa`.
    pub fn parse(&self, text: &str) -> Result<Unit, UnitError> {
        let expr = parse_unit_expr(text).map_err(|messages| UnitError::Parse {
            text: text.to_string(),
            messages,
        })?;
        let (factor, dimension) = self.resolve(&expr, text)?;

        let text = match text.trim() {
            "" | "[]" => "dimensionless",
            trimmed => trimmed,
        };
        Ok(Unit::new(factor, dimension, text))
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        use BaseDimension::*;

        let mut reg = Self::empty();
        let base = Dimension::base;
        let none = Dimension::DIMENSIONLESS;

        // Base units. The kilogram is expressed through the gram so that prefixes apply.
        reg.insert(&["m", "meter", "metre"], 1.0, base(Length), true);
        reg.insert(&["g", "gram", "gramme"], 1e-3, base(Mass), true);
        reg.insert(&["s", "second", "sec"], 1.0, base(Time), true);
        reg.insert(&["A", "ampere"], 1.0, base(Current), true);
        reg.insert(&["K", "kelvin"], 1.0, base(Temperature), true);
        reg.insert(&["mol", "mole"], 1.0, base(Amount), true);
        reg.insert(&["cd", "candela"], 1.0, base(Luminosity), true);

        reg.insert(&["dimensionless", "percent_one"], 1.0, none, false);
        reg.insert(&["%", "percent"], 1e-2, none, false);
        reg.insert(&["rad", "radian"], 1.0, none, true);
        reg.insert(&["deg", "degree"], std::f64::consts::PI / 180.0, none, false);
        reg.insert(&["atom"], 1.0, none, false);

        // Derived units.
        reg.insert_derived(&["N", "newton"], "kg m / s^2", true);
        reg.insert_derived(&["Pa", "pascal"], "N / m^2", true);
        reg.insert_derived(&["J", "joule"], "N m", true);
        reg.insert_derived(&["W", "watt"], "J / s", true);
        reg.insert_derived(&["C", "coulomb"], "A s", true);
        reg.insert_derived(&["V", "volt"], "J / C", true);
        reg.insert_derived(&["ohm", "Ω"], "V / A", true);
        reg.insert_derived(&["S", "siemens"], "1 / ohm", true);
        reg.insert_derived(&["Hz", "hertz"], "1 / s", true);
        reg.insert_derived(&["L", "l", "liter", "litre"], "dm^3", true);
        reg.insert_derived(&["cc"], "cm^3", false);

        // Non-SI units common in materials data.
        reg.insert_derived(&["angstrom", "Å", "Ang"], "1e-10 m", false);
        reg.insert_derived(&["eV", "electron_volt"], "1.602176634e-19 J", true);
        reg.insert_derived(&["bar"], "1e5 Pa", true);
        reg.insert_derived(&["atm", "atmosphere"], "101325 Pa", false);
        reg.insert_derived(&["cal", "calorie"], "4.184 J", true);
        reg.insert_derived(&["amu", "Da", "dalton"], "1.66053906660e-27 kg", true);
        reg.insert_derived(&["min", "minute"], "60 s", false);
        reg.insert_derived(&["hour", "hr"], "3600 s", false);
        reg.insert_derived(&["day"], "86400 s", false);
        reg.insert_derived(&["Ry", "rydberg"], "13.605693122994 eV", false);
        reg.insert_derived(&["Ha", "hartree"], "27.211386245988 eV", false);
        reg.insert_derived(&["bohr"], "0.529177210903 angstrom", false);

        reg
    }
}
