//! Unit parsing and dimensional analysis.
//!
//! A UCUM code is decomposed into components joined by `.` (product) and `/`
//! (quotient). Each component is an optional metric prefix, an atom from the
//! curated table, and an optional integer exponent. `{annotation}` components
//! and plain integer factors are dimensionless.

use std::collections::HashMap;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use once_cell::sync::Lazy;
use rust_decimal::Decimal;

use crate::error::{Error, Result};

/// Exponents over the UCUM base dimensions, in the order
/// metre, gram, second, radian, kelvin, coulomb, candela, mole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DimensionVector(pub [i8; 8]);

impl DimensionVector {
    pub const ZERO: DimensionVector = DimensionVector([0; 8]);

    pub fn is_dimensionless(&self) -> bool {
        *self == Self::ZERO
    }

    fn scaled(self, exp: i8) -> DimensionVector {
        let mut out = [0i8; 8];
        for (o, d) in out.iter_mut().zip(self.0) {
            *o = d.saturating_mul(exp);
        }
        DimensionVector(out)
    }
}

impl Add for DimensionVector {
    type Output = DimensionVector;
    fn add(self, rhs: DimensionVector) -> DimensionVector {
        let mut out = [0i8; 8];
        for i in 0..8 {
            out[i] = self.0[i].saturating_add(rhs.0[i]);
        }
        DimensionVector(out)
    }
}

impl Sub for DimensionVector {
    type Output = DimensionVector;
    fn sub(self, rhs: DimensionVector) -> DimensionVector {
        self + (-rhs)
    }
}

impl Neg for DimensionVector {
    type Output = DimensionVector;
    fn neg(self) -> DimensionVector {
        self.scaled(-1)
    }
}

/// How a unit maps onto its base representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitKind {
    /// `base = value * factor`
    Multiplicative { factor: Decimal },
    /// `base = value * factor + offset` (Celsius and friends).
    Affine { factor: Decimal, offset: Decimal },
}

/// A parsed unit expression reduced to a scale factor and a dimension vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub kind: UnitKind,
    pub dimensions: DimensionVector,
}

struct AtomDef {
    factor: &'static str,
    dims: [i8; 8],
    metric: bool,
    /// Kelvin offset for affine temperature atoms, `None` otherwise.
    offset: Option<&'static str>,
}

const fn atom(factor: &'static str, dims: [i8; 8], metric: bool) -> AtomDef {
    AtomDef {
        factor,
        dims,
        metric,
        offset: None,
    }
}

// Dimension index shorthand: [m, g, s, rad, K, C, cd, mol]
#[rustfmt::skip]
static ATOM_TABLE: &[(&str, AtomDef)] = &[
    // Base atoms
    ("m",      atom("1", [1, 0, 0, 0, 0, 0, 0, 0], true)),
    ("g",      atom("1", [0, 1, 0, 0, 0, 0, 0, 0], true)),
    ("s",      atom("1", [0, 0, 1, 0, 0, 0, 0, 0], true)),
    ("rad",    atom("1", [0, 0, 0, 1, 0, 0, 0, 0], true)),
    ("K",      atom("1", [0, 0, 0, 0, 1, 0, 0, 0], true)),
    ("C",      atom("1", [0, 0, 0, 0, 0, 1, 0, 0], true)),
    ("cd",     atom("1", [0, 0, 0, 0, 0, 0, 1, 0], true)),
    ("mol",    atom("1", [0, 0, 0, 0, 0, 0, 0, 1], true)),
    // Dimensionless
    ("1",      atom("1",    [0; 8], false)),
    ("%",      atom("0.01", [0; 8], false)),
    // Time (definite durations; calendar semantics live in the caller)
    ("min",    atom("60",       [0, 0, 1, 0, 0, 0, 0, 0], false)),
    ("h",      atom("3600",     [0, 0, 1, 0, 0, 0, 0, 0], false)),
    ("d",      atom("86400",    [0, 0, 1, 0, 0, 0, 0, 0], false)),
    ("wk",     atom("604800",   [0, 0, 1, 0, 0, 0, 0, 0], false)),
    ("mo",     atom("2629800",  [0, 0, 1, 0, 0, 0, 0, 0], false)),
    ("a",      atom("31557600", [0, 0, 1, 0, 0, 0, 0, 0], false)),
    // Volume (litre = dm3)
    ("L",      atom("0.001", [3, 0, 0, 0, 0, 0, 0, 0], true)),
    ("l",      atom("0.001", [3, 0, 0, 0, 0, 0, 0, 0], true)),
    // Amount-of-substance convenience
    ("eq",     atom("1", [0, 0, 0, 0, 0, 0, 0, 1], true)),
    // Derived SI (factors expressed in gram-based dimensions)
    ("Hz",     atom("1",    [0, 0, -1, 0, 0, 0, 0, 0], true)),
    ("N",      atom("1000", [1, 1, -2, 0, 0, 0, 0, 0], true)),
    ("Pa",     atom("1000", [-1, 1, -2, 0, 0, 0, 0, 0], true)),
    ("J",      atom("1000", [2, 1, -2, 0, 0, 0, 0, 0], true)),
    ("W",      atom("1000", [2, 1, -3, 0, 0, 0, 0, 0], true)),
    // Pressure, clinical
    ("bar",    atom("100000000",     [-1, 1, -2, 0, 0, 0, 0, 0], true)),
    ("atm",    atom("101325000",     [-1, 1, -2, 0, 0, 0, 0, 0], false)),
    ("mm[Hg]", atom("133322.387415", [-1, 1, -2, 0, 0, 0, 0, 0], false)),
    // Customary lengths and masses
    ("[in_i]", atom("0.0254",        [1, 0, 0, 0, 0, 0, 0, 0], false)),
    ("[ft_i]", atom("0.3048",        [1, 0, 0, 0, 0, 0, 0, 0], false)),
    ("[lb_av]", atom("453.59237",    [0, 1, 0, 0, 0, 0, 0, 0], false)),
    ("[oz_av]", atom("28.349523125", [0, 1, 0, 0, 0, 0, 0, 0], false)),
    // Affine temperature
    ("Cel",    AtomDef { factor: "1", dims: [0, 0, 0, 0, 1, 0, 0, 0], metric: false, offset: Some("273.15") }),
];

static ATOMS: Lazy<HashMap<&'static str, &'static AtomDef>> =
    Lazy::new(|| ATOM_TABLE.iter().map(|(code, def)| (*code, def)).collect());

// Ordered longest-first so "da" is tried before "d".
static PREFIXES: &[(&str, &str)] = &[
    ("da", "10"),
    ("h", "100"),
    ("k", "1000"),
    ("M", "1000000"),
    ("G", "1000000000"),
    ("T", "1000000000000"),
    ("d", "0.1"),
    ("c", "0.01"),
    ("m", "0.001"),
    ("u", "0.000001"),
    ("n", "0.000000001"),
    ("p", "0.000000000001"),
    ("f", "0.000000000000001"),
];

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("unit table factor is a valid decimal")
}

impl Unit {
    /// Parse a UCUM code into a unit. `{annotation}` terms are dimensionless.
    pub fn parse(code: &str) -> Result<Unit> {
        if !code.is_ascii() {
            return Err(Error::NonAscii);
        }
        if code.chars().any(|c| c.is_whitespace()) {
            return Err(Error::ContainsWhitespace);
        }
        if code.is_empty() {
            // The empty unit is the UCUM unity.
            return Ok(Unit {
                kind: UnitKind::Multiplicative {
                    factor: Decimal::ONE,
                },
                dimensions: DimensionVector::ZERO,
            });
        }

        let mut factor = Decimal::ONE;
        let mut dims = DimensionVector::ZERO;
        let mut affine: Option<Decimal> = None;
        let mut component_count = 0usize;

        let mut rest = code;
        let mut sign = 1i8;
        // A leading '/' inverts the first component.
        if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
            sign = -1;
        }

        loop {
            let split = rest.find(['.', '/']);
            let (component, next_sign, remainder) = match split {
                Some(pos) => {
                    let sep = rest.as_bytes()[pos];
                    let next = if sep == b'/' { -1 } else { 1 };
                    (&rest[..pos], next, &rest[pos + 1..])
                }
                None => (rest, 0, ""),
            };

            if component.is_empty() {
                return Err(Error::Syntax {
                    pos: code.len() - rest.len(),
                    message: "empty unit component",
                });
            }

            let parsed = parse_component(component)?;
            component_count += 1;

            if let Some(offset) = parsed.offset {
                if sign != 1 || parsed.exponent != 1 {
                    return Err(Error::AffineExponent(component.to_string()));
                }
                affine = Some(offset);
            }

            let exp = parsed.exponent.saturating_mul(sign as i32);
            factor = apply_exponent(factor, parsed.factor, exp)?;
            dims = dims + parsed.dims.scaled(clamp_exp(exp)?);

            if remainder.is_empty() {
                break;
            }
            sign = next_sign;
            rest = remainder;
        }

        match affine {
            Some(offset) if component_count == 1 => Ok(Unit {
                kind: UnitKind::Affine { factor, offset },
                dimensions: dims,
            }),
            Some(_) => Err(Error::AffineExponent(code.to_string())),
            None => Ok(Unit {
                kind: UnitKind::Multiplicative { factor },
                dimensions: dims,
            }),
        }
    }

    /// Convert a value in this unit to the base representation.
    pub fn to_base(&self, value: Decimal) -> Result<Decimal> {
        match &self.kind {
            UnitKind::Multiplicative { factor } => {
                value.checked_mul(*factor).ok_or(Error::Overflow)
            }
            UnitKind::Affine { factor, offset } => value
                .checked_mul(*factor)
                .and_then(|v| v.checked_add(*offset))
                .ok_or(Error::Overflow),
        }
    }

    /// Convert a value in the base representation back into this unit.
    pub fn from_base(&self, base: Decimal) -> Result<Decimal> {
        match &self.kind {
            UnitKind::Multiplicative { factor } => {
                base.checked_div(*factor).ok_or(Error::Overflow)
            }
            UnitKind::Affine { factor, offset } => base
                .checked_sub(*offset)
                .and_then(|v| v.checked_div(*factor))
                .ok_or(Error::Overflow),
        }
    }
}

struct Component {
    factor: Decimal,
    dims: DimensionVector,
    exponent: i32,
    offset: Option<Decimal>,
}

fn clamp_exp(exp: i32) -> Result<i8> {
    i8::try_from(exp).map_err(|_| Error::Overflow)
}

fn apply_exponent(acc: Decimal, base: Decimal, exp: i32) -> Result<Decimal> {
    let mut out = acc;
    if exp >= 0 {
        for _ in 0..exp {
            out = out.checked_mul(base).ok_or(Error::Overflow)?;
        }
    } else {
        for _ in 0..exp.unsigned_abs() {
            out = out.checked_div(base).ok_or(Error::Overflow)?;
        }
    }
    Ok(out)
}

fn parse_component(component: &str) -> Result<Component> {
    // Annotations carry no dimension.
    if component.starts_with('{') && component.ends_with('}') {
        return Ok(Component {
            factor: Decimal::ONE,
            dims: DimensionVector::ZERO,
            exponent: 1,
            offset: None,
        });
    }

    // A plain integer is a dimensionless scale factor (e.g. "10" in "10.L").
    if component.bytes().all(|b| b.is_ascii_digit()) {
        let factor = Decimal::from_str(component).map_err(|_| Error::Overflow)?;
        return Ok(Component {
            factor,
            dims: DimensionVector::ZERO,
            exponent: 1,
            offset: None,
        });
    }

    let (symbol, exponent) = split_exponent(component)?;

    // Exact atom match wins over prefix decomposition ("mo" is month, not
    // milli-anything; "min" is minute).
    if let Some(def) = ATOMS.get(symbol) {
        return Ok(Component {
            factor: dec(def.factor),
            dims: DimensionVector(def.dims),
            exponent,
            offset: def.offset.map(dec),
        });
    }

    for (prefix, prefix_factor) in PREFIXES {
        if let Some(stem) = symbol.strip_prefix(prefix) {
            if let Some(def) = ATOMS.get(stem) {
                if !def.metric {
                    return Err(Error::NotPrefixable(stem.to_string()));
                }
                if def.offset.is_some() {
                    return Err(Error::AffineExponent(symbol.to_string()));
                }
                let factor = dec(prefix_factor)
                    .checked_mul(dec(def.factor))
                    .ok_or(Error::Overflow)?;
                return Ok(Component {
                    factor,
                    dims: DimensionVector(def.dims),
                    exponent,
                    offset: None,
                });
            }
        }
    }

    Err(Error::UnknownUnit(symbol.to_string()))
}

fn split_exponent(component: &str) -> Result<(&str, i32)> {
    let trailing_digits = component
        .bytes()
        .rev()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if trailing_digits == 0 {
        return Ok((component, 1));
    }

    let mut split_at = component.len() - trailing_digits;
    // Optional sign immediately before the digits.
    if split_at > 0 {
        let prev = component.as_bytes()[split_at - 1];
        if prev == b'+' || prev == b'-' {
            split_at -= 1;
        }
    }
    if split_at == 0 {
        // All digits; handled as a factor by the caller.
        return Ok((component, 1));
    }

    let exponent: i32 = component[split_at..].parse().map_err(|_| Error::Syntax {
        pos: split_at,
        message: "invalid exponent",
    })?;
    Ok((&component[..split_at], exponent))
}

/// True when two unit codes describe the same physical dimension.
pub fn convertible(from: &str, to: &str) -> bool {
    match (Unit::parse(from), Unit::parse(to)) {
        (Ok(a), Ok(b)) => a.dimensions == b.dimensions,
        _ => false,
    }
}

/// Convert a decimal value from one unit to another.
pub fn convert_decimal(value: Decimal, from: &str, to: &str) -> Result<Decimal> {
    let from_unit = Unit::parse(from)?;
    let to_unit = Unit::parse(to)?;
    if from_unit.dimensions != to_unit.dimensions {
        return Err(Error::Incompatible {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    to_unit.from_base(from_unit.to_base(value)?)
}

/// Compare two quantities after reduction to base units.
///
/// Identical unit strings compare directly, so quantities in unknown (for
/// example annotation-only) units still order among themselves.
pub fn compare_decimal_quantities(
    left_value: Decimal,
    left_unit: &str,
    right_value: Decimal,
    right_unit: &str,
) -> Result<std::cmp::Ordering> {
    if left_unit == right_unit {
        return Ok(left_value.cmp(&right_value));
    }
    let left = Unit::parse(left_unit)?;
    let right = Unit::parse(right_unit)?;
    if left.dimensions != right.dimensions {
        return Err(Error::Incompatible {
            from: left_unit.to_string(),
            to: right_unit.to_string(),
        });
    }
    Ok(left.to_base(left_value)?.cmp(&right.to_base(right_value)?))
}

/// True when two quantities denote the same measurement.
pub fn equivalent(
    left_value: Decimal,
    left_unit: &str,
    right_value: Decimal,
    right_unit: &str,
) -> Result<bool> {
    Ok(
        compare_decimal_quantities(left_value, left_unit, right_value, right_unit)?
            == std::cmp::Ordering::Equal,
    )
}
