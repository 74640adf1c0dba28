use rust_decimal::Decimal;

use crate::error::Result;
use crate::unit::{DimensionVector, Unit, UnitKind};

/// A decimal value paired with a UCUM unit code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quantity {
    pub value: Decimal,
    pub unit: String,
}

/// A quantity reduced to base units, suitable for direct comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedQuantity {
    pub value: Decimal,
    pub unit: String,
    pub dimensions: DimensionVector,
}

/// Reduce a quantity to its base-unit representation.
///
/// Affine units (Celsius) normalize to kelvin; everything else normalizes to
/// the product of UCUM base atoms its dimension vector spells.
pub fn normalize(value: Decimal, unit: &str) -> Result<NormalizedQuantity> {
    let parsed = Unit::parse(unit)?;
    let base = parsed.to_base(value)?;
    let rendered = match parsed.kind {
        UnitKind::Affine { .. } => "K".to_string(),
        UnitKind::Multiplicative { .. } => render_base_expr(parsed.dimensions),
    };
    Ok(NormalizedQuantity {
        value: base,
        unit: rendered,
        dimensions: parsed.dimensions,
    })
}

fn render_base_expr(dim: DimensionVector) -> String {
    let mut out = String::new();
    let parts = [
        ("g", dim.0[1]),
        ("mol", dim.0[7]),
        ("m", dim.0[0]),
        ("s", dim.0[2]),
        ("K", dim.0[4]),
        ("C", dim.0[5]),
        ("rad", dim.0[3]),
        ("cd", dim.0[6]),
    ];
    for (sym, exp) in parts {
        if exp == 0 {
            continue;
        }
        if !out.is_empty() {
            out.push('.');
        }
        out.push_str(sym);
        if exp != 1 {
            out.push_str(&exp.to_string());
        }
    }
    if out.is_empty() {
        out.push('1');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn normalize_mass() {
        let n = normalize(dec("1000"), "mg").unwrap();
        assert_eq!(n.value, dec("1.000"));
        assert_eq!(n.unit, "g");
    }

    #[test]
    fn normalize_concentration() {
        let n = normalize(dec("1"), "mg/dL").unwrap();
        assert_eq!(n.unit, "g.m-3");
    }

    #[test]
    fn normalize_dimensionless() {
        let n = normalize(dec("50"), "%").unwrap();
        assert_eq!(n.value, dec("0.50"));
        assert_eq!(n.unit, "1");
    }
}
