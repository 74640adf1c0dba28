#![forbid(unsafe_code)]

//! A compact UCUM implementation sized for quantity comparison in FHIRPath
//! expressions: a curated atom table, the full metric prefix set, integer
//! exponents, and `.`/`/` unit expressions.

mod error;
mod quantity;
mod unit;

pub use error::{Error, Result};
pub use quantity::{normalize, NormalizedQuantity, Quantity};
pub use unit::{
    compare_decimal_quantities, convert_decimal, convertible, equivalent, DimensionVector, Unit,
    UnitKind,
};
