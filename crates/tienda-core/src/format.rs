//! Display helpers shared by tables, the draft footer and messages.

use crate::money::Money;
use crate::quantity::Quantity;

/// `$10.99`, `-$5.50`.
pub fn format_money(amount: Money) -> String {
    amount.to_string()
}

/// Whole quantities without decimals, fractional ones with exactly three.
///
/// ```rust
/// use tienda_core::format::format_quantity;
/// use tienda_core::quantity::Quantity;
///
/// assert_eq!(format_quantity(Quantity::from_units(3)), "3");
/// assert_eq!(format_quantity(Quantity::from_milli(2500)), "2.500");
/// ```
pub fn format_quantity(quantity: Quantity) -> String {
    quantity.to_fixed_string()
}

/// Quantity followed by its unit abbreviation when one is known.
pub fn format_quantity_with_unit(quantity: Quantity, unit: Option<&str>) -> String {
    match unit.map(str::trim).filter(|u| !u.is_empty()) {
        Some(unit) => format!("{} {}", format_quantity(quantity), unit),
        None => format_quantity(quantity),
    }
}
