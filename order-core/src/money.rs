//! Money calculation utilities using rust_decimal for precision
//!
//! Monetary values are `f64` at the model boundary and `Decimal` in
//! every computation, rounded to 2 decimal places half-away-from-zero
//! before storage.

use rust_decimal::prelude::*;
use shared::error::{CoreError, CoreResult};
use shared::models::order::{OrderItem, OrderItemInput};

/// Rounding for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed unit price per item
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per item
const MAX_QUANTITY: i32 = 9999;
/// Maximum allowed tip
const MAX_TIP: f64 = 1_000_000.0;

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field_name: &str) -> CoreResult<()> {
    if !value.is_finite() {
        return Err(CoreError::validation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Validate an item payload before pricing
pub fn validate_item_input(item: &OrderItemInput) -> CoreResult<()> {
    require_finite(item.price, "price")?;
    if item.price < 0.0 {
        return Err(CoreError::validation(format!(
            "price must be non-negative, got {}",
            item.price
        )));
    }
    if item.price > MAX_PRICE {
        return Err(CoreError::validation(format!(
            "price exceeds maximum allowed ({}), got {}",
            MAX_PRICE, item.price
        )));
    }

    if item.quantity < 1 {
        return Err(CoreError::validation(format!(
            "quantity must be at least 1, got {}",
            item.quantity
        )));
    }
    if item.quantity > MAX_QUANTITY {
        return Err(CoreError::validation(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, item.quantity
        )));
    }

    for c in &item.customizations {
        require_finite(c.price_modifier, "customization price_modifier")?;
        if c.price_modifier.abs() > MAX_PRICE {
            return Err(CoreError::validation(format!(
                "customization price_modifier exceeds maximum allowed, got {}",
                c.price_modifier
            )));
        }
    }

    for a in &item.addons {
        require_finite(a.price, "addon price")?;
        if a.price < 0.0 || a.price > MAX_PRICE {
            return Err(CoreError::validation(format!(
                "addon price out of range, got {}",
                a.price
            )));
        }
    }

    Ok(())
}

/// Validate a tip amount
pub fn validate_tip(tip: f64) -> CoreResult<()> {
    require_finite(tip, "tip")?;
    if tip < 0.0 {
        return Err(CoreError::validation(format!(
            "tip must be non-negative, got {}",
            tip
        )));
    }
    if tip > MAX_TIP {
        return Err(CoreError::validation(format!(
            "tip exceeds maximum allowed ({}), got {}",
            MAX_TIP, tip
        )));
    }
    Ok(())
}

/// Per-unit price: base price + customization modifiers + add-on prices
fn unit_price(item: &OrderItemInput) -> Decimal {
    let base = to_decimal(item.price);
    let customizations: Decimal = item
        .customizations
        .iter()
        .map(|c| to_decimal(c.price_modifier))
        .sum();
    let addons: Decimal = item.addons.iter().map(|a| to_decimal(a.price)).sum();
    (base + customizations + addons).max(Decimal::ZERO)
}

/// Line subtotal: unit price * quantity, rounded to 2 decimals
pub fn item_subtotal(item: &OrderItemInput) -> f64 {
    let total = unit_price(item) * Decimal::from(item.quantity);
    to_f64(total)
}

/// Price an item payload into a line-item snapshot
pub fn price_item(input: OrderItemInput) -> OrderItem {
    let subtotal = item_subtotal(&input);
    OrderItem {
        menu_item_id: input.menu_item_id,
        name: input.name,
        price: input.price,
        quantity: input.quantity,
        customizations: input.customizations,
        addons: input.addons,
        subtotal,
        note: input.note,
    }
}

/// Computed order-level totals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub tip: f64,
    pub total: f64,
}

/// Compute order totals from priced line items
///
/// `tax_rate` is a fraction (0.08 = 8%). Tax applies to the subtotal
/// only, never to the tip. total = round(subtotal + tax + tip).
pub fn order_totals(items: &[OrderItem], tax_rate: f64, tip: f64) -> OrderTotals {
    let subtotal: Decimal = items.iter().map(|i| to_decimal(i.subtotal)).sum();
    let tax = (subtotal * to_decimal(tax_rate))
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    let tip_dec = to_decimal(tip);
    let total = subtotal + tax + tip_dec;

    OrderTotals {
        subtotal: to_f64(subtotal),
        tax: to_f64(tax),
        tip: to_f64(tip_dec),
        total: to_f64(total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::order::{ItemAddon, ItemCustomization};

    fn item(price: f64, quantity: i32) -> OrderItemInput {
        OrderItemInput {
            menu_item_id: "m1".into(),
            name: "Item".into(),
            price,
            quantity,
            customizations: vec![],
            addons: vec![],
            note: None,
        }
    }

    #[test]
    fn test_to_decimal_precision() {
        // Classic floating point problem: 0.1 + 0.2 != 0.3
        let sum_f64 = 0.1_f64 + 0.2_f64;
        assert_ne!(sum_f64, 0.3);

        let sum_dec = to_decimal(0.1) + to_decimal(0.2);
        assert_eq!(to_f64(sum_dec), 0.3);
    }

    #[test]
    fn test_accumulation_precision() {
        let mut total = Decimal::ZERO;
        for _ in 0..1000 {
            total += to_decimal(0.01);
        }
        assert_eq!(to_f64(total), 10.0);
    }

    #[test]
    fn test_item_subtotal_plain() {
        assert_eq!(item_subtotal(&item(10.99, 3)), 32.97);
    }

    #[test]
    fn test_item_subtotal_with_customizations_and_addons() {
        let mut it = item(12.0, 2);
        it.customizations.push(ItemCustomization {
            name: "Large".into(),
            price_modifier: 3.0,
        });
        it.customizations.push(ItemCustomization {
            name: "No cheese".into(),
            price_modifier: -0.5,
        });
        it.addons.push(ItemAddon {
            name: "Extra sauce".into(),
            price: 1.25,
        });
        // (12.0 + 3.0 - 0.5 + 1.25) * 2 = 31.50
        assert_eq!(item_subtotal(&it), 31.5);
    }

    #[test]
    fn test_unit_price_clamped_non_negative() {
        let mut it = item(2.0, 1);
        it.customizations.push(ItemCustomization {
            name: "Comp".into(),
            price_modifier: -5.0,
        });
        assert_eq!(item_subtotal(&it), 0.0);
    }

    #[test]
    fn test_totals_with_eight_percent_tax() {
        // Two items at 10.00 with an 8% tax rate
        let items = vec![price_item(item(10.0, 2))];
        let totals = order_totals(&items, 0.08, 0.0);
        assert_eq!(totals.subtotal, 20.0);
        assert_eq!(totals.tax, 1.6);
        assert_eq!(totals.total, 21.6);
    }

    #[test]
    fn test_totals_include_tip_untaxed() {
        let items = vec![price_item(item(10.0, 2))];
        let totals = order_totals(&items, 0.08, 2.5);
        assert_eq!(totals.tax, 1.6);
        assert_eq!(totals.tip, 2.5);
        assert_eq!(totals.total, 24.1);
    }

    #[test]
    fn test_tax_rounding_half_up() {
        // 13.37 * 0.075 = 1.00275 -> 1.00; 13.40 * 0.075 = 1.005 -> 1.01
        let totals = order_totals(&[price_item(item(13.37, 1))], 0.075, 0.0);
        assert_eq!(totals.tax, 1.0);
        let totals = order_totals(&[price_item(item(13.40, 1))], 0.075, 0.0);
        assert_eq!(totals.tax, 1.01);
    }

    #[test]
    fn test_validate_rejects_nan_price() {
        assert!(validate_item_input(&item(f64::NAN, 1)).is_err());
        assert!(validate_item_input(&item(f64::INFINITY, 1)).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_quantity() {
        assert!(validate_item_input(&item(10.0, 0)).is_err());
        assert!(validate_item_input(&item(10.0, -2)).is_err());
        assert!(validate_item_input(&item(10.0, MAX_QUANTITY + 1)).is_err());
    }

    #[test]
    fn test_validate_rejects_negative_price() {
        assert!(validate_item_input(&item(-1.0, 1)).is_err());
    }

    #[test]
    fn test_validate_tip() {
        assert!(validate_tip(0.0).is_ok());
        assert!(validate_tip(5.0).is_ok());
        assert!(validate_tip(-0.01).is_err());
        assert!(validate_tip(f64::NAN).is_err());
    }

    #[test]
    fn test_many_small_items() {
        // 100 items at 0.01 each
        let items: Vec<OrderItem> = (0..100).map(|_| price_item(item(0.01, 1))).collect();
        let totals = order_totals(&items, 0.0, 0.0);
        assert_eq!(totals.subtotal, 1.0);
    }
}
