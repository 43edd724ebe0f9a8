//! # Cart Aggregator
//!
//! The in-progress order for one table, before it becomes a sale.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Waiter Action            Cart Method            Cart Change            │
//! │  ─────────────            ───────────            ───────────            │
//! │                                                                         │
//! │  Pick product ──────────► add_item() ──────────► push or merge line    │
//! │                                                                         │
//! │  +/- buttons ───────────► set_quantity() ──────► qty = n (0 removes)   │
//! │                                                                         │
//! │  Re-weigh plate ────────► set_weight() ────────► grams = n (0 removes) │
//! │                                                                         │
//! │  Trash icon ────────────► remove_item() ───────► line dropped          │
//! │                                                                         │
//! │  Footer ────────────────► totals(discount) ────► (read only)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - At most one line per product code; re-adding merges
//! - Lines keep insertion order
//! - A line's subtotal is recomputed whenever its quantity, weight or price changes
//! - A failed operation leaves the cart exactly as it was

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing;
use crate::types::{Product, SaleItem};
use crate::validation::{validate_cart_size, validate_quantity, validate_weight_grams};

// =============================================================================
// Line Item
// =============================================================================

/// One product entry in a cart.
///
/// Prices are copied from the product when the line is created and
/// refreshed whenever the line is re-priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub product_code: String,
    pub product_name: String,
    /// Units ordered; always 1 for weighable lines.
    pub quantity: i64,
    /// Grams on the scale; `None` for unit-priced lines.
    pub weight_grams: Option<i64>,
    pub is_weighable: bool,
    pub unit_price_cents: Option<i64>,
    pub price_per_gram_millicents: Option<i64>,
    pub subtotal_cents: i64,
    pub notes: Option<String>,
}

impl LineItem {
    /// Builds a priced line from a product.
    fn priced(
        product: &Product,
        quantity: i64,
        weight_grams: Option<i64>,
        notes: Option<String>,
    ) -> CoreResult<Self> {
        let subtotal = pricing::line_subtotal(product, quantity, weight_grams)?;
        Ok(LineItem {
            product_code: product.code.clone(),
            product_name: product.name.clone(),
            quantity,
            weight_grams,
            is_weighable: product.is_weighable,
            unit_price_cents: product.unit_price_cents,
            price_per_gram_millicents: product.price_per_gram_millicents,
            subtotal_cents: subtotal.cents(),
            notes,
        })
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// Freezes this line into a sale item.
    pub fn to_sale_item(
        &self,
        id: String,
        sale_id: &str,
        line_no: i64,
        created_at: DateTime<Utc>,
    ) -> SaleItem {
        SaleItem {
            id,
            sale_id: sale_id.to_string(),
            line_no,
            product_code: self.product_code.clone(),
            product_name: self.product_name.clone(),
            quantity: self.quantity,
            weight_grams: self.weight_grams,
            unit_price_cents: self.unit_price_cents,
            price_per_gram_millicents: self.price_per_gram_millicents,
            discount_cents: 0,
            subtotal_cents: self.subtotal_cents,
            notes: self.notes.clone(),
            created_at,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The cart for one table-sale flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<LineItem>,

    /// When the cart was created/last cleared
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds a product, merging into an existing line for the same code.
    ///
    /// ## Behavior
    /// - Unit-priced: `quantity` must be 1..=999; weight is ignored
    /// - Weighable: `weight_grams` is required; quantity is stored as 1
    /// - Existing line: quantities are summed, weights are summed, the price
    ///   snapshot is refreshed and the subtotal recomputed
    /// - Notes: the first non-empty notes on a line are kept
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: i64,
        weight_grams: Option<i64>,
        notes: Option<&str>,
    ) -> CoreResult<()> {
        let notes = notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let (quantity, weight_grams) = if product.is_weighable {
            let grams = weight_grams.ok_or_else(|| crate::error::PricingError::MissingWeight {
                code: product.code.clone(),
            })?;
            validate_weight_grams(grams)?;
            (1, Some(grams))
        } else {
            validate_quantity(quantity)?;
            (quantity, None)
        };

        if let Some(index) = self.position(&product.code) {
            let existing = &self.items[index];
            let merged_quantity = if product.is_weighable {
                1
            } else {
                existing.quantity + quantity
            };
            let merged_weight = match (existing.weight_grams, weight_grams) {
                (Some(a), Some(b)) => Some(a + b),
                (_, w) => w,
            };

            if product.is_weighable {
                validate_weight_grams(merged_weight.unwrap_or_default())?;
            } else {
                validate_quantity(merged_quantity)?;
            }

            let merged_notes = existing.notes.clone().or(notes);
            let line = LineItem::priced(product, merged_quantity, merged_weight, merged_notes)?;
            self.items[index] = line;
            return Ok(());
        }

        validate_cart_size(self.items.len())?;

        let line = LineItem::priced(product, quantity, weight_grams, notes)?;
        self.items.push(line);
        Ok(())
    }

    /// Sets the quantity of a unit-priced line, re-pricing it from `product`.
    ///
    /// ## Behavior
    /// - `quantity <= 0`: same as [`Cart::remove_item`]
    /// - Product not in cart: `ItemNotInCart`
    /// - Weighable product: rejected; use [`Cart::set_weight`]
    pub fn set_quantity(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            self.remove_item(&product.code);
            return Ok(());
        }

        let index = self
            .position(&product.code)
            .ok_or_else(|| CoreError::ItemNotInCart(product.code.clone()))?;

        if product.is_weighable {
            return Err(ValidationError::NotApplicable {
                field: "quantity".to_string(),
                reason: "weighable products".to_string(),
            }
            .into());
        }

        validate_quantity(quantity)?;

        let notes = self.items[index].notes.clone();
        self.items[index] = LineItem::priced(product, quantity, None, notes)?;
        Ok(())
    }

    /// Sets the weight of a weighable line, re-pricing it from `product`.
    ///
    /// `grams <= 0` removes the line.
    pub fn set_weight(&mut self, product: &Product, grams: i64) -> CoreResult<()> {
        if grams <= 0 {
            self.remove_item(&product.code);
            return Ok(());
        }

        let index = self
            .position(&product.code)
            .ok_or_else(|| CoreError::ItemNotInCart(product.code.clone()))?;

        if !product.is_weighable {
            return Err(ValidationError::NotApplicable {
                field: "weight".to_string(),
                reason: "unit-priced products".to_string(),
            }
            .into());
        }

        validate_weight_grams(grams)?;

        let notes = self.items[index].notes.clone();
        self.items[index] = LineItem::priced(product, 1, Some(grams), notes)?;
        Ok(())
    }

    /// Removes a line. Returns whether anything was removed.
    pub fn remove_item(&mut self, product_code: &str) -> bool {
        let initial_len = self.items.len();
        self.items.retain(|i| i.product_code != product_code);
        self.items.len() != initial_len
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.created_at = Utc::now();
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn get(&self, product_code: &str) -> Option<&LineItem> {
        self.items.iter().find(|i| i.product_code == product_code)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Units across unit-priced lines plus one per weighable line.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn subtotal(&self) -> Money {
        pricing::cart_subtotal(&self.items)
    }

    /// Totals with a discount applied (clamped to the subtotal).
    pub fn totals(&self, discount: Money) -> CartTotals {
        let subtotal = self.subtotal();
        CartTotals {
            item_count: self.item_count(),
            total_quantity: self.total_quantity(),
            subtotal_cents: subtotal.cents(),
            discount_cents: pricing::effective_discount(subtotal, discount).cents(),
            total_cents: pricing::cart_total(subtotal, discount).cents(),
        }
    }

    fn position(&self, product_code: &str) -> Option<usize> {
        self.items.iter().position(|i| i.product_code == product_code)
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

/// Cart totals summary for the UI footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_ITEM_QUANTITY;

    fn unit_product(code: &str, price_cents: i64) -> Product {
        Product {
            id: format!("id-{}", code),
            code: code.to_string(),
            name: format!("Product {}", code),
            is_weighable: false,
            unit_price_cents: Some(price_cents),
            price_per_gram_millicents: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn weighable_product(code: &str, cents_per_kg: i64) -> Product {
        Product {
            is_weighable: true,
            unit_price_cents: None,
            price_per_gram_millicents: Some(cents_per_kg),
            ..unit_product(code, 0)
        }
    }

    #[test]
    fn test_add_item() {
        let mut cart = Cart::new();
        cart.add_item(&unit_product("A", 1000), 2, None, None).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.subtotal().cents(), 2000);
    }

    #[test]
    fn test_add_same_product_merges_quantity() {
        let mut cart = Cart::new();
        let product = unit_product("A", 999);

        cart.add_item(&product, 2, None, None).unwrap();
        cart.add_item(&product, 3, None, None).unwrap();

        assert_eq!(cart.item_count(), 1);
        let line = cart.get("A").unwrap();
        assert_eq!(line.quantity, 5);
        assert_eq!(line.subtotal_cents, 5 * 999);
    }

    #[test]
    fn test_merge_refreshes_price() {
        let mut cart = Cart::new();
        cart.add_item(&unit_product("A", 1000), 1, None, None).unwrap();
        cart.add_item(&unit_product("A", 1200), 1, None, None).unwrap();

        let line = cart.get("A").unwrap();
        assert_eq!(line.unit_price_cents, Some(1200));
        assert_eq!(line.subtotal_cents, 2400);
    }

    #[test]
    fn test_merge_sums_weight() {
        let mut cart = Cart::new();
        let buffet = weighable_product("BUF", 5990);

        cart.add_item(&buffet, 1, Some(300), None).unwrap();
        cart.add_item(&buffet, 1, Some(200), None).unwrap();

        let line = cart.get("BUF").unwrap();
        assert_eq!(line.weight_grams, Some(500));
        assert_eq!(line.quantity, 1);
        assert_eq!(line.subtotal_cents, 2995);
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut cart = Cart::new();
        cart.add_item(&unit_product("B", 100), 1, None, None).unwrap();
        cart.add_item(&unit_product("A", 100), 1, None, None).unwrap();
        cart.add_item(&unit_product("B", 100), 1, None, None).unwrap();

        let codes: Vec<&str> = cart.items().iter().map(|i| i.product_code.as_str()).collect();
        assert_eq!(codes, vec!["B", "A"]);
    }

    #[test]
    fn test_first_notes_are_kept() {
        let mut cart = Cart::new();
        let product = unit_product("A", 100);
        cart.add_item(&product, 1, None, Some("sem gelo")).unwrap();
        cart.add_item(&product, 1, None, Some("com limão")).unwrap();
        assert_eq!(cart.get("A").unwrap().notes.as_deref(), Some("sem gelo"));

        let mut cart = Cart::new();
        cart.add_item(&product, 1, None, Some("   ")).unwrap();
        cart.add_item(&product, 1, None, Some("com limão")).unwrap();
        assert_eq!(cart.get("A").unwrap().notes.as_deref(), Some("com limão"));
    }

    #[test]
    fn test_weighable_requires_weight() {
        let mut cart = Cart::new();
        let err = cart
            .add_item(&weighable_product("BUF", 5990), 1, None, None)
            .unwrap_err();
        assert!(matches!(err, CoreError::Pricing(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_missing_price_leaves_cart_untouched() {
        let mut cart = Cart::new();
        cart.add_item(&unit_product("A", 100), 1, None, None).unwrap();

        let mut broken = unit_product("B", 0);
        broken.unit_price_cents = None;
        assert!(cart.add_item(&broken, 1, None, None).is_err());
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_merge_over_limit_rejected() {
        let mut cart = Cart::new();
        let product = unit_product("A", 100);
        cart.add_item(&product, MAX_ITEM_QUANTITY, None, None).unwrap();
        assert!(cart.add_item(&product, 1, None, None).is_err());
        assert_eq!(cart.get("A").unwrap().quantity, MAX_ITEM_QUANTITY);
    }

    #[test]
    fn test_set_quantity_recomputes_from_current_price() {
        let mut cart = Cart::new();
        cart.add_item(&unit_product("A", 1000), 2, None, None).unwrap();

        cart.set_quantity(&unit_product("A", 1100), 4).unwrap();

        let line = cart.get("A").unwrap();
        assert_eq!(line.quantity, 4);
        assert_eq!(line.subtotal_cents, 4400);
    }

    #[test]
    fn test_set_quantity_zero_equals_remove() {
        let product = unit_product("A", 1000);
        let other = unit_product("B", 500);

        let mut via_set = Cart::new();
        via_set.add_item(&product, 2, None, None).unwrap();
        via_set.add_item(&other, 1, None, None).unwrap();
        let mut via_remove = via_set.clone();

        via_set.set_quantity(&product, 0).unwrap();
        via_remove.remove_item("A");

        assert_eq!(via_set.items(), via_remove.items());
    }

    #[test]
    fn test_set_quantity_negative_on_missing_is_noop() {
        let mut cart = Cart::new();
        assert!(cart.set_quantity(&unit_product("A", 100), -1).is_ok());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_missing_item() {
        let mut cart = Cart::new();
        let err = cart.set_quantity(&unit_product("A", 100), 2).unwrap_err();
        assert!(matches!(err, CoreError::ItemNotInCart(code) if code == "A"));
    }

    #[test]
    fn test_set_quantity_on_weighable_rejected() {
        let mut cart = Cart::new();
        let buffet = weighable_product("BUF", 5990);
        cart.add_item(&buffet, 1, Some(400), None).unwrap();

        assert!(cart.set_quantity(&buffet, 3).is_err());
        assert!(cart.set_quantity(&buffet, 0).is_ok());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_weight() {
        let mut cart = Cart::new();
        let buffet = weighable_product("BUF", 5000);
        cart.add_item(&buffet, 1, Some(400), None).unwrap();

        cart.set_weight(&buffet, 1000).unwrap();
        assert_eq!(cart.get("BUF").unwrap().subtotal_cents, 5000);

        assert!(cart.set_weight(&unit_product("A", 1), 10).is_err());
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(&unit_product("A", 100), 1, None, None).unwrap();
        assert!(!cart.remove_item("Z"));
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_totals_with_discount() {
        let mut cart = Cart::new();
        cart.add_item(&unit_product("A", 1000), 2, None, None).unwrap();

        let totals = cart.totals(Money::from_cents(500));
        assert_eq!(totals.subtotal_cents, 2000);
        assert_eq!(totals.discount_cents, 500);
        assert_eq!(totals.total_cents, 1500);

        let totals = cart.totals(Money::from_cents(2500));
        assert_eq!(totals.discount_cents, 2000);
        assert_eq!(totals.total_cents, 0);
    }

    #[test]
    fn test_add_remove_cycles_do_not_drift() {
        let mut cart = Cart::new();
        let product = unit_product("A", 10);
        let keep = unit_product("K", 333);
        cart.add_item(&keep, 3, None, None).unwrap();

        for _ in 0..500 {
            cart.add_item(&product, 1, None, None).unwrap();
            cart.remove_item("A");
        }

        assert_eq!(cart.subtotal().cents(), 999);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.add_item(&unit_product("A", 100), 2, None, None).unwrap();
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Money::zero());
    }

    #[test]
    fn test_to_sale_item_snapshot() {
        let mut cart = Cart::new();
        cart.add_item(&unit_product("A", 1000), 2, None, Some("bem passado"))
            .unwrap();

        let now = Utc::now();
        let item = cart.items()[0].to_sale_item("item-1".to_string(), "sale-1", 1, now);
        assert_eq!(item.sale_id, "sale-1");
        assert_eq!(item.line_no, 1);
        assert_eq!(item.quantity, 2);
        assert_eq!(item.subtotal_cents, 2000);
        assert_eq!(item.discount_cents, 0);
        assert_eq!(item.notes.as_deref(), Some("bem passado"));
    }
}
