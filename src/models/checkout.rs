use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};
use crate::payments::to_minor_units;

/// Largest amount, in major units, a checkout may charge.
pub const MAX_AMOUNT: f64 = 10_000_000.0;

/// Body of `POST /api/checkout/{provider}`. Amounts are in major units.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub amount: f64,
    /// Caller-supplied order id, the correlation key for the whole flow.
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(default)]
    pub product_id: Option<String>,
    pub name: String,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// Unit price in major units
    pub price: f64,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMetadata {
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub shipping: Option<f64>,
    #[serde(default)]
    pub gift_wrap_fee: Option<f64>,
    #[serde(default)]
    pub discount: Option<f64>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// A named line on a hosted checkout page, priced in minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: u32,
}

impl CartItem {
    /// Display name including the chosen variant, e.g. "Mug (Large, Red)".
    pub fn display_name(&self) -> String {
        let variant: Vec<&str> = [self.size.as_deref(), self.color.as_deref()]
            .into_iter()
            .flatten()
            .filter(|v| !v.is_empty())
            .collect();
        if variant.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, variant.join(", "))
        }
    }
}

impl CreateSessionRequest {
    pub fn validate(&self) -> Result<()> {
        if self.order_id.trim().is_empty() {
            return Err(AppError::Validation(msg::MISSING_ORDER_ID.into()));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(AppError::Validation(msg::INVALID_AMOUNT.into()));
        }
        if self.amount > MAX_AMOUNT {
            return Err(AppError::Validation(msg::AMOUNT_TOO_LARGE.into()));
        }
        Ok(())
    }

    pub fn amount_minor(&self) -> i64 {
        to_minor_units(self.amount)
    }

    /// Cart lines are itemized only when the cart, shipping and gift wrap
    /// add up to the charged amount and no discount applies. Anything else
    /// is charged as a single line so the provider total always matches.
    pub fn line_items(&self) -> Vec<LineItem> {
        let single = || {
            vec![LineItem {
                name: format!("Order {}", self.order_id),
                unit_amount: self.amount_minor(),
                quantity: 1,
            }]
        };

        let discount = self.metadata.discount.unwrap_or(0.0);
        if self.items.is_empty() || discount > 0.0 {
            return single();
        }

        let shipping = self.metadata.shipping.unwrap_or(0.0);
        let gift_wrap = self.metadata.gift_wrap_fee.unwrap_or(0.0);
        let items_total: f64 = self
            .items
            .iter()
            .map(|i| i.price * f64::from(i.quantity))
            .sum();

        if to_minor_units(items_total + shipping + gift_wrap) != self.amount_minor() {
            return single();
        }

        let mut lines: Vec<LineItem> = self
            .items
            .iter()
            .map(|item| LineItem {
                name: item.display_name(),
                unit_amount: to_minor_units(item.price),
                quantity: item.quantity,
            })
            .collect();

        if shipping > 0.0 {
            lines.push(LineItem {
                name: "Shipping".into(),
                unit_amount: to_minor_units(shipping),
                quantity: 1,
            });
        }
        if gift_wrap > 0.0 {
            lines.push(LineItem {
                name: "Gift wrap".into(),
                unit_amount: to_minor_units(gift_wrap),
                quantity: 1,
            });
        }
        lines
    }
}
