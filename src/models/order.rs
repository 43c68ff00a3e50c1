use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Fulfilment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Cancelled,
    Fulfilled,
}

/// Payment state of an order. `Paid` is terminal; `Failed` can still become
/// `Paid` after the customer retries with a new checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Human-readable number shown to customers; PhonePe correlates on this.
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// Provider transaction reference, set once when the order is paid.
    pub payment_id: Option<String>,
    /// Provider that confirmed the payment ("stripe", "phonepe", "razorpay")
    pub payment_provider: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub customer_email: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

/// Input for inserting an order. Orders are placed by the storefront; this
/// service only inserts them for seeding and tests.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrder {
    #[serde(default)]
    pub id: Option<String>,
    pub order_number: String,
    pub amount_cents: i64,
    pub currency: String,
    #[serde(default)]
    pub customer_email: Option<String>,
}

/// Read model returned to the success/cancel pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPaymentView {
    pub order_id: String,
    pub order_number: String,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub payment_id: Option<String>,
}

impl From<Order> for OrderPaymentView {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id,
            order_number: order.order_number,
            payment_status: order.payment_status,
            status: order.status,
            payment_id: order.payment_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_strings() {
        assert_eq!(PaymentStatus::Paid.as_ref(), "paid");
        assert_eq!("failed".parse::<PaymentStatus>().unwrap(), PaymentStatus::Failed);
        assert_eq!(OrderStatus::Confirmed.as_ref(), "confirmed");
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_payment_view_serializes_camel_case() {
        let view = OrderPaymentView {
            order_id: "abc123".into(),
            order_number: "ORD-1001".into(),
            payment_status: PaymentStatus::Paid,
            status: OrderStatus::Confirmed,
            payment_id: Some("pay_1".into()),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["orderId"], "abc123");
        assert_eq!(json["paymentStatus"], "paid");
        assert_eq!(json["status"], "confirmed");
    }
}
