//! Order models.

use serde::{Deserialize, Serialize};

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// Checkout form data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingDetails {
    pub address: String,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub postal_code: String,
    pub phone: String,
    pub payment_method: String,
}

/// One product line of a placed order, priced at checkout time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: u32,
    pub price: f64,
}

impl OrderItem {
    pub fn subtotal(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// A placed order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i64,
    /// Human-facing number: ORD-YYYYMMDD-XXXXXXXX
    pub order_number: String,
    pub user_id: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: f64,
    pub shipping: ShippingDetails,
    pub is_paid: bool,
    pub paid_at: Option<String>,
    pub tracking_number: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: String,
    pub updated_at: String,
}

impl Order {
    /// Number of units across all lines.
    pub fn items_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Record a successful payment.
    pub fn mark_paid(&mut self) {
        let now = chrono::Utc::now().to_rfc3339();
        self.is_paid = true;
        self.paid_at = Some(now.clone());
        self.payment_status = PaymentStatus::Paid;
        self.status = OrderStatus::Processing;
        self.updated_at = now;
    }

    /// Keep `is_paid` and `payment_status` consistent.
    ///
    /// A paid flag upgrades a pending payment; a paid payment sets the flag.
    pub fn sync_payment(&mut self) {
        if self.is_paid && self.payment_status == PaymentStatus::Pending {
            self.payment_status = PaymentStatus::Paid;
        } else if self.payment_status == PaymentStatus::Paid && !self.is_paid {
            self.is_paid = true;
        }
    }
}

/// Generate a new order number: `ORD-YYYYMMDD-` plus 8 uppercase hex chars.
pub fn generate_order_number() -> String {
    let date = chrono::Utc::now().format("%Y%m%d");
    let unique = uuid::Uuid::new_v4().simple().to_string();
    format!("ORD-{}-{}", date, unique[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        Order {
            id: 1,
            order_number: generate_order_number(),
            user_id: 7,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total_amount: 12.0,
            shipping: ShippingDetails {
                address: "1 Main St".into(),
                city: "Springfield".into(),
                state: None,
                country: "US".into(),
                postal_code: "12345".into(),
                phone: "555-0100".into(),
                payment_method: "card".into(),
            },
            is_paid: false,
            paid_at: None,
            tracking_number: None,
            items: vec![
                OrderItem {
                    product_id: 1,
                    product_name: "Paracetamol".into(),
                    quantity: 2,
                    price: 3.0,
                },
                OrderItem {
                    product_id: 2,
                    product_name: "Ibuprofen".into(),
                    quantity: 1,
                    price: 6.0,
                },
            ],
            created_at: chrono::Utc::now().to_rfc3339(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_order_number_format() {
        let number = generate_order_number();
        let parts: Vec<&str> = number.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("lost"), None);
        assert_eq!(PaymentStatus::parse("refunded"), Some(PaymentStatus::Refunded));
    }

    #[test]
    fn test_mark_paid() {
        let mut order = sample_order();
        order.mark_paid();

        assert!(order.is_paid);
        assert!(order.paid_at.is_some());
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.status, OrderStatus::Processing);
    }

    #[test]
    fn test_sync_payment() {
        let mut order = sample_order();
        order.is_paid = true;
        order.sync_payment();
        assert_eq!(order.payment_status, PaymentStatus::Paid);

        let mut order = sample_order();
        order.payment_status = PaymentStatus::Paid;
        order.sync_payment();
        assert!(order.is_paid);
    }

    #[test]
    fn test_items_and_subtotals() {
        let order = sample_order();
        assert_eq!(order.items_count(), 3);
        assert_eq!(order.items[0].subtotal(), 6.0);
    }
}
