//! Order database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::catalog::{product_from_row, PRODUCT_SELECT};
use super::{Database, DbError, DbResult};
use crate::models::{
    generate_order_number, Order, OrderItem, OrderStatus, PaymentStatus, ShippingDetails,
    LOW_STOCK_THRESHOLD,
};
use crate::state::CartState;

const ORDER_SELECT: &str = r#"
    SELECT id, order_number, user_id, status, payment_status, total_amount,
           shipping_address, shipping_city, shipping_state, shipping_country,
           shipping_postal_code, phone, payment_method, is_paid, paid_at,
           tracking_number, created_at, updated_at
    FROM orders
"#;

/// Products listed in [`SalesAnalytics::top_products`].
pub const TOP_PRODUCTS_LIMIT: usize = 5;

/// Days covered by [`SalesAnalytics::daily_sales`].
pub const SALES_WINDOW_DAYS: i64 = 7;

/// Paid sales on one calendar day (UTC).
#[derive(Debug, Clone, PartialEq)]
pub struct DailySales {
    /// `YYYY-MM-DD`
    pub day: String,
    pub total: f64,
    pub count: u32,
}

/// A product ranked by units sold.
#[derive(Debug, Clone, PartialEq)]
pub struct TopProduct {
    pub product_id: i64,
    pub product_name: String,
    pub total_quantity: i64,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesAnalytics {
    pub daily_sales: Vec<DailySales>,
    pub top_products: Vec<TopProduct>,
}

/// Back-office dashboard figures.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_products: u32,
    pub total_orders: u32,
    /// Accounts that are not superusers
    pub total_users: u32,
    /// Sum of totals of paid orders
    pub total_revenue: f64,
    pub low_stock_products: u32,
    /// Orders still pending or processing
    pub pending_orders: u32,
}

impl Database {
    /// Turn a cart into an order.
    ///
    /// Runs in one transaction: every line is re-priced from the store,
    /// stock is checked and decremented, and nothing is written if any line
    /// fails.
    pub fn place_order(
        &mut self,
        user_id: i64,
        cart: &CartState,
        shipping: &ShippingDetails,
    ) -> DbResult<Order> {
        if cart.is_empty() {
            return Err(DbError::EmptyCart);
        }

        let tx = self.conn.transaction()?;

        let mut items = Vec::with_capacity(cart.items().len());
        let product_sql = format!("{} WHERE p.id = ?", PRODUCT_SELECT);
        for line in cart.items() {
            let stored = tx
                .query_row(&product_sql, [line.product.id], product_from_row)
                .optional()?
                .ok_or_else(|| DbError::NotFound(format!("product {}", line.product.id)))?;

            if !stored.can_fulfil(line.quantity) {
                return Err(DbError::InsufficientStock {
                    requested: line.quantity,
                    available: if stored.is_available { stored.stock } else { 0 },
                    product: stored.name,
                });
            }

            items.push(OrderItem {
                product_id: stored.id,
                product_name: stored.name,
                quantity: line.quantity,
                price: stored.price,
            });
        }

        let total_amount: f64 = items.iter().map(OrderItem::subtotal).sum();
        let order_number = generate_order_number();
        let now = chrono::Utc::now().to_rfc3339();

        tx.execute(
            r#"
            INSERT INTO orders (
                order_number, user_id, status, payment_status, total_amount,
                shipping_address, shipping_city, shipping_state, shipping_country,
                shipping_postal_code, phone, payment_method, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            "#,
            params![
                order_number,
                user_id,
                OrderStatus::Pending.as_str(),
                PaymentStatus::Pending.as_str(),
                total_amount,
                shipping.address,
                shipping.city,
                shipping.state,
                shipping.country,
                shipping.postal_code,
                shipping.phone,
                shipping.payment_method,
                now,
            ],
        )?;
        let order_id = tx.last_insert_rowid();

        for item in &items {
            tx.execute(
                r#"
                INSERT INTO order_items (order_id, product_id, product_name, quantity, price)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    order_id,
                    item.product_id,
                    item.product_name,
                    item.quantity,
                    item.price
                ],
            )?;
            tx.execute(
                "UPDATE products SET stock = stock - ?2, updated_at = datetime('now') WHERE id = ?1",
                params![item.product_id, item.quantity],
            )?;
        }

        tx.commit()?;
        tracing::info!(
            "placed order {} for user {} ({} lines, total {:.2})",
            order_number,
            user_id,
            items.len(),
            total_amount
        );

        self.get_order(order_id)?
            .ok_or_else(|| DbError::NotFound(format!("order {}", order_id)))
    }

    /// Get an order with its lines.
    pub fn get_order(&self, id: i64) -> DbResult<Option<Order>> {
        let sql = format!("{} WHERE id = ?", ORDER_SELECT);
        let order = self.conn.query_row(&sql, [id], order_from_row).optional()?;
        order.map(|o| self.with_items(o)).transpose()
    }

    pub fn get_order_by_number(&self, order_number: &str) -> DbResult<Option<Order>> {
        let sql = format!("{} WHERE order_number = ?", ORDER_SELECT);
        let order = self
            .conn
            .query_row(&sql, [order_number], order_from_row)
            .optional()?;
        order.map(|o| self.with_items(o)).transpose()
    }

    /// A user's order history, newest first.
    pub fn list_orders_for_user(&self, user_id: i64) -> DbResult<Vec<Order>> {
        let sql = format!("{} WHERE user_id = ? ORDER BY created_at DESC, id DESC", ORDER_SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let orders = stmt
            .query_map([user_id], order_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        orders.into_iter().map(|o| self.with_items(o)).collect()
    }

    /// All orders (back office), newest first, optionally by status.
    pub fn list_orders(&self, status: Option<OrderStatus>) -> DbResult<Vec<Order>> {
        let orders = match status {
            Some(status) => {
                let sql = format!("{} WHERE status = ? ORDER BY created_at DESC, id DESC", ORDER_SELECT);
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map([status.as_str()], order_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!("{} ORDER BY created_at DESC, id DESC", ORDER_SELECT);
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map([], order_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        orders.into_iter().map(|o| self.with_items(o)).collect()
    }

    /// Record payment for an order and move it to processing.
    pub fn mark_order_paid(&self, id: i64) -> DbResult<Order> {
        let mut order = self
            .get_order(id)?
            .ok_or_else(|| DbError::NotFound(format!("order {}", id)))?;

        order.mark_paid();
        self.conn.execute(
            r#"
            UPDATE orders SET
                status = ?2, payment_status = ?3, is_paid = 1, paid_at = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
            params![
                id,
                order.status.as_str(),
                order.payment_status.as_str(),
                order.paid_at,
                order.updated_at,
            ],
        )?;
        Ok(order)
    }

    /// Move an order to a new status, optionally recording a tracking number.
    pub fn update_order_status(
        &self,
        id: i64,
        status: OrderStatus,
        tracking_number: Option<&str>,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE orders SET
                status = ?2,
                tracking_number = COALESCE(?3, tracking_number),
                updated_at = ?4
            WHERE id = ?1
            "#,
            params![id, status.as_str(), tracking_number, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(rows_affected > 0)
    }

    /// Set the payment status of an order.
    ///
    /// A `paid` status also sets the paid flag.
    pub fn update_payment_status(&self, id: i64, payment_status: PaymentStatus) -> DbResult<Order> {
        let mut order = self
            .get_order(id)?
            .ok_or_else(|| DbError::NotFound(format!("order {}", id)))?;

        order.payment_status = payment_status;
        order.sync_payment();
        order.updated_at = chrono::Utc::now().to_rfc3339();

        self.conn.execute(
            r#"
            UPDATE orders SET payment_status = ?2, is_paid = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
            params![
                id,
                order.payment_status.as_str(),
                order.is_paid,
                order.updated_at,
            ],
        )?;
        tracing::info!(
            "order {} payment status set to {}",
            order.order_number,
            order.payment_status.as_str()
        );
        Ok(order)
    }

    /// The most recently placed orders, newest first.
    pub fn recent_orders(&self, limit: usize) -> DbResult<Vec<Order>> {
        let sql = format!("{} ORDER BY created_at DESC, id DESC LIMIT ?", ORDER_SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let orders = stmt
            .query_map([limit as i64], order_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        orders.into_iter().map(|o| self.with_items(o)).collect()
    }

    /// Paid sales per day over the last week, and best sellers by units.
    pub fn sales_analytics(&self) -> DbResult<SalesAnalytics> {
        let since = (chrono::Utc::now() - chrono::Duration::days(SALES_WINDOW_DAYS)).to_rfc3339();

        let mut stmt = self.conn.prepare(
            r#"
            SELECT substr(created_at, 1, 10) AS day, SUM(total_amount), COUNT(*)
            FROM orders
            WHERE payment_status = 'paid' AND created_at >= ?
            GROUP BY day
            ORDER BY day
            "#,
        )?;
        let daily_sales = stmt
            .query_map([since], |row| {
                Ok(DailySales {
                    day: row.get(0)?,
                    total: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT product_id, MAX(product_name), SUM(quantity), SUM(quantity * price)
            FROM order_items
            GROUP BY product_id
            ORDER BY SUM(quantity) DESC, product_id
            LIMIT ?
            "#,
        )?;
        let top_products = stmt
            .query_map([TOP_PRODUCTS_LIMIT as i64], |row| {
                Ok(TopProduct {
                    product_id: row.get(0)?,
                    product_name: row.get(1)?,
                    total_quantity: row.get(2)?,
                    total_revenue: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SalesAnalytics {
            daily_sales,
            top_products,
        })
    }

    /// Figures for the back-office dashboard.
    pub fn dashboard_stats(&self) -> DbResult<DashboardStats> {
        Ok(self.conn.query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM products),
                (SELECT COUNT(*) FROM orders),
                (SELECT COUNT(*) FROM users WHERE is_superuser = 0),
                (SELECT COALESCE(SUM(total_amount), 0.0) FROM orders WHERE payment_status = 'paid'),
                (SELECT COUNT(*) FROM products WHERE stock < ?1),
                (SELECT COUNT(*) FROM orders WHERE status IN ('pending', 'processing'))
            "#,
            [LOW_STOCK_THRESHOLD],
            |row| {
                Ok(DashboardStats {
                    total_products: row.get(0)?,
                    total_orders: row.get(1)?,
                    total_users: row.get(2)?,
                    total_revenue: row.get(3)?,
                    low_stock_products: row.get(4)?,
                    pending_orders: row.get(5)?,
                })
            },
        )?)
    }

    fn with_items(&self, mut order: Order) -> DbResult<Order> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT product_id, product_name, quantity, price
            FROM order_items
            WHERE order_id = ?
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map([order.id], |row| {
            Ok(OrderItem {
                product_id: row.get(0)?,
                product_name: row.get(1)?,
                quantity: row.get(2)?,
                price: row.get(3)?,
            })
        })?;
        order.items = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(order)
    }
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    let status: String = row.get(3)?;
    let payment_status: String = row.get(4)?;

    Ok(Order {
        id: row.get(0)?,
        order_number: row.get(1)?,
        user_id: row.get(2)?,
        status: OrderStatus::parse(&status).unwrap_or(OrderStatus::Pending),
        payment_status: PaymentStatus::parse(&payment_status).unwrap_or(PaymentStatus::Pending),
        total_amount: row.get(5)?,
        shipping: ShippingDetails {
            address: row.get(6)?,
            city: row.get(7)?,
            state: row.get(8)?,
            country: row.get(9)?,
            postal_code: row.get(10)?,
            phone: row.get(11)?,
            payment_method: row.get(12)?,
        },
        is_paid: row.get(13)?,
        paid_at: row.get(14)?,
        tracking_number: row.get(15)?,
        items: Vec::new(),
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}
