//! Medicom Core Library
//!
//! Catalog, orders and prescription matching for the medicom pharmacy
//! storefront.
//!
//! # Architecture
//!
//! ```text
//! Prescription image → OCR → Medicine names ──────┐
//!                                                 ▼
//!                                   ┌───────────────────────────┐
//!                                   │      Medicine Matcher     │
//!                                   │  search → score → gate    │
//!                                   │  → dedup by product id    │
//!                                   └─────────────┬─────────────┘
//!                                                 │
//!                                  found products / not-found names
//!                                                 │
//!                                                 ▼
//!                                     Cart → Checkout → Order
//! ```
//!
//! # Modules
//!
//! - [`db`]: SQLite catalog and order store with FTS5 product search
//! - [`models`]: Domain types (Product, Category, Order, MatchResult, etc.)
//! - [`matcher`]: Prescription medicine matcher
//! - [`pipeline`]: Upload → OCR → matching pipeline
//! - [`state`]: Client-side cart, auth and product listing state

pub mod db;
pub mod matcher;
pub mod models;
pub mod pipeline;
pub mod state;

// Re-export commonly used types
pub use db::{
    DailySales, Database, DashboardStats, ProductFilter, ProductOrdering, SalesAnalytics,
    TopProduct, UserFilter, UserSummary,
};
pub use matcher::{MatcherConfig, MedicineMatcher, ProductSearch, SearchError};
pub use models::{
    Category, MatchOutcome, MatchResult, MedicineMatch, Order, OrderItem, OrderStatus,
    PaymentStatus, Product, Review, ShippingDetails, User,
};
pub use pipeline::{PrescriptionOutcome, PrescriptionPipeline};
pub use state::{AuthState, CartError, CartState, ProductState};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MedicomError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Out of stock: {0}")]
    OutOfStock(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl From<db::DbError> for MedicomError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => MedicomError::NotFound(what),
            db::DbError::Constraint(msg) => MedicomError::InvalidInput(msg),
            db::DbError::EmptyCart => MedicomError::InvalidInput(e.to_string()),
            db::DbError::InsufficientStock { .. } => MedicomError::OutOfStock(e.to_string()),
            db::DbError::PermissionDenied(msg) => MedicomError::PermissionDenied(msg),
            other => MedicomError::DatabaseError(other.to_string()),
        }
    }
}

impl From<CartError> for MedicomError {
    fn from(e: CartError) -> Self {
        MedicomError::InvalidInput(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for MedicomError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        MedicomError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<MedicomCore>, MedicomError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(MedicomCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<MedicomCore>, MedicomError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(MedicomCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct MedicomCore {
    db: Arc<Mutex<Database>>,
}

#[uniffi::export]
impl MedicomCore {
    // =========================================================================
    // Catalog Operations
    // =========================================================================

    /// Add or update a category. Returns its slug.
    pub fn upsert_category(&self, category: FfiCategory) -> Result<String, MedicomError> {
        let db = self.db.lock()?;
        Ok(db.upsert_category(&category.into())?)
    }

    /// Add or update a product. Returns its slug.
    pub fn upsert_product(&self, product: FfiProduct) -> Result<String, MedicomError> {
        let db = self.db.lock()?;
        Ok(db.upsert_product(&product.into())?)
    }

    /// Get a product by id.
    pub fn get_product(&self, id: i64) -> Result<Option<FfiProduct>, MedicomError> {
        let db = self.db.lock()?;
        Ok(db.get_product(id)?.map(|p| p.into()))
    }

    /// Search available products by name/description.
    pub fn search_products(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiProduct>, MedicomError> {
        let db = self.db.lock()?;
        let products = db.search_products(&query, limit as usize)?;
        Ok(products.into_iter().map(|p| p.into()).collect())
    }

    /// Delete a category that has no products.
    pub fn delete_category(&self, id: i64) -> Result<bool, MedicomError> {
        let db = self.db.lock()?;
        Ok(db.delete_category(id)?)
    }

    /// Set a product's stock level.
    pub fn update_stock(&self, product_id: i64, stock: i64) -> Result<FfiProduct, MedicomError> {
        let db = self.db.lock()?;
        Ok(db.update_stock(product_id, stock)?.into())
    }

    /// Review a product (1 to 5 stars, once per user).
    pub fn add_review(
        &self,
        product_id: i64,
        user_id: i64,
        rating: u8,
        comment: String,
    ) -> Result<FfiReview, MedicomError> {
        let db = self.db.lock()?;
        Ok(db.add_review(product_id, user_id, rating, &comment)?.into())
    }

    /// Reviews of a product, newest first.
    pub fn list_reviews(&self, product_id: i64) -> Result<Vec<FfiReview>, MedicomError> {
        let db = self.db.lock()?;
        let reviews = db.list_reviews(product_id)?;
        Ok(reviews.into_iter().map(|r| r.into()).collect())
    }

    /// Mean star rating of a product, if it has reviews.
    pub fn average_rating(&self, product_id: i64) -> Result<Option<f64>, MedicomError> {
        let db = self.db.lock()?;
        Ok(db.average_rating(product_id)?)
    }

    /// Products below the low-stock threshold.
    pub fn low_stock_products(&self) -> Result<Vec<FfiProduct>, MedicomError> {
        let db = self.db.lock()?;
        let filter = ProductFilter {
            low_stock_only: true,
            ordering: ProductOrdering::NameAsc,
            ..Default::default()
        };
        Ok(db.list_products(&filter)?.into_iter().map(|p| p.into()).collect())
    }

    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Register an account. Returns the new user id.
    pub fn register_user(&self, user: FfiUser) -> Result<i64, MedicomError> {
        let db = self.db.lock()?;
        Ok(db.register_user(&user.into())?)
    }

    pub fn get_user(&self, id: i64) -> Result<Option<FfiUser>, MedicomError> {
        let db = self.db.lock()?;
        Ok(db.get_user(id)?.map(|u| u.into()))
    }

    /// Update a user's names and contact details.
    pub fn update_profile(&self, user: FfiUser) -> Result<(), MedicomError> {
        let id = user.id;
        let db = self.db.lock()?;
        if !db.update_profile(&user.into())? {
            return Err(MedicomError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    /// Back-office user list with order totals.
    pub fn list_users(
        &self,
        search: Option<String>,
        is_staff: Option<bool>,
        is_active: Option<bool>,
    ) -> Result<Vec<FfiUserSummary>, MedicomError> {
        let db = self.db.lock()?;
        let filter = UserFilter {
            search,
            is_staff,
            is_active,
        };
        Ok(db.list_users(&filter)?.into_iter().map(|u| u.into()).collect())
    }

    /// Activate or deactivate another user's account.
    pub fn toggle_user_active(
        &self,
        acting_user_id: i64,
        user_id: i64,
    ) -> Result<FfiUser, MedicomError> {
        let db = self.db.lock()?;
        Ok(db.toggle_user_active(acting_user_id, user_id)?.into())
    }

    /// Grant or revoke staff access (superusers only).
    pub fn toggle_user_staff(
        &self,
        acting_user_id: i64,
        user_id: i64,
    ) -> Result<FfiUser, MedicomError> {
        let db = self.db.lock()?;
        Ok(db.toggle_user_staff(acting_user_id, user_id)?.into())
    }

    // =========================================================================
    // Prescription Operations
    // =========================================================================

    /// Match medicine names against the catalog.
    pub fn match_medicines(&self, names: Vec<String>) -> Result<FfiMatchResult, MedicomError> {
        let db = self.db.lock()?;
        let matcher = MedicineMatcher::new(&*db);
        Ok(matcher.match_names(&names).into())
    }

    /// Extract medicine names from prescription text and match them.
    pub fn match_prescription_text(&self, text: String) -> Result<FfiMatchResult, MedicomError> {
        let medicines = medicom_extract::extract_medicine_names(&text);
        let db = self.db.lock()?;
        let matcher = MedicineMatcher::new(&*db);
        Ok(matcher.match_extracted(&medicines).into())
    }

    // =========================================================================
    // Order Operations
    // =========================================================================

    /// Place an order for the given cart lines.
    pub fn place_order(
        &self,
        user_id: i64,
        lines: Vec<FfiCartLine>,
        shipping: FfiShippingDetails,
    ) -> Result<FfiOrder, MedicomError> {
        let mut db = self.db.lock()?;

        let mut cart = CartState::new();
        for line in lines {
            if line.quantity == 0 {
                return Err(MedicomError::InvalidInput(format!(
                    "quantity for product {} must be positive",
                    line.product_id
                )));
            }
            let product = db
                .get_product(line.product_id)?
                .ok_or_else(|| MedicomError::NotFound(format!("product {}", line.product_id)))?;
            cart.add_item(product, line.quantity)?;
        }

        let order = db.place_order(user_id, &cart, &shipping.into())?;
        Ok(order.into())
    }

    /// A user's order history, newest first.
    pub fn list_orders(&self, user_id: i64) -> Result<Vec<FfiOrder>, MedicomError> {
        let db = self.db.lock()?;
        let orders = db.list_orders_for_user(user_id)?;
        Ok(orders.into_iter().map(|o| o.into()).collect())
    }

    /// Record payment for an order.
    pub fn mark_order_paid(&self, order_id: i64) -> Result<FfiOrder, MedicomError> {
        let db = self.db.lock()?;
        Ok(db.mark_order_paid(order_id)?.into())
    }

    /// Move an order to a new status ("pending", "processing", "shipped", ...).
    pub fn update_order_status(
        &self,
        order_id: i64,
        status: String,
        tracking_number: Option<String>,
    ) -> Result<(), MedicomError> {
        let status = OrderStatus::parse(&status)
            .ok_or_else(|| MedicomError::InvalidInput(format!("unknown order status {}", status)))?;
        let db = self.db.lock()?;
        if !db.update_order_status(order_id, status, tracking_number.as_deref())? {
            return Err(MedicomError::NotFound(format!("order {}", order_id)));
        }
        Ok(())
    }

    /// Set an order's payment status ("pending", "paid", "failed", "refunded").
    pub fn update_payment_status(
        &self,
        order_id: i64,
        payment_status: String,
    ) -> Result<FfiOrder, MedicomError> {
        let status = PaymentStatus::parse(&payment_status).ok_or_else(|| {
            MedicomError::InvalidInput(format!("unknown payment status {}", payment_status))
        })?;
        let db = self.db.lock()?;
        Ok(db.update_payment_status(order_id, status)?.into())
    }

    /// Latest orders across all users.
    pub fn recent_orders(&self, limit: u32) -> Result<Vec<FfiOrder>, MedicomError> {
        let db = self.db.lock()?;
        let orders = db.recent_orders(limit as usize)?;
        Ok(orders.into_iter().map(|o| o.into()).collect())
    }

    /// Last week's paid sales per day and the best-selling products.
    pub fn sales_analytics(&self) -> Result<FfiSalesAnalytics, MedicomError> {
        let db = self.db.lock()?;
        Ok(db.sales_analytics()?.into())
    }

    /// Back-office dashboard figures.
    pub fn dashboard_stats(&self) -> Result<FfiDashboardStats, MedicomError> {
        let db = self.db.lock()?;
        Ok(db.dashboard_stats()?.into())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe category.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCategory {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image: Option<String>,
}

impl From<FfiCategory> for Category {
    fn from(c: FfiCategory) -> Self {
        Category {
            id: c.id,
            name: c.name,
            slug: c.slug,
            description: c.description,
            image: c.image,
        }
    }
}

/// FFI-safe product.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProduct {
    pub id: i64,
    pub category_id: i64,
    pub category_name: Option<String>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: f64,
    pub stock: i64,
    pub image: Option<String>,
    pub is_available: bool,
}

impl From<Product> for FfiProduct {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            category_id: p.category_id,
            category_name: p.category_name,
            name: p.name,
            slug: p.slug,
            description: p.description,
            price: p.price,
            stock: p.stock,
            image: p.image,
            is_available: p.is_available,
        }
    }
}

impl From<FfiProduct> for Product {
    fn from(p: FfiProduct) -> Self {
        Product {
            id: p.id,
            category_id: p.category_id,
            category_name: p.category_name,
            name: p.name,
            slug: p.slug,
            description: p.description,
            price: p.price,
            stock: p.stock,
            image: p.image,
            is_available: p.is_available,
        }
    }
}

/// FFI-safe per-name match trace.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicineMatch {
    pub query: String,
    pub product_id: Option<i64>,
    pub score: f64,
    pub outcome: String,
}

impl From<MedicineMatch> for FfiMedicineMatch {
    fn from(m: MedicineMatch) -> Self {
        Self {
            query: m.query,
            product_id: m.product_id,
            score: m.score,
            outcome: m.outcome.as_str().to_string(),
        }
    }
}

/// FFI-safe match result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMatchResult {
    pub found: Vec<FfiProduct>,
    pub not_found: Vec<String>,
    pub matches: Vec<FfiMedicineMatch>,
}

impl From<MatchResult> for FfiMatchResult {
    fn from(r: MatchResult) -> Self {
        Self {
            found: r.found.into_iter().map(|p| p.into()).collect(),
            not_found: r.not_found,
            matches: r.matches.into_iter().map(|m| m.into()).collect(),
        }
    }
}

/// FFI-safe cart line.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCartLine {
    pub product_id: i64,
    pub quantity: u32,
}

/// FFI-safe checkout form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiShippingDetails {
    pub address: String,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub postal_code: String,
    pub phone: String,
    pub payment_method: String,
}

impl From<FfiShippingDetails> for ShippingDetails {
    fn from(s: FfiShippingDetails) -> Self {
        ShippingDetails {
            address: s.address,
            city: s.city,
            state: s.state,
            country: s.country,
            postal_code: s.postal_code,
            phone: s.phone,
            payment_method: s.payment_method,
        }
    }
}

/// FFI-safe order line.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiOrderItem {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: u32,
    pub price: f64,
}

impl From<OrderItem> for FfiOrderItem {
    fn from(i: OrderItem) -> Self {
        Self {
            product_id: i.product_id,
            product_name: i.product_name,
            quantity: i.quantity,
            price: i.price,
        }
    }
}

/// FFI-safe order.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiOrder {
    pub id: i64,
    pub order_number: String,
    pub status: String,
    pub payment_status: String,
    pub total_amount: f64,
    pub is_paid: bool,
    pub paid_at: Option<String>,
    pub tracking_number: Option<String>,
    pub items: Vec<FfiOrderItem>,
    pub items_count: u64,
    pub created_at: String,
}

impl From<Order> for FfiOrder {
    fn from(o: Order) -> Self {
        let items_count = o.items_count();
        Self {
            id: o.id,
            order_number: o.order_number,
            status: o.status.as_str().to_string(),
            payment_status: o.payment_status.as_str().to_string(),
            total_amount: o.total_amount,
            is_paid: o.is_paid,
            paid_at: o.paid_at,
            tracking_number: o.tracking_number,
            items_count,
            items: o.items.into_iter().map(|i| i.into()).collect(),
            created_at: o.created_at,
        }
    }
}

/// FFI-safe dashboard statistics.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDashboardStats {
    pub total_products: u32,
    pub total_orders: u32,
    pub total_users: u32,
    pub total_revenue: f64,
    pub low_stock_products: u32,
    pub pending_orders: u32,
}

impl From<DashboardStats> for FfiDashboardStats {
    fn from(s: DashboardStats) -> Self {
        Self {
            total_products: s.total_products,
            total_orders: s.total_orders,
            total_users: s.total_users,
            total_revenue: s.total_revenue,
            low_stock_products: s.low_stock_products,
            pending_orders: s.pending_orders,
        }
    }
}

/// FFI-safe product review.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReview {
    pub id: i64,
    pub product_id: i64,
    pub user_id: i64,
    pub rating: u8,
    pub comment: String,
    pub created_at: String,
}

impl From<Review> for FfiReview {
    fn from(r: Review) -> Self {
        Self {
            id: r.id,
            product_id: r.product_id,
            user_id: r.user_id,
            rating: r.rating,
            comment: r.comment,
            created_at: r.created_at,
        }
    }
}

/// FFI-safe user account.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
}

impl From<User> for FfiUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            phone: u.phone,
            address: u.address,
            city: u.city,
            country: u.country,
            postal_code: u.postal_code,
            is_staff: u.is_staff,
            is_superuser: u.is_superuser,
            is_active: u.is_active,
        }
    }
}

impl From<FfiUser> for User {
    fn from(u: FfiUser) -> Self {
        User {
            id: u.id,
            username: u.username,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            phone: u.phone,
            address: u.address,
            city: u.city,
            country: u.country,
            postal_code: u.postal_code,
            is_staff: u.is_staff,
            is_superuser: u.is_superuser,
            is_active: u.is_active,
        }
    }
}

/// FFI-safe user row of the back-office list.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiUserSummary {
    pub user: FfiUser,
    pub total_orders: u32,
    pub total_spent: f64,
}

impl From<UserSummary> for FfiUserSummary {
    fn from(s: UserSummary) -> Self {
        Self {
            user: s.user.into(),
            total_orders: s.total_orders,
            total_spent: s.total_spent,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDailySales {
    pub day: String,
    pub total: f64,
    pub count: u32,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTopProduct {
    pub product_id: i64,
    pub product_name: String,
    pub total_quantity: i64,
    pub total_revenue: f64,
}

/// FFI-safe sales analytics.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSalesAnalytics {
    pub daily_sales: Vec<FfiDailySales>,
    pub top_products: Vec<FfiTopProduct>,
}

impl From<SalesAnalytics> for FfiSalesAnalytics {
    fn from(a: SalesAnalytics) -> Self {
        Self {
            daily_sales: a
                .daily_sales
                .into_iter()
                .map(|d| FfiDailySales {
                    day: d.day,
                    total: d.total,
                    count: d.count,
                })
                .collect(),
            top_products: a
                .top_products
                .into_iter()
                .map(|p| FfiTopProduct {
                    product_id: p.product_id,
                    product_name: p.product_name,
                    total_quantity: p.total_quantity,
                    total_revenue: p.total_revenue,
                })
                .collect(),
        }
    }
}
