//! Catalog database operations.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{slugify, Category, Product, Review, LOW_STOCK_THRESHOLD};

pub(super) const PRODUCT_SELECT: &str = r#"
    SELECT p.id, p.category_id, c.name, p.name, p.slug, p.description,
           p.price, p.stock, p.image, p.is_available
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
"#;

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductOrdering {
    /// Newest first
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    NameAsc,
}

impl ProductOrdering {
    fn sql(&self) -> &'static str {
        match self {
            ProductOrdering::Newest => "p.created_at DESC, p.id DESC",
            ProductOrdering::PriceAsc => "p.price ASC, p.id",
            ProductOrdering::PriceDesc => "p.price DESC, p.id",
            ProductOrdering::NameAsc => "p.name COLLATE NOCASE ASC, p.id",
        }
    }
}

/// Filters for [`Database::list_products`].
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<i64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub is_available: Option<bool>,
    /// Only products below the low-stock threshold
    pub low_stock_only: bool,
    pub ordering: ProductOrdering,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// A category with the number of products filed under it.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryWithCount {
    pub category: Category,
    pub products_count: u32,
}

impl Database {
    // =========================================================================
    // Categories
    // =========================================================================

    /// Insert or update a category. An empty slug is generated from the name.
    ///
    /// Returns the slug stored for the category.
    pub fn upsert_category(&self, category: &Category) -> DbResult<String> {
        let slug = self.resolve_slug("categories", category.id, &category.slug, &category.name)?;

        self.conn.execute(
            r#"
            INSERT INTO categories (id, name, slug, description, image)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                slug = excluded.slug,
                description = excluded.description,
                image = excluded.image
            "#,
            params![
                category.id,
                category.name,
                slug,
                category.description,
                category.image,
            ],
        )?;
        Ok(slug)
    }

    pub fn get_category_by_slug(&self, slug: &str) -> DbResult<Option<Category>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, slug, description, image FROM categories WHERE slug = ?",
                [slug],
                category_from_row,
            )
            .optional()?)
    }

    /// All categories by name.
    pub fn list_categories(&self) -> DbResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, slug, description, image FROM categories ORDER BY name COLLATE NOCASE",
        )?;
        let rows = stmt.query_map([], category_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// All categories by name, with product counts (back office view).
    pub fn list_categories_with_counts(&self) -> DbResult<Vec<CategoryWithCount>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT c.id, c.name, c.slug, c.description, c.image, COUNT(p.id)
            FROM categories c
            LEFT JOIN products p ON p.category_id = c.id
            GROUP BY c.id
            ORDER BY c.name COLLATE NOCASE
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CategoryWithCount {
                category: category_from_row(row)?,
                products_count: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Delete an empty category.
    ///
    /// Categories that still have products are refused.
    pub fn delete_category(&self, id: i64) -> DbResult<bool> {
        let products: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM products WHERE category_id = ?",
            [id],
            |row| row.get(0),
        )?;
        if products > 0 {
            return Err(DbError::Constraint(format!(
                "category {} still has {} products",
                id, products
            )));
        }

        let rows_affected = self.conn.execute("DELETE FROM categories WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Insert or update a product. An empty slug is generated from the name.
    ///
    /// Returns the slug stored for the product.
    pub fn upsert_product(&self, product: &Product) -> DbResult<String> {
        if product.price < 0.0 {
            return Err(DbError::Constraint(format!(
                "price of {} must not be negative",
                product.name
            )));
        }
        if product.stock < 0 {
            return Err(DbError::Constraint(format!(
                "stock of {} must not be negative",
                product.name
            )));
        }

        let slug = self.resolve_slug("products", product.id, &product.slug, &product.name)?;

        self.conn.execute(
            r#"
            INSERT INTO products (
                id, category_id, name, slug, description,
                price, stock, image, is_available, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                category_id = excluded.category_id,
                name = excluded.name,
                slug = excluded.slug,
                description = excluded.description,
                price = excluded.price,
                stock = excluded.stock,
                image = excluded.image,
                is_available = excluded.is_available,
                updated_at = datetime('now')
            "#,
            params![
                product.id,
                product.category_id,
                product.name,
                slug,
                product.description,
                product.price,
                product.stock,
                product.image,
                product.is_available,
            ],
        )?;
        Ok(slug)
    }

    /// Get a product by id.
    pub fn get_product(&self, id: i64) -> DbResult<Option<Product>> {
        let sql = format!("{} WHERE p.id = ?", PRODUCT_SELECT);
        Ok(self.conn.query_row(&sql, [id], product_from_row).optional()?)
    }

    pub fn get_product_by_slug(&self, slug: &str) -> DbResult<Option<Product>> {
        let sql = format!("{} WHERE p.slug = ?", PRODUCT_SELECT);
        Ok(self.conn.query_row(&sql, [slug], product_from_row).optional()?)
    }

    /// Search available products by name/description using FTS5 (BM25 ranking).
    ///
    /// Every query word is a prefix term; a product matching any word is a
    /// hit, products matching more words rank higher.
    pub fn search_products(&self, query: &str, limit: usize) -> DbResult<Vec<Product>> {
        let fts_query = escape_fts_query(query);
        if fts_query.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            {}
            JOIN products_fts fts ON p.id = fts.rowid
            WHERE products_fts MATCH ?1
            AND p.is_available = 1
            ORDER BY bm25(products_fts), p.id
            LIMIT ?2
            "#,
            PRODUCT_SELECT
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![fts_query, limit as i64], product_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// List products matching a filter.
    pub fn list_products(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(category_id) = filter.category_id {
            clauses.push("p.category_id = ?".into());
            values.push(Value::Integer(category_id));
        }
        if let Some(min) = filter.min_price {
            clauses.push("p.price >= ?".into());
            values.push(Value::Real(min));
        }
        if let Some(max) = filter.max_price {
            clauses.push("p.price <= ?".into());
            values.push(Value::Real(max));
        }
        if let Some(available) = filter.is_available {
            clauses.push("p.is_available = ?".into());
            values.push(Value::Integer(i64::from(available)));
        }
        if filter.low_stock_only {
            clauses.push("p.stock < ?".into());
            values.push(Value::Integer(LOW_STOCK_THRESHOLD));
        }

        let mut sql = String::from(PRODUCT_SELECT);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(filter.ordering.sql());
        sql.push_str(" LIMIT ? OFFSET ?");
        values.push(Value::Integer(filter.limit.map_or(-1, |l| l as i64)));
        values.push(Value::Integer(filter.offset as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), product_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Show or hide a product in the storefront.
    pub fn set_product_availability(&self, id: i64, available: bool) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE products SET is_available = ?2, updated_at = datetime('now') WHERE id = ?1",
            params![id, available],
        )?;
        Ok(rows_affected > 0)
    }

    /// Set the stock level of a product.
    pub fn update_stock(&self, id: i64, stock: i64) -> DbResult<Product> {
        if stock < 0 {
            return Err(DbError::Constraint(format!(
                "stock of product {} must not be negative",
                id
            )));
        }

        let rows_affected = self.conn.execute(
            "UPDATE products SET stock = ?2, updated_at = datetime('now') WHERE id = ?1",
            params![id, stock],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("product {}", id)));
        }
        self.get_product(id)?
            .ok_or_else(|| DbError::NotFound(format!("product {}", id)))
    }

    pub fn delete_product(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM products WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Record a user's review of a product.
    ///
    /// Ratings run from 1 to 5 and each user may review a product once.
    pub fn add_review(
        &self,
        product_id: i64,
        user_id: i64,
        rating: u8,
        comment: &str,
    ) -> DbResult<Review> {
        if !(1..=5).contains(&rating) {
            return Err(DbError::Constraint(format!(
                "rating must be between 1 and 5, got {}",
                rating
            )));
        }
        if self.get_product(product_id)?.is_none() {
            return Err(DbError::NotFound(format!("product {}", product_id)));
        }
        if self.get_user(user_id)?.is_none() {
            return Err(DbError::NotFound(format!("user {}", user_id)));
        }

        let already: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM reviews WHERE product_id = ?1 AND user_id = ?2)",
            params![product_id, user_id],
            |row| row.get(0),
        )?;
        if already {
            return Err(DbError::Constraint(format!(
                "user {} has already reviewed product {}",
                user_id, product_id
            )));
        }

        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            r#"
            INSERT INTO reviews (product_id, user_id, rating, comment, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![product_id, user_id, rating, comment, created_at],
        )?;

        Ok(Review {
            id: self.conn.last_insert_rowid(),
            product_id,
            user_id,
            rating,
            comment: comment.to_string(),
            created_at,
        })
    }

    /// Reviews of a product, newest first.
    pub fn list_reviews(&self, product_id: i64) -> DbResult<Vec<Review>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, product_id, user_id, rating, comment, created_at
            FROM reviews
            WHERE product_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )?;
        let rows = stmt.query_map([product_id], |row| {
            Ok(Review {
                id: row.get(0)?,
                product_id: row.get(1)?,
                user_id: row.get(2)?,
                rating: row.get(3)?,
                comment: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Mean rating of a product, `None` when it has no reviews.
    pub fn average_rating(&self, product_id: i64) -> DbResult<Option<f64>> {
        Ok(self.conn.query_row(
            "SELECT AVG(rating) FROM reviews WHERE product_id = ?",
            [product_id],
            |row| row.get(0),
        )?)
    }

    /// Slug to store for a row: the given one, the row's current one, or a
    /// fresh unique slug derived from the name (`name`, `name-1`, `name-2`, ...).
    fn resolve_slug(&self, table: &str, id: i64, slug: &str, name: &str) -> DbResult<String> {
        if !slug.is_empty() {
            return Ok(slug.to_string());
        }

        let existing: Option<String> = self
            .conn
            .query_row(&format!("SELECT slug FROM {} WHERE id = ?", table), [id], |row| {
                row.get(0)
            })
            .optional()?;
        if let Some(existing) = existing {
            return Ok(existing);
        }

        let base = match slugify(name) {
            s if s.is_empty() => format!("item-{}", id),
            s => s,
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        loop {
            let taken: bool = self.conn.query_row(
                &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE slug = ?)", table),
                [&candidate],
                |row| row.get(0),
            )?;
            if !taken {
                return Ok(candidate);
            }
            candidate = format!("{}-{}", base, suffix);
            suffix += 1;
        }
    }
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        image: row.get(4)?,
    })
}

pub(super) fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        category_id: row.get(1)?,
        category_name: row.get(2)?,
        name: row.get(3)?,
        slug: row.get(4)?,
        description: row.get(5)?,
        price: row.get(6)?,
        stock: row.get(7)?,
        image: row.get(8)?,
        is_available: row.get(9)?,
    })
}

/// Escape special FTS5 characters and build an any-word prefix query.
fn escape_fts_query(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .map(|word| format!("\"{}\"*", word))
        .collect::<Vec<_>>()
        .join(" OR ")
}
