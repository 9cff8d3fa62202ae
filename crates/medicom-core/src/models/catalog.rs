//! Catalog models: categories and products.

use serde::{Deserialize, Serialize};

/// Products with less stock than this count as low stock.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// A product category (e.g., "Pain Relief", "Vitamins").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// URL slug, generated from the name when empty
    pub slug: String,
    pub description: String,
    pub image: Option<String>,
}

impl Category {
    pub fn new(id: i64, name: String) -> Self {
        Self {
            id,
            name,
            slug: String::new(),
            description: String::new(),
            image: None,
        }
    }
}

/// A sellable catalog product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i64,
    pub category_id: i64,
    /// Denormalized category name, filled in on reads
    pub category_name: Option<String>,
    pub name: String,
    /// URL slug, generated from the name when empty
    pub slug: String,
    pub description: String,
    pub price: f64,
    pub stock: i64,
    pub image: Option<String>,
    pub is_available: bool,
}

impl Product {
    /// Create a new available product with required fields.
    pub fn new(id: i64, category_id: i64, name: String, price: f64) -> Self {
        Self {
            id,
            category_id,
            category_name: None,
            name,
            slug: String::new(),
            description: String::new(),
            price,
            stock: 0,
            image: None,
            is_available: true,
        }
    }

    /// Check whether `quantity` units can be sold right now.
    pub fn can_fulfil(&self, quantity: u32) -> bool {
        self.is_available && self.stock >= i64::from(quantity)
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock < LOW_STOCK_THRESHOLD
    }
}

/// A customer's rating of a product, one per user and product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: i64,
    pub product_id: i64,
    pub user_id: i64,
    /// 1 to 5 stars
    pub rating: u8,
    pub comment: String,
    pub created_at: String,
}

/// Turn a name into a URL slug: lowercase ASCII words joined by dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Paracetamol 500mg"), "paracetamol-500mg");
        assert_eq!(slugify("  Vitamin D3  (1000 IU) "), "vitamin-d3-1000-iu");
        assert_eq!(slugify("Cough & Cold"), "cough-cold");
        assert_eq!(slugify("already-a_slug"), "already-a-slug");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_can_fulfil() {
        let mut product = Product::new(1, 1, "Ibuprofen".into(), 4.5);
        product.stock = 3;

        assert!(product.can_fulfil(3));
        assert!(!product.can_fulfil(4));

        product.is_available = false;
        assert!(!product.can_fulfil(1));
    }

    #[test]
    fn test_low_stock() {
        let mut product = Product::new(1, 1, "Ibuprofen".into(), 4.5);
        product.stock = 9;
        assert!(product.is_low_stock());
        product.stock = 10;
        assert!(!product.is_low_stock());
    }
}
