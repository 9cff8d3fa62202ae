//! Product listing state.

use serde::{Deserialize, Serialize};

use crate::models::{Category, Product};

/// A page of results in the REST pagination shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Pagination {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductState {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub current: Option<Product>,
    pub pagination: Pagination,
}

impl ProductState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_products(&mut self, page: Page<Product>) {
        self.pagination = Pagination {
            count: page.count,
            next: page.next,
            previous: page.previous,
        };
        self.products = page.results;
    }

    pub fn set_categories(&mut self, categories: Vec<Category>) {
        self.categories = categories;
    }

    pub fn set_current(&mut self, product: Product) {
        self.current = Some(product);
    }

    pub fn clear_current(&mut self) {
        self.current = None;
    }

    pub fn has_next_page(&self) -> bool {
        self.pagination.next.is_some()
    }
}
