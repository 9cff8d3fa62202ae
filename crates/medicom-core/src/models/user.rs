//! Storefront user account as returned by the auth endpoints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
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

impl User {
    pub fn new(id: i64, username: String, email: String) -> Self {
        Self {
            id,
            username,
            email,
            first_name: None,
            last_name: None,
            phone: None,
            address: None,
            city: None,
            country: None,
            postal_code: None,
            is_staff: false,
            is_superuser: false,
            is_active: true,
        }
    }

    /// Name for display: "First Last" when known, otherwise the username.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect();

        if parts.is_empty() {
            self.username.clone()
        } else {
            parts.join(" ")
        }
    }

    /// Staff or superuser accounts may use the back office.
    pub fn is_admin(&self) -> bool {
        self.is_staff || self.is_superuser
    }
}

/// Token pair returned by a successful login or registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: Option<User>,
}
