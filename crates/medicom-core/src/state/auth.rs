//! Authentication state.

use serde::{Deserialize, Serialize};

use crate::models::{LoginResponse, User};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the token pair (and user, when the response carries one).
    pub fn login(&mut self, response: LoginResponse) {
        self.access_token = Some(response.access);
        self.refresh_token = Some(response.refresh);
        if response.user.is_some() {
            self.user = response.user;
        }
    }

    pub fn logout(&mut self) {
        *self = Self::default();
    }

    /// Replace the cached profile after a profile fetch or edit.
    pub fn update_user(&mut self, user: User) {
        self.user = Some(user);
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Gate for back-office screens.
    pub fn is_admin(&self) -> bool {
        self.is_authenticated() && self.user.as_ref().is_some_and(User::is_admin)
    }
}
