//! Account database operations.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::User;

const USER_SELECT: &str = r#"
    SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.phone,
           u.address, u.city, u.country, u.postal_code,
           u.is_staff, u.is_superuser, u.is_active
    FROM users u
"#;

/// Filters for [`Database::list_users`].
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Substring of email, username, first or last name
    pub search: Option<String>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
}

/// A user with order totals (back office view).
#[derive(Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub user: User,
    pub total_orders: u32,
    /// Sum of totals of the user's paid orders
    pub total_spent: f64,
}

impl Database {
    /// Register a new account and return its id.
    ///
    /// `user.id` is ignored. Emails (case-insensitive) and usernames must be
    /// unused.
    pub fn register_user(&self, user: &User) -> DbResult<i64> {
        let taken: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 OR username = ?2)",
            params![user.email, user.username],
            |row| row.get(0),
        )?;
        if taken {
            return Err(DbError::Constraint(format!(
                "email {} or username {} is already registered",
                user.email, user.username
            )));
        }

        self.conn.execute(
            r#"
            INSERT INTO users (
                username, email, first_name, last_name, phone, address,
                city, country, postal_code, is_staff, is_superuser, is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                user.username,
                user.email,
                user.first_name,
                user.last_name,
                user.phone,
                user.address,
                user.city,
                user.country,
                user.postal_code,
                user.is_staff,
                user.is_superuser,
                user.is_active,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!("registered user {} ({})", id, user.username);
        Ok(id)
    }

    pub fn get_user(&self, id: i64) -> DbResult<Option<User>> {
        let sql = format!("{} WHERE u.id = ?", USER_SELECT);
        Ok(self.conn.query_row(&sql, [id], user_from_row).optional()?)
    }

    pub fn get_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let sql = format!("{} WHERE u.email = ?", USER_SELECT);
        Ok(self.conn.query_row(&sql, [email], user_from_row).optional()?)
    }

    /// Update a user's own profile: names and contact details.
    ///
    /// Role and activity flags are left alone.
    pub fn update_profile(&self, user: &User) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE users SET
                first_name = ?2,
                last_name = ?3,
                phone = ?4,
                address = ?5,
                city = ?6,
                country = ?7,
                postal_code = ?8
            WHERE id = ?1
            "#,
            params![
                user.id,
                user.first_name,
                user.last_name,
                user.phone,
                user.address,
                user.city,
                user.country,
                user.postal_code,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Users with order counts and paid spend, newest first.
    pub fn list_users(&self, filter: &UserFilter) -> DbResult<Vec<UserSummary>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            clauses.push(
                "(u.email LIKE ? OR u.username LIKE ? OR u.first_name LIKE ? OR u.last_name LIKE ?)"
                    .into(),
            );
            let pattern = format!("%{}%", search.trim());
            values.extend(std::iter::repeat(Value::Text(pattern)).take(4));
        }
        if let Some(staff) = filter.is_staff {
            clauses.push("u.is_staff = ?".into());
            values.push(Value::Integer(i64::from(staff)));
        }
        if let Some(active) = filter.is_active {
            clauses.push("u.is_active = ?".into());
            values.push(Value::Integer(i64::from(active)));
        }

        let mut sql = String::from(
            r#"
            SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.phone,
                   u.address, u.city, u.country, u.postal_code,
                   u.is_staff, u.is_superuser, u.is_active,
                   (SELECT COUNT(*) FROM orders o WHERE o.user_id = u.id),
                   (SELECT COALESCE(SUM(o.total_amount), 0.0) FROM orders o
                    WHERE o.user_id = u.id AND o.payment_status = 'paid')
            FROM users u
            "#,
        );
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY u.date_joined DESC, u.id DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            Ok(UserSummary {
                user: user_from_row(row)?,
                total_orders: row.get(13)?,
                total_spent: row.get(14)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Activate or deactivate an account on behalf of `acting_user_id`.
    ///
    /// Nobody can toggle their own account.
    pub fn toggle_user_active(&self, acting_user_id: i64, user_id: i64) -> DbResult<User> {
        if acting_user_id == user_id {
            return Err(DbError::Constraint(
                "you cannot deactivate your own account".into(),
            ));
        }
        self.toggle_flag(user_id, "is_active")
    }

    /// Grant or revoke staff access. Only superusers may do this.
    pub fn toggle_user_staff(&self, acting_user_id: i64, user_id: i64) -> DbResult<User> {
        let acting = self
            .get_user(acting_user_id)?
            .ok_or_else(|| DbError::NotFound(format!("user {}", acting_user_id)))?;
        if !acting.is_superuser {
            return Err(DbError::PermissionDenied(
                "only superusers can modify staff status".into(),
            ));
        }
        self.toggle_flag(user_id, "is_staff")
    }

    fn toggle_flag(&self, user_id: i64, column: &str) -> DbResult<User> {
        let rows_affected = self.conn.execute(
            &format!("UPDATE users SET {0} = NOT {0} WHERE id = ?", column),
            [user_id],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("user {}", user_id)));
        }

        tracing::info!("toggled {} for user {}", column, user_id);
        self.get_user(user_id)?
            .ok_or_else(|| DbError::NotFound(format!("user {}", user_id)))
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        phone: row.get(5)?,
        address: row.get(6)?,
        city: row.get(7)?,
        country: row.get(8)?,
        postal_code: row.get(9)?,
        is_staff: row.get(10)?,
        is_superuser: row.get(11)?,
        is_active: row.get(12)?,
    })
}
