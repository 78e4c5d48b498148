use rabbit_types::Username;
use rabbit_types::models::{User, UserUpdate};
use tracing::info;

use crate::error::{Result, StoreError};
use crate::Store;

impl Store {
    // -- Users --

    pub fn get_users(&self) -> Result<Vec<User>> {
        self.read_rows(&self.global_path::<User>())
    }

    pub fn get_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        Ok(self.get_users()?.into_iter().find(|u| &u.username == username))
    }

    /// Emails are compared case-insensitively.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_lowercase();
        Ok(self
            .get_users()?
            .into_iter()
            .find(|u| u.email.to_lowercase() == email))
    }

    /// Insert a new user and create their directory. Fails with
    /// `DuplicateKey` when the username or the lowercased email is already
    /// taken. The email is stored lowercased.
    pub fn create_user(&self, mut user: User) -> Result<User> {
        user.email = user.email.to_lowercase();
        let path = self.global_path::<User>();

        self.locks.with_lock(&path, || {
            let users: Vec<User> = self.read_rows(&path)?;
            if users.iter().any(|u| u.username == user.username) {
                return Err(StoreError::DuplicateKey {
                    field: "username",
                    value: user.username.to_string(),
                });
            }
            if users.iter().any(|u| u.email.to_lowercase() == user.email) {
                return Err(StoreError::DuplicateKey { field: "email", value: user.email.clone() });
            }
            // Directory first: a failure here must not leave a stored row.
            self.ensure_user_directory(&user.username)?;
            self.append_row(&path, &user)
        })?;

        info!("Created user {}", user.username);
        Ok(user)
    }

    /// Merge the provided fields into an existing user and rewrite the table.
    pub fn update_user(&self, username: &Username, update: UserUpdate) -> Result<User> {
        let path = self.global_path::<User>();

        self.locks.with_lock(&path, || {
            let mut users: Vec<User> = self.read_rows(&path)?;
            let idx = users
                .iter()
                .position(|u| &u.username == username)
                .ok_or_else(|| StoreError::NotFound(format!("user {username}")))?;

            if let Some(email) = update.email {
                let email = email.to_lowercase();
                let taken = users
                    .iter()
                    .enumerate()
                    .any(|(i, u)| i != idx && u.email.to_lowercase() == email);
                if taken {
                    return Err(StoreError::DuplicateKey { field: "email", value: email });
                }
                users[idx].email = email;
            }
            if let Some(password) = update.password {
                users[idx].password = password;
            }
            if let Some(name) = update.name {
                users[idx].name = name;
            }
            if let Some(verified) = update.email_verified {
                users[idx].email_verified = verified;
            }

            self.write_rows(&path, &users)?;
            Ok(users.swap_remove(idx))
        })
    }
}
