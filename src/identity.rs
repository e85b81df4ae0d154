use crate::core::{CustodyError, Entity, HotelId, Result, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Staff account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffUser {
    username: String,
    password_hash: String,
    role: Role,
    hotel_id: Option<HotelId>,
}

impl StaffUser {
    /// Creates a new account record from an already hashed password
    pub fn new(username: String, password_hash: String, role: Role, hotel_id: Option<HotelId>) -> Self {
        Self {
            username,
            password_hash,
            role,
            hotel_id,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Hotel the account is scoped to
    pub fn hotel_id(&self) -> Option<HotelId> {
        self.hotel_id
    }

    #[inline]
    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }

    fn set_password_hash(&mut self, hash: String) {
        self.password_hash = hash;
    }
}

/// Resolves an operator identifier to an account and role.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, username: &str) -> Result<Option<StaffUser>>;
}

/// Staff account registry
///
/// Holds accounts with bcrypt password hashes and answers role lookups for the
/// lifecycle engine.
pub struct StaffRegistry {
    users: RwLock<HashMap<String, StaffUser>>,
    cost: u32,
}

impl StaffRegistry {
    const MIN_PASSWORD_LEN: usize = 8;
    const MAX_USERNAME_LEN: usize = 50;

    /// Creates an empty registry hashing with bcrypt's default cost
    pub fn new() -> Self {
        Self::with_cost(bcrypt::DEFAULT_COST)
    }

    pub fn with_cost(cost: u32) -> Self {
        Self::from_users(Vec::new(), cost)
    }

    /// Rebuilds a registry from exported accounts
    pub fn from_users(users: Vec<StaffUser>, cost: u32) -> Self {
        let users = users
            .into_iter()
            .map(|user| (user.username.clone(), user))
            .collect();
        Self {
            users: RwLock::new(users),
            cost,
        }
    }

    fn hash_password(&self, password: &str) -> Result<String> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| CustodyError::storage(format!("failed to hash password: {}", e)))
    }

    fn verify_password(password: &str, hash: &str) -> bool {
        bcrypt::verify(password, hash).unwrap_or(false)
    }

    /// Authenticates a user
    ///
    /// Unknown users and wrong passwords fail with the same error.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<StaffUser> {
        let users = self.users.read().await;

        let user = users
            .get(username)
            .filter(|user| Self::verify_password(password, &user.password_hash))
            .ok_or_else(|| CustodyError::invalid("credentials", "invalid username or password"))?;

        Ok(user.clone())
    }

    /// Creates a new account. Staff and admins must be scoped to a hotel.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
        hotel_id: Option<HotelId>,
    ) -> Result<StaffUser> {
        Self::validate_username(username)?;
        Self::validate_password(password)?;
        if role == Role::Guest {
            return Err(CustodyError::invalid("role", "accounts must be staff or admin"));
        }
        let hotel_id = match hotel_id {
            Some(id) if id > 0 => id,
            _ => return Err(CustodyError::invalid("hotel_id", "required for staff and admin accounts")),
        };

        let hash = self.hash_password(password)?;
        let mut users = self.users.write().await;

        if users.contains_key(username) {
            return Err(CustodyError::conflict(
                "username",
                format!("user '{}' already exists", username),
            ));
        }

        let user = StaffUser::new(username.to_string(), hash, role, Some(hotel_id));
        users.insert(username.to_string(), user.clone());

        Ok(user)
    }

    pub async fn delete_user(&self, username: &str) -> Result<()> {
        let mut users = self.users.write().await;
        users
            .remove(username)
            .map(|_| ())
            .ok_or_else(|| CustodyError::not_found(Entity::Staff, username))
    }

    pub async fn update_password(&self, username: &str, new_password: &str) -> Result<()> {
        Self::validate_password(new_password)?;
        let hash = self.hash_password(new_password)?;

        let mut users = self.users.write().await;
        let user = users
            .get_mut(username)
            .ok_or_else(|| CustodyError::not_found(Entity::Staff, username))?;
        user.set_password_hash(hash);

        Ok(())
    }

    /// Sorted usernames
    pub async fn list_users(&self) -> Vec<String> {
        let users = self.users.read().await;
        let mut usernames: Vec<String> = users.keys().cloned().collect();
        usernames.sort();
        usernames
    }

    pub async fn get_user(&self, username: &str) -> Option<StaffUser> {
        self.users.read().await.get(username).cloned()
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// All accounts, sorted by username
    pub async fn export_users(&self) -> Vec<StaffUser> {
        let users = self.users.read().await;
        let mut exported: Vec<StaffUser> = users.values().cloned().collect();
        exported.sort_by(|a, b| a.username.cmp(&b.username));
        exported
    }

    fn validate_username(username: &str) -> Result<()> {
        if username.is_empty() {
            return Err(CustodyError::invalid("username", "cannot be empty"));
        }
        if username.len() > Self::MAX_USERNAME_LEN {
            return Err(CustodyError::invalid("username", "too long (max 50 characters)"));
        }
        Ok(())
    }

    fn validate_password(password: &str) -> Result<()> {
        if password.is_empty() {
            return Err(CustodyError::invalid("password", "cannot be empty"));
        }
        if password.len() < Self::MIN_PASSWORD_LEN {
            return Err(CustodyError::invalid("password", "must be at least 8 characters long"));
        }
        Ok(())
    }
}

impl Default for StaffRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityResolver for StaffRegistry {
    async fn resolve(&self, username: &str) -> Result<Option<StaffUser>> {
        Ok(self.get_user(username).await)
    }
}
