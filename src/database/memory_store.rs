use crate::{
    database::{user_store::exceeds_balance, UserStore},
    models::{AuctionStatsDelta, User, UserRole},
    utils::AppError,
};
use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process `UserStore` with the same uniqueness and projection rules as MongoDB
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<ObjectId, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

fn email_taken(users: &HashMap<ObjectId, User>, email: &str, except: &ObjectId) -> bool {
    users
        .values()
        .any(|existing| existing.id != *except && existing.email == email)
}

fn conflict(email: &str) -> AppError {
    AppError::Conflict {
        field: "email".to_string(),
        value: email.to_string(),
    }
}

/// Copy as it would come back from the database
fn stored_copy(user: &User) -> User {
    let mut copy = user.clone();
    copy.mark_persisted();
    copy
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(AppError::Conflict {
                field: "_id".to_string(),
                value: user.id.to_hex(),
            });
        }
        if email_taken(&users, &user.email, &user.id) {
            return Err(conflict(&user.email));
        }
        users.insert(user.id, stored_copy(user));
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if email_taken(&users, &user.email, &user.id) {
            return Err(conflict(&user.email));
        }

        let existing = users
            .get_mut(&user.id)
            .ok_or_else(|| AppError::NotFound(format!("User {}", user.id.to_hex())))?;

        let mut updated = stored_copy(user);
        updated.created_at = existing.created_at;
        updated.auctions_won = existing.auctions_won;
        updated.money_spent = existing.money_spent;
        updated.unpaid_commission = existing.unpaid_commission;
        if updated.password().is_none() {
            if let Some(hash) = existing.password() {
                updated.store_password_hash(hash.to_string());
            }
        }
        *existing = updated;
        Ok(())
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.get(id).map(|u| u.clone().without_password()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email == email)
            .map(|u| u.clone().without_password()))
    }

    async fn find_by_email_with_password(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_role(&self, role: UserRole) -> Result<Vec<User>, AppError> {
        let users = self.users.read().await;
        let mut matching: Vec<User> = users
            .values()
            .filter(|u| u.role == role)
            .map(|u| u.clone().without_password())
            .collect();
        // ObjectIds grow with creation time, so this is insertion order
        matching.sort_by_key(|u| u.id);
        Ok(matching)
    }

    async fn increment_stats(
        &self,
        id: &ObjectId,
        delta: &AuctionStatsDelta,
    ) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(id).map(|user| {
            user.auctions_won += delta.auctions_won;
            user.money_spent += delta.money_spent;
            user.unpaid_commission += delta.unpaid_commission;
            user.updated_at = Some(BsonDateTime::now());
            user.clone().without_password()
        }))
    }

    async fn deduct_unpaid_commission(
        &self,
        id: &ObjectId,
        amount: f64,
    ) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(id) else {
            return Ok(None);
        };
        if amount > user.unpaid_commission {
            return Err(exceeds_balance(amount, user.unpaid_commission));
        }
        user.unpaid_commission -= amount;
        user.updated_at = Some(BsonDateTime::now());
        Ok(Some(user.clone().without_password()))
    }
}
