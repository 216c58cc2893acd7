use crate::{
    database::MongoDB,
    models::{AuctionStatsDelta, User, UserRole},
    utils::AppError,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, DateTime as BsonDateTime, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ReturnDocument;
use mongodb::Collection;

const DUPLICATE_KEY: i32 = 11000;

/// Fields a full-record update never writes. Counters move only through
/// `increment_stats` and `deduct_unpaid_commission`.
const UPDATE_SKIPPED_FIELDS: [&str; 5] = [
    "_id",
    "createdAt",
    "auctionsWon",
    "moneySpent",
    "unpaidCommission",
];

/// Persistence seam for user records.
///
/// Default reads (`find_by_id`, `find_by_email`, `find_by_role`,
/// `increment_stats`) never return the password. Implementations must reject a
/// second record with an existing email with `AppError::Conflict`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: &User) -> Result<(), AppError>;

    /// Replaces the stored fields of an existing record. A record without a
    /// loaded password keeps the stored one, and the auction counters and
    /// creation time are left as stored.
    async fn update(&self, user: &User) -> Result<(), AppError>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Like `find_by_email`, but includes the password hash for comparison
    async fn find_by_email_with_password(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_role(&self, role: UserRole) -> Result<Vec<User>, AppError>;

    /// Atomically adds `delta` to the auction counters, returning the updated record
    async fn increment_stats(
        &self,
        id: &ObjectId,
        delta: &AuctionStatsDelta,
    ) -> Result<Option<User>, AppError>;

    /// Atomically subtracts `amount` from the unpaid commission, only while the
    /// balance covers it. `None` means no such user; an insufficient balance
    /// is `AppError::InvalidRequest`.
    async fn deduct_unpaid_commission(
        &self,
        id: &ObjectId,
        amount: f64,
    ) -> Result<Option<User>, AppError>;
}

pub(crate) fn exceeds_balance(amount: f64, balance: f64) -> AppError {
    AppError::InvalidRequest(format!(
        "Settlement of {} exceeds unpaid commission of {}",
        amount, balance
    ))
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn write_error(err: mongodb::error::Error, email: &str) -> AppError {
    if is_duplicate_key(&err) {
        AppError::Conflict {
            field: "email".to_string(),
            value: email.to_string(),
        }
    } else {
        AppError::from(err)
    }
}

fn without_password() -> Document {
    doc! { "password": 0 }
}

/// `UserStore` backed by the "User" collection
#[derive(Clone)]
pub struct MongoUserStore {
    collection: Collection<User>,
}

impl MongoUserStore {
    pub fn new(db: &MongoDB) -> Self {
        Self {
            collection: db.users(),
        }
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn insert(&self, user: &User) -> Result<(), AppError> {
        self.collection
            .insert_one(user)
            .await
            .map_err(|e| write_error(e, &user.email))?;
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), AppError> {
        let mut fields = bson::to_document(user)?;
        for field in UPDATE_SKIPPED_FIELDS {
            fields.remove(field);
        }

        let mut update = doc! { "$set": fields };
        if user.address.is_none() {
            update.insert("$unset", doc! { "address": "" });
        }

        let result = self
            .collection
            .update_one(doc! { "_id": user.id }, update)
            .await
            .map_err(|e| write_error(e, &user.email))?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("User {}", user.id.to_hex())));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, AppError> {
        Ok(self
            .collection
            .find_one(doc! { "_id": *id })
            .projection(without_password())
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .collection
            .find_one(doc! { "email": email })
            .projection(without_password())
            .await?)
    }

    async fn find_by_email_with_password(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    async fn find_by_role(&self, role: UserRole) -> Result<Vec<User>, AppError> {
        let cursor = self
            .collection
            .find(doc! { "role": role.as_str() })
            .projection(without_password())
            .await?;
        let users: Vec<User> = cursor.try_collect().await?;
        Ok(users)
    }

    async fn increment_stats(
        &self,
        id: &ObjectId,
        delta: &AuctionStatsDelta,
    ) -> Result<Option<User>, AppError> {
        let update = doc! {
            "$inc": {
                "auctionsWon": delta.auctions_won,
                "moneySpent": delta.money_spent,
                "unpaidCommission": delta.unpaid_commission,
            },
            "$set": { "updatedAt": BsonDateTime::now() },
        };

        Ok(self
            .collection
            .find_one_and_update(doc! { "_id": *id }, update)
            .projection(without_password())
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn deduct_unpaid_commission(
        &self,
        id: &ObjectId,
        amount: f64,
    ) -> Result<Option<User>, AppError> {
        let filter = doc! { "_id": *id, "unpaidCommission": { "$gte": amount } };
        let update = doc! {
            "$inc": { "unpaidCommission": -amount },
            "$set": { "updatedAt": BsonDateTime::now() },
        };

        let updated = self
            .collection
            .find_one_and_update(filter, update)
            .projection(without_password())
            .return_document(ReturnDocument::After)
            .await?;
        if updated.is_some() {
            return Ok(updated);
        }

        // no match: either the user is gone or the balance is too low
        match self.find_by_id(id).await? {
            Some(user) => Err(exceeds_balance(amount, user.unpaid_commission)),
            None => Ok(None),
        }
    }
}
