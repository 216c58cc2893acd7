use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Collection holding user documents
pub const USERS_COLLECTION: &str = "User";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    Auctioneer,
    Bidder,
    #[serde(rename = "Super Admin")]
    SuperAdmin,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::Auctioneer, UserRole::Bidder, UserRole::SuperAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Auctioneer => "Auctioneer",
            UserRole::Bidder => "Bidder",
            UserRole::SuperAdmin => "Super Admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileImage {
    #[serde(default)]
    pub public_id: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankTransfer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_account_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifsc_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upi {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upi_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paypal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paypal_email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethods {
    #[serde(default)]
    pub bank_transfer: BankTransfer,
    #[serde(default)]
    pub upi: Upi,
    #[serde(default)]
    pub paypal: Paypal,
}

/// Know-Your-Customer identity details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aadhar_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_number: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
}

/// Document in the "User" collection.
///
/// The password is private: it holds plaintext only while
/// `is_password_modified()` is true, a bcrypt hash once saved, and `None`
/// when the record was read without it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub profile_image: ProfileImage,
    #[serde(default)]
    pub payment_methods: PaymentMethods,
    pub role: UserRole,
    #[serde(default)]
    pub kyc_details: KycDetails,
    #[serde(default)]
    pub unpaid_commission: f64,
    #[serde(default)]
    pub auctions_won: i64,
    #[serde(default)]
    pub money_spent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<BsonDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<BsonDateTime>,
    #[serde(skip)]
    is_new: bool,
    #[serde(skip)]
    password_modified: bool,
}

impl User {
    /// Builds an unsaved record from registration input whose role is already parsed
    pub(crate) fn from_new(new_user: NewUser, role: UserRole) -> Self {
        let password_modified = new_user.password.is_some();
        Self {
            id: ObjectId::new(),
            user_name: new_user.user_name.unwrap_or_default(),
            password: new_user.password,
            email: new_user.email.unwrap_or_default(),
            address: new_user.address,
            phone: new_user.phone.unwrap_or_default(),
            profile_image: new_user.profile_image,
            payment_methods: new_user.payment_methods,
            role,
            kyc_details: new_user.kyc_details,
            unpaid_commission: 0.0,
            auctions_won: 0,
            money_spent: 0.0,
            created_at: None,
            updated_at: None,
            is_new: true,
            password_modified,
        }
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Replaces the password with a new plaintext; it is hashed on the next save
    pub fn set_password(&mut self, plain: impl Into<String>) {
        self.password = Some(plain.into());
        self.password_modified = true;
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn is_password_modified(&self) -> bool {
        self.password_modified
    }

    pub(crate) fn store_password_hash(&mut self, hash: String) {
        self.password = Some(hash);
        self.password_modified = false;
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.is_new = false;
    }

    /// Drops the password, as a default read would return the record
    pub(crate) fn without_password(mut self) -> Self {
        self.password = None;
        self.password_modified = false;
        self
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self)
    }
}

/// Registration input, before validation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub profile_image: ProfileImage,
    #[serde(default)]
    pub payment_methods: PaymentMethods,
    pub role: Option<String>,
    #[serde(default)]
    pub kyc_details: KycDetails,
}

/// Partial profile change; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub profile_image: Option<ProfileImage>,
    pub password: Option<String>,
}

/// Increments applied atomically when an auction outcome settles
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AuctionStatsDelta {
    pub auctions_won: i64,
    pub money_spent: f64,
    pub unpaid_commission: f64,
}

/// Public view of a user, never carrying the password
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub user_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub phone: String,
    pub profile_image: ProfileImage,
    pub payment_methods: PaymentMethods,
    pub role: UserRole,
    pub kyc_details: KycDetails,
    pub unpaid_commission: f64,
    pub auctions_won: i64,
    pub money_spent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id.to_hex(),
            user_name: user.user_name.clone(),
            email: user.email.clone(),
            address: user.address.clone(),
            phone: user.phone.clone(),
            profile_image: user.profile_image.clone(),
            payment_methods: user.payment_methods.clone(),
            role: user.role,
            kyc_details: user.kyc_details.clone(),
            unpaid_commission: user.unpaid_commission,
            auctions_won: user.auctions_won,
            money_spent: user.money_spent,
            created_at: user.created_at.and_then(|d| d.try_to_rfc3339_string().ok()),
            updated_at: user.updated_at.and_then(|d| d.try_to_rfc3339_string().ok()),
        }
    }
}
