use crate::{
    database::UserStore,
    models::{
        AuctionStatsDelta, KycDetails, NewUser, PaymentMethods, ProfileUpdate, User, UserProfile,
        UserRole,
    },
    services::{
        password_service::hash_password_if_modified,
        validation::{build_user, validate_user},
    },
    utils::AppError,
};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};

/// Write path for every user change: validate, hash a changed password, stamp
/// timestamps, then insert or update.
pub async fn save_user(store: &dyn UserStore, user: &mut User) -> Result<(), AppError> {
    validate_user(user)?;
    hash_password_if_modified(user).await?;

    let now = BsonDateTime::now();
    if user.is_new() {
        user.created_at = Some(now);
        user.updated_at = Some(now);
        store.insert(user).await?;
        user.mark_persisted();
    } else {
        user.updated_at = Some(now);
        store.update(user).await?;
    }
    Ok(())
}

/// Validates registration input and stores the new user
pub async fn create_user(store: &dyn UserStore, new_user: NewUser) -> Result<User, AppError> {
    let mut user = build_user(new_user)?;
    save_user(store, &mut user).await?;
    log::info!("✅ User created: {} ({})", user.id.to_hex(), user.role);
    Ok(user)
}

pub async fn find_user(store: &dyn UserStore, id: &ObjectId) -> Result<User, AppError> {
    store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", id.to_hex())))
}

pub async fn update_profile(
    store: &dyn UserStore,
    id: &ObjectId,
    update: ProfileUpdate,
) -> Result<User, AppError> {
    let mut user = find_user(store, id).await?;

    if let Some(user_name) = update.user_name {
        user.user_name = user_name;
    }
    if let Some(email) = update.email {
        user.email = email;
    }
    if let Some(address) = update.address {
        user.address = Some(address).filter(|a| !a.is_empty());
    }
    if let Some(phone) = update.phone {
        user.phone = phone;
    }
    if let Some(profile_image) = update.profile_image {
        user.profile_image = profile_image;
    }
    let password_changed = update.password.is_some();
    if let Some(password) = update.password {
        user.set_password(password);
    }

    save_user(store, &mut user).await?;
    if password_changed {
        log::info!("🔑 Password changed for user {}", id.to_hex());
    }
    Ok(user.without_password())
}

pub async fn update_payment_methods(
    store: &dyn UserStore,
    id: &ObjectId,
    payment_methods: PaymentMethods,
) -> Result<User, AppError> {
    let mut user = find_user(store, id).await?;
    user.payment_methods = payment_methods;
    save_user(store, &mut user).await?;
    Ok(user)
}

/// Replaces the KYC document numbers; changed numbers need verifying again
pub async fn update_kyc(
    store: &dyn UserStore,
    id: &ObjectId,
    kyc: KycDetails,
) -> Result<User, AppError> {
    let mut user = find_user(store, id).await?;

    let numbers_changed = user.kyc_details.aadhar_number != kyc.aadhar_number
        || user.kyc_details.pan_number != kyc.pan_number;
    let is_verified = user.kyc_details.is_verified && !numbers_changed;

    user.kyc_details = KycDetails {
        aadhar_number: kyc.aadhar_number,
        pan_number: kyc.pan_number,
        is_verified,
    };
    save_user(store, &mut user).await?;
    Ok(user)
}

pub async fn set_kyc_verified(
    store: &dyn UserStore,
    id: &ObjectId,
    verified: bool,
) -> Result<User, AppError> {
    let mut user = find_user(store, id).await?;
    user.kyc_details.is_verified = verified;
    save_user(store, &mut user).await?;
    log::info!("🪪 KYC for user {} marked verified={}", id.to_hex(), verified);
    Ok(user)
}

fn check_amount(amount: f64) -> Result<(), AppError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::InvalidRequest(format!(
            "Amount must be a non-negative number, got {}",
            amount
        )));
    }
    Ok(())
}

async fn apply_stats(
    store: &dyn UserStore,
    id: &ObjectId,
    delta: AuctionStatsDelta,
) -> Result<User, AppError> {
    store
        .increment_stats(id, &delta)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", id.to_hex())))
}

/// Counts a won auction and the amount paid for it
pub async fn record_auction_win(
    store: &dyn UserStore,
    id: &ObjectId,
    amount_paid: f64,
) -> Result<User, AppError> {
    check_amount(amount_paid)?;
    apply_stats(
        store,
        id,
        AuctionStatsDelta {
            auctions_won: 1,
            money_spent: amount_paid,
            unpaid_commission: 0.0,
        },
    )
    .await
}

/// Adds commission an auctioneer owes the platform
pub async fn add_unpaid_commission(
    store: &dyn UserStore,
    id: &ObjectId,
    amount: f64,
) -> Result<User, AppError> {
    check_amount(amount)?;
    apply_stats(
        store,
        id,
        AuctionStatsDelta {
            unpaid_commission: amount,
            ..Default::default()
        },
    )
    .await
}

/// Pays down unpaid commission; the balance check and the deduction are one
/// atomic store operation
pub async fn settle_commission(
    store: &dyn UserStore,
    id: &ObjectId,
    amount: f64,
) -> Result<User, AppError> {
    check_amount(amount)?;
    let user = store
        .deduct_unpaid_commission(id, amount)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", id.to_hex())))?;
    log::info!(
        "💰 Commission of {} settled for user {}, {} still unpaid",
        amount,
        id.to_hex(),
        user.unpaid_commission
    );
    Ok(user)
}

pub async fn list_users_by_role(
    store: &dyn UserStore,
    role: UserRole,
) -> Result<Vec<UserProfile>, AppError> {
    let users = store.find_by_role(role).await?;
    Ok(users.iter().map(UserProfile::from).collect())
}
