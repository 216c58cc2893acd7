//! User accounts for the auction platform: the `User` record with its
//! validation rules, bcrypt password hashing on the write path, and JWT
//! issuance for authenticated users.

pub mod config;
pub mod database;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{DatabaseConfig, JwtConfig};
pub use database::{MemoryUserStore, MongoDB, MongoUserStore, UserStore};
pub use models::{NewUser, User, UserProfile, UserRole};
pub use utils::{AppError, ValidationErrors};
