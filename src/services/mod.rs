pub mod auth_service;
pub mod password_service;
pub mod token_service;
pub mod user_service;
pub mod validation;

pub use password_service::*;
pub use token_service::*;
pub use user_service::*;
pub use validation::*;
