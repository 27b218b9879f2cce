//! Authentication and authorization for Showroom
//!
//! Provides:
//! - JWT token generation and validation
//! - Password hashing with Argon2
//! - Permission levels for operation authorization

pub mod jwt;
pub mod password;
pub mod permissions;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput};
pub use password::{hash_password, verify_password};
pub use permissions::PermissionLevel;
