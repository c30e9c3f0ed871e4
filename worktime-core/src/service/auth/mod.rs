pub mod jwt;
pub mod password;
pub mod validator;

pub use jwt::{Claims, IssuedToken, JwtService};
pub use password::{hash_password, validate_password, verify_password, MAX_PASSWORD_LEN, MIN_PASSWORD_LEN};
pub use validator::JwtValidator;
