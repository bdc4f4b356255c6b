mod password;
pub use password::{hash_password, verify_password};
mod jwt;
pub use jwt::{UserClaims, generate_token, issue_token, process_token};
mod error;
pub use error::{CryptError, CryptResult};
mod registration;
pub use registration::generate_registration_number;
