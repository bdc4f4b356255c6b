use argon2::password_hash::rand_core::{OsRng, RngCore};

use crate::web::UserRole;

/// Students get six digits, teachers four, admins an `ADMIN` prefix.
pub fn generate_registration_number(role: &UserRole) -> String {
    let n = OsRng.next_u32();
    match role {
        UserRole::Student => (100_000 + n % 900_000).to_string(),
        UserRole::Teacher => (1_000 + n % 9_000).to_string(),
        UserRole::Admin => format!("ADMIN{}", 1_000 + n % 9_000),
    }
}
