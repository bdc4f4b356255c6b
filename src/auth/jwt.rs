use chrono::Duration;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, TokenData, Validation, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub exp: i64,
}

pub fn generate_token<K: AsRef<[u8]>>(
    claims: UserClaims,
    key: K,
) -> jsonwebtoken::errors::Result<String> {
    let header = Header::default();
    let key = EncodingKey::from_secret(key.as_ref());

    let token = jsonwebtoken::encode(&header, &claims, &key)?;
    Ok(token)
}

/// Signs a token for `user_id` valid for `ttl_days` from now. A lifetime
/// past chrono's range is rejected as an invalid token.
pub fn issue_token<K: AsRef<[u8]>>(
    user_id: Uuid,
    key: K,
    ttl_days: i64,
) -> jsonwebtoken::errors::Result<String> {
    let exp = Duration::try_days(ttl_days)
        .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
        .ok_or(ErrorKind::InvalidToken)?;
    let claims = UserClaims {
        sub: user_id.to_string(),
        exp: exp.timestamp(),
    };
    generate_token(claims, key)
}

pub fn process_token<K: AsRef<[u8]>>(
    token: &str,
    key: K,
) -> jsonwebtoken::errors::Result<TokenData<UserClaims>> {
    let validation = Validation::default();
    let key = DecodingKey::from_secret(key.as_ref());

    let claims = jsonwebtoken::decode::<UserClaims>(token, &key, &validation)?;
    Ok(claims)
}
