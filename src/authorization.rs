use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::errors::problem::Problem;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
        pub sub: String,
        exp: usize,
}

struct CachedTokenData {
        data: TokenData<Claims>,
        expires_at: Instant,
}

lazy_static! {
        static ref TOKEN_CACHE: Arc<RwLock<HashMap<(String, String), CachedTokenData>>> =
                Arc::new(RwLock::new(HashMap::new()));
}

pub fn sign_token(user_id: i64, secret: &str, ttl: Duration) -> Result<String, Problem> {
        let exp = (SystemTime::now() + ttl)
                .duration_since(UNIX_EPOCH)
                .map(|since_epoch| since_epoch.as_secs() as usize)
                .map_err(|_| Problem::InternalServerError("failed to sign token".to_string()))?;

        encode(
                &Header::new(Algorithm::HS256),
                &Claims {
                        sub: user_id.to_string(),
                        exp,
                },
                &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|err| {
                error!("failed to sign token: {}", err);
                Problem::InternalServerError("failed to sign token".to_string())
        })
}

fn decode_token(token: &str, secret: &str) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
        decode::<Claims>(
                token,
                &DecodingKey::from_secret(secret.as_bytes()),
                &Validation::new(Algorithm::HS256),
        )
}

pub async fn get_cached_token_data(
        token: &str,
        secret: &str,
) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
        let key = (secret.to_string(), token.to_string());

        let cache = TOKEN_CACHE.read().await;
        if let Some(cached_data) = cache.get(&key) {
                if Instant::now() < cached_data.expires_at {
                        return Ok(cached_data.data.clone());
                }
        }
        drop(cache);

        debug!("decoding token");
        let token_data = decode_token(token, secret)?;
        let expires_at = UNIX_EPOCH + Duration::from_secs(token_data.claims.exp as u64);
        let expires_at = Instant::now()
                + expires_at
                        .duration_since(SystemTime::now())
                        .unwrap_or(Duration::from_secs(0));

        let mut cache = TOKEN_CACHE.write().await;
        cache.retain(|_, cached_data| Instant::now() < cached_data.expires_at);
        cache.insert(
                key,
                CachedTokenData {
                        data: token_data.clone(),
                        expires_at,
                },
        );
        Ok(token_data)
}
