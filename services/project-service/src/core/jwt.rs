// /project-management/services/project-service/src/core/jwt.rs

use jsonwebtoken::{
    decode, decode_header,
    jwk::{AlgorithmParameters, Jwk, JwkSet},
    Algorithm, DecodingKey, Validation,
};
use serde::Deserialize;
use std::{
    collections::{BTreeSet, HashMap},
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use crate::{
    config::SecurityConfig,
    utils::error::{AppError, AppResult},
};

const JWKS_CACHE_TTL: Duration = Duration::from_secs(300);
const JWKS_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
const LEEWAY_SECONDS: u64 = 60;

pub const INVALID_TOKEN_MESSAGE: &str = "JWT token is invalid or expired.";

/// Authenticated caller extracted from a validated bearer token
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub subject: String,
    pub username: Option<String>,
    pub roles: Vec<String>,
    pub token: String,
}

impl Principal {
    /// Principal used for every request when authentication is disabled
    pub fn anonymous() -> Self {
        Self {
            subject: "anonymous".to_string(),
            username: None,
            roles: Vec::new(),
            token: String::new(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Token to forward to downstream services, if any
    pub fn bearer(&self) -> Option<&str> {
        if self.token.is_empty() {
            None
        } else {
            Some(&self.token)
        }
    }
}

// ===== CLAIMS =====

#[derive(Debug, Default, Deserialize)]
struct RoleClaim {
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    sub: Option<String>,
    preferred_username: Option<String>,
    realm_access: Option<RoleClaim>,
    #[serde(default)]
    resource_access: HashMap<String, RoleClaim>,
}

// ===== KEY CACHE =====

#[derive(Default)]
struct KeyCache {
    keys: Option<JwkSet>,
    fetched_at: Option<Instant>,
    last_attempt: Option<Instant>,
}

impl KeyCache {
    fn is_stale(&self) -> bool {
        self.fetched_at
            .map(|at| at.elapsed() >= JWKS_CACHE_TTL)
            .unwrap_or(true)
    }

    fn may_refresh(&self) -> bool {
        self.last_attempt
            .map(|at| at.elapsed() >= JWKS_MIN_REFRESH_INTERVAL)
            .unwrap_or(true)
    }

    fn lookup(&self, kid: Option<&str>, alg: Algorithm) -> Option<Jwk> {
        let keys = self.keys.as_ref()?;
        match kid {
            Some(kid) => keys.find(kid).cloned(),
            None => keys.keys.iter().find(|k| key_supports(k, alg)).cloned(),
        }
    }
}

/// Validates bearer tokens against the identity provider's JWK set
pub struct JwksVerifier {
    client: reqwest::Client,
    jwk_set_uri: String,
    issuer: Option<String>,
    audience: Option<String>,
    client_id: String,
    cache: RwLock<KeyCache>,
}

impl JwksVerifier {
    pub fn new(config: &SecurityConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build JWKS client: {}", e)))?;

        Ok(Self {
            client,
            jwk_set_uri: config.jwk_set_uri.clone(),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            client_id: config.client_id.clone(),
            cache: RwLock::new(KeyCache::default()),
        })
    }

    /// Verify signature, expiry and the configured issuer/audience
    pub async fn verify(&self, token: &str) -> AppResult<Principal> {
        let header = decode_header(token)
            .map_err(|e| invalid_token(format!("Malformed token header: {}", e)))?;

        let jwk = self.resolve_key(header.kid.as_deref(), header.alg).await?;
        if !key_supports(&jwk, header.alg) {
            return Err(invalid_token(format!(
                "Algorithm {:?} does not match the signing key type",
                header.alg
            )));
        }

        let key = DecodingKey::from_jwk(&jwk)
            .map_err(|e| invalid_token(format!("Unusable signing key: {}", e)))?;

        let mut validation = Validation::new(header.alg);
        validation.validate_exp = true;
        validation.leeway = LEEWAY_SECONDS;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let claims = decode::<TokenClaims>(token, &key, &validation)
            .map_err(|e| invalid_token(e.to_string()))?
            .claims;

        Ok(self.principal_from(claims, token))
    }

    fn principal_from(&self, claims: TokenClaims, token: &str) -> Principal {
        let mut roles: BTreeSet<String> = claims
            .realm_access
            .map(|r| r.roles.into_iter().collect())
            .unwrap_or_default();

        let mut resource_access = claims.resource_access;
        if let Some(client) = resource_access.remove(&self.client_id) {
            roles.extend(client.roles);
        }

        Principal {
            subject: claims.sub.unwrap_or_default(),
            username: claims.preferred_username,
            roles: roles.into_iter().collect(),
            token: token.to_string(),
        }
    }

    async fn resolve_key(&self, kid: Option<&str>, alg: Algorithm) -> AppResult<Jwk> {
        {
            let cache = self.cache.read().await;
            if !cache.is_stale() {
                if let Some(jwk) = cache.lookup(kid, alg) {
                    return Ok(jwk);
                }
            }
        }

        let mut cache = self.cache.write().await;
        // Another request may have refreshed while we waited for the lock
        if !cache.is_stale() {
            if let Some(jwk) = cache.lookup(kid, alg) {
                return Ok(jwk);
            }
        }

        if cache.may_refresh() {
            cache.last_attempt = Some(Instant::now());
            match self.fetch_jwk_set().await {
                Ok(keys) => {
                    tracing::debug!("Loaded {} signing keys from {}", keys.keys.len(), self.jwk_set_uri);
                    cache.keys = Some(keys);
                    cache.fetched_at = Some(Instant::now());
                }
                Err(e) if cache.keys.is_some() => {
                    tracing::warn!("JWKS refresh failed, keeping cached keys: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        if cache.keys.is_none() {
            return Err(AppError::AuthProviderUnavailable);
        }

        cache.lookup(kid, alg).ok_or_else(|| {
            invalid_token(format!("No signing key found for kid '{}'", kid.unwrap_or("none")))
        })
    }

    async fn fetch_jwk_set(&self) -> AppResult<JwkSet> {
        let response = self.client.get(&self.jwk_set_uri).send().await.map_err(|e| {
            tracing::warn!("JWKS endpoint unreachable: {}", e);
            AppError::AuthProviderUnavailable
        })?;

        if !response.status().is_success() {
            tracing::warn!("JWKS endpoint responded with {}", response.status());
            return Err(AppError::AuthProviderUnavailable);
        }

        response.json::<JwkSet>().await.map_err(|e| {
            tracing::warn!("JWKS response could not be parsed: {}", e);
            AppError::AuthProviderUnavailable
        })
    }
}

fn key_supports(jwk: &Jwk, alg: Algorithm) -> bool {
    use Algorithm::*;

    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => matches!(alg, RS256 | RS384 | RS512 | PS256 | PS384 | PS512),
        AlgorithmParameters::EllipticCurve(_) => matches!(alg, ES256 | ES384),
        AlgorithmParameters::OctetKey(_) => matches!(alg, HS256 | HS384 | HS512),
        AlgorithmParameters::OctetKeyPair(_) => alg == EdDSA,
    }
}

pub fn invalid_token(details: impl Into<String>) -> AppError {
    AppError::Unauthorized {
        message: INVALID_TOKEN_MESSAGE.to_string(),
        details: Some(details.into()),
    }
}
