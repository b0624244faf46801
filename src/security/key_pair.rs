// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 签名密钥与令牌的签发、校验。
//!
//! 访问令牌和刷新令牌各用一套密钥。校验结果总是三种之一，不会 panic。

use crate::exception::Exception;

use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde_json::{Map, Value};

pub type Claims = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenVerification {
    Valid(Claims),
    Expired,
    Invalid,
}

impl TokenVerification {
    pub fn claims(self) -> Option<Claims> {
        match self {
            TokenVerification::Valid(claims) => Some(claims),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct KeyPair {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    /// HS256 对称密钥
    pub fn secret(secret: &[u8]) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// RS256 密钥对，私钥签名、公钥校验
    pub fn rsa_pem(private_pem: &[u8], public_pem: &[u8]) -> Result<Self, Exception> {
        let encoding = EncodingKey::from_rsa_pem(private_pem)
            .map_err(|e| Exception::InvalidKey(format!("RSA私钥: {}", e)))?;
        let decoding = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| Exception::InvalidKey(format!("RSA公钥: {}", e)))?;
        Ok(Self {
            algorithm: Algorithm::RS256,
            encoding,
            decoding,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// 写入 `exp = 当前时间 + ttl` 后签名。ttl 可以为负，用于构造已过期的令牌。
    pub fn create_token(&self, mut claims: Claims, ttl_seconds: i64) -> Result<String, Exception> {
        let exp = chrono::Utc::now().timestamp() + ttl_seconds;
        claims.insert("exp".to_string(), Value::from(exp));
        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| Exception::InvalidKey(format!("签发令牌失败: {}", e)))
    }

    pub fn decode_token(&self, token: &str) -> TokenVerification {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => TokenVerification::Valid(data.claims),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => TokenVerification::Expired,
            Err(e) => {
                debug!("令牌校验失败: {}", e);
                TokenVerification::Invalid
            }
        }
    }
}

/// 进程内共享的签名材料，启动时构建一次后以 `Arc` 传递
#[derive(Clone)]
pub struct KeyStore {
    access: KeyPair,
    refresh: KeyPair,
}

impl KeyStore {
    pub fn new(access: KeyPair, refresh: KeyPair) -> Self {
        Self { access, refresh }
    }

    pub fn create_access_token(&self, claims: Claims, ttl_seconds: i64) -> Result<String, Exception> {
        self.access.create_token(claims, ttl_seconds)
    }

    pub fn create_refresh_token(&self, claims: Claims, ttl_seconds: i64) -> Result<String, Exception> {
        self.refresh.create_token(claims, ttl_seconds)
    }

    pub fn decode_access_token(&self, token: &str) -> TokenVerification {
        self.access.decode_token(token)
    }

    pub fn decode_refresh_token(&self, token: &str) -> TokenVerification {
        self.refresh.decode_token(token)
    }
}
