// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

pub mod jwt;
pub mod key_pair;

pub use jwt::{
    unauthorized, Authentication, ClaimsPresent, JwtTokenAuth, JwtTokenFactory, OnFail, TokenAuthenticator,
    TokenValidator, DEFAULT_TOKEN_EXPIRATION,
};
pub use key_pair::{Claims, KeyPair, KeyStore, TokenVerification};
