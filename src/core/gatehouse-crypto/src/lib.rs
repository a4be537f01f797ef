//! # Gatehouse Crypto
//!
//! Cryptographic primitives behind Gatehouse tokens.
//!
//! This crate provides:
//! - Application secret handling with automatic zeroization
//! - Salted signing-key derivation (HKDF-SHA256)
//! - A timestamping HMAC-SHA256 signer producing URL-safe tokens
//! - Secure random generation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod kdf;
pub mod keys;
pub mod random;
pub mod signer;

pub use error::CryptoError;
pub use keys::SecretKey;
pub use signer::TimestampSigner;
