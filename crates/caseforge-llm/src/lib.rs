//! # caseforge-llm
//!
//! The remote-call layer of CaseForge: everything between a stage's prompt
//! and the Gemini API.
//!
//! - **Provider boundary**: [`Provider`] trait, [`GenerationRequest`],
//!   [`ProviderError`]
//! - **Gemini client**: [`GeminiProvider`] (non-streaming `generateContent`)
//! - **Fingerprinting**: [`fingerprint`] — canonical-JSON SHA-256 cache keys
//! - **Response cache**: [`ResponseCache`] — content-addressed disk cache
//!   with lazy TTL expiry
//! - **Rate limiter**: [`RateLimiter`] — sliding window plus minimum spacing
//! - **Invoker**: [`Invoker`] — cache → limiter → provider-with-retry
//!
//! [`fingerprint`]: fingerprint::fingerprint

#![deny(unsafe_code)]

pub mod cache;
pub mod fingerprint;
pub mod gemini;
pub mod invoker;
pub mod limiter;
pub mod provider;

pub use cache::{CacheStats, ResponseCache};
pub use gemini::GeminiProvider;
pub use invoker::{Generation, InvokeError, Invoker};
pub use limiter::{AcquireError, RateLimiter};
pub use provider::{GenerationOptions, GenerationRequest, Provider, ProviderError};
