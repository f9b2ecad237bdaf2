mod strategy;

pub use strategy::{RetryConfig, RetryError, RetryStrategy};
