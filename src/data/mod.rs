//! Data domain: text preparation ahead of vectorization.

pub mod normalize;

pub use normalize::normalize;
