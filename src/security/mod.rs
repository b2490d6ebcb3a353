//! Request guards applied in front of the API.

pub mod rate_limit;
