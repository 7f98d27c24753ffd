//! Token verification for requests authenticated by the external identity
//! provider.

pub mod jwt;
