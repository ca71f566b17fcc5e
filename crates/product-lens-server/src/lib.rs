//! product-lens server: HTTP entry point and configuration resolution
//! for the product-lens resolver.

pub mod config;
pub mod rest;
