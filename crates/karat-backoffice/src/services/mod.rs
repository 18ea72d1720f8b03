//! # Back-Office Services
//!
//! One service per operational area. Every public method takes a
//! [`Session`](karat_core::Session) and checks exactly one permission
//! before touching the store.

pub mod emi;
pub mod orders;
pub mod payments;
pub mod pricing;
pub mod rates;
pub mod stock;
