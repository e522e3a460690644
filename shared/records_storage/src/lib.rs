//! Storage layer for the records service
//!
//! Entity models, the partitioned document store client and the item and employee
//! repositories built on top of it.

pub mod employee;
pub mod error;
pub mod item;
pub mod store;
