//! `glowdesk-core`: domain foundation building blocks.
//!
//! Identifiers, the domain error model and the aggregate contract shared by
//! every business module. This crate contains **pure domain** primitives (no
//! infrastructure concerns).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, StoreId, TenantId, UserId};
pub use value_object::ValueObject;
