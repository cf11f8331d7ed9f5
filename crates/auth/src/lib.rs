//! `glowdesk-auth`: authentication and authorization boundary.
//!
//! Decoupled from HTTP and storage. The API decodes a bearer token with a
//! `JwtValidator`, derives a `Principal` for the business named in the token,
//! and checks permissions before dispatching any command.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod roles;

pub use authorize::{AuthzError, CommandAuthorization, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::Permission;
pub use roles::{Role, permissions_for_roles};
