//! API-side authorization guard.
//!
//! Enforced at the command boundary (before dispatch) and on reads, so the
//! domain crates and infra stay auth-agnostic.

use glowdesk_auth::{AuthzError, CommandAuthorization, Permission, Principal, authorize};

use crate::context::{PrincipalContext, TenantContext};

fn principal(tenant: &TenantContext, principal: &PrincipalContext) -> Principal {
    Principal::from_roles(principal.user_id(), tenant.tenant_id(), principal.roles().to_vec())
}

/// Check every permission a command requires. Call before dispatching it.
pub fn authorize_command<C: CommandAuthorization>(
    tenant: &TenantContext,
    principal_ctx: &PrincipalContext,
    command: &C,
) -> Result<(), AuthzError> {
    let p = principal(tenant, principal_ctx);
    for perm in command.required_permissions() {
        authorize(&p, perm)?;
    }
    Ok(())
}

/// Check a single permission (reads and non-event-sourced writes).
pub fn require(
    tenant: &TenantContext,
    principal_ctx: &PrincipalContext,
    permission: &Permission,
) -> Result<(), AuthzError> {
    authorize(&principal(tenant, principal_ctx), permission)
}
