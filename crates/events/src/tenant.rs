use glowdesk_core::TenantId;

use crate::{EventEnvelope, RowChange};

/// Messages that belong to exactly one business.
///
/// Workers pinned to a business use this to drop messages for other tenants.
pub trait TenantScoped {
    fn tenant_id(&self) -> TenantId;
}

impl<E> TenantScoped for EventEnvelope<E> {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id()
    }
}

impl TenantScoped for RowChange {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
