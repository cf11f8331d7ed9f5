//! Built-in workflow action handlers backed by the outboxes.

use std::sync::Arc;

use uuid::Uuid;

use glowdesk_workflows::{ActionContext, ActionError, ActionRegistry, WorkflowAction, WorkflowType};

use crate::workflows::outbox::{
    Audience, ManagerEmail, Notification, Outboxes, PurchaseRequest, reorder_quantity,
};

fn headline(ctx: &ActionContext<'_>) -> String {
    match ctx.workflow_type {
        WorkflowType::EmergencyRestock => format!("Out of stock: {}", ctx.snapshot.name),
        WorkflowType::StockAlert => format!("Low stock: {}", ctx.snapshot.name),
    }
}

fn detail(ctx: &ActionContext<'_>) -> String {
    format!(
        "{} has {} on hand (threshold {}).",
        ctx.snapshot.name, ctx.snapshot.quantity_on_hand, ctx.snapshot.low_stock_threshold
    )
}

fn notify(outboxes: &Outboxes, ctx: &ActionContext<'_>, audience: Audience) -> Result<String, ActionError> {
    let note = Notification {
        notification_id: Uuid::now_v7(),
        tenant_id: ctx.snapshot.tenant_id,
        audience,
        title: headline(ctx),
        message: detail(ctx),
        item_id: Some(ctx.snapshot.item_id),
        execution_id: Some(ctx.execution_id),
        created_at: ctx.now,
    };
    let id = note.notification_id;
    if !outboxes.notifications.push(ctx.snapshot.tenant_id, note) {
        return Err(ActionError::failed("notification outbox unavailable"));
    }
    Ok(format!("notification {id} recorded"))
}

/// Registry with a handler for every `WorkflowAction`.
pub fn builtin_registry(outboxes: Arc<Outboxes>) -> ActionRegistry {
    let mut registry = ActionRegistry::new();

    let o = outboxes.clone();
    registry.register_handler(WorkflowAction::SendNotification, move |ctx| notify(&o, ctx, Audience::Staff));

    let o = outboxes.clone();
    registry.register_handler(WorkflowAction::NotifyManager, move |ctx| notify(&o, ctx, Audience::Manager));

    let o = outboxes.clone();
    registry.register_handler(WorkflowAction::EmailManager, move |ctx| {
        let email = ManagerEmail {
            email_id: Uuid::now_v7(),
            tenant_id: ctx.snapshot.tenant_id,
            subject: headline(ctx),
            body: format!("{} Rule: {}.", detail(ctx), ctx.rule.name),
            execution_id: ctx.execution_id,
            queued_at: ctx.now,
        };
        let id = email.email_id;
        if !o.emails.push(ctx.snapshot.tenant_id, email) {
            return Err(ActionError::failed("email outbox unavailable"));
        }
        Ok(format!("email {id} queued"))
    });

    let o = outboxes;
    registry.register_handler(WorkflowAction::CreatePurchaseOrder, move |ctx| {
        let quantity = reorder_quantity(ctx.snapshot.quantity_on_hand, ctx.snapshot.low_stock_threshold);
        let request = PurchaseRequest {
            request_id: Uuid::now_v7(),
            tenant_id: ctx.snapshot.tenant_id,
            item_id: ctx.snapshot.item_id,
            store_id: ctx.snapshot.store_id,
            item_name: ctx.snapshot.name.clone(),
            quantity,
            execution_id: ctx.execution_id,
            created_at: ctx.now,
        };
        if !o.purchase_requests.push(ctx.snapshot.tenant_id, request) {
            return Err(ActionError::failed("purchase request outbox unavailable"));
        }
        Ok(format!("purchase request for {quantity} units"))
    });

    registry
}
