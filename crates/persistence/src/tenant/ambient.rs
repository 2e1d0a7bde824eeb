//! Task-local tenant context.
//!
//! Passing [`TenantContext`] explicitly is the primary API. This module exists
//! for call paths that cannot thread it through (middleware wrapping a handler,
//! for example). The context lives in a tokio task-local, so it is bound to
//! one task and disappears when the scoped future completes. There is no
//! process-wide slot to overwrite.

use std::future::Future;

use super::context::TenantContext;

tokio::task_local! {
    static CURRENT: TenantContext;
}

/// Runs `future` with `ctx` as the ambient tenant context.
///
/// ```
/// use orbis_persistence::tenant::{ambient, TenantContext, TenantId};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let seen = ambient::scope(TenantContext::new(TenantId::new("acme")), async {
///     ambient::current().tenant_id().cloned()
/// })
/// .await;
/// assert_eq!(seen, Some(TenantId::new("acme")));
/// # });
/// ```
pub async fn scope<F>(ctx: TenantContext, future: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(ctx, future).await
}

/// Returns a copy of the ambient context.
///
/// Outside of [`scope`] this is [`TenantContext::anonymous`], so a query issued
/// from an unscoped task fails closed.
pub fn current() -> TenantContext {
    CURRENT
        .try_with(TenantContext::clone)
        .unwrap_or_else(|_| TenantContext::anonymous())
}

/// Returns `true` if the current task runs inside [`scope`].
pub fn is_scoped() -> bool {
    CURRENT.try_with(|_| ()).is_ok()
}
