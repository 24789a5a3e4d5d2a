//! Per-request session context.
//!
//! Besides the optional tenant, a session carries capabilities: typed
//! handles a backend may look up to alter dispatch (routing keys, request
//! tags). A backend that finds no handle for a capability ignores it.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A capability a session may provide.
///
/// The implementing type is only a key; the handle is what backends read.
pub trait Capability: 'static {
    /// Value stored in the session for this capability.
    type Handle: Send + Sync + 'static;
}

/// Context of the request a query runs for.
#[derive(Clone, Default)]
pub struct SessionContext {
    tenant_id: Option<String>,
    capabilities: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl SessionContext {
    /// A session without tenant or capability.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts queries to the documents of a tenant.
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// The tenant, if any.
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    /// Provides capability `C`.
    pub fn with_capability<C: Capability>(mut self, handle: C::Handle) -> Self {
        self.capabilities.insert(TypeId::of::<C>(), Arc::new(handle));
        self
    }

    /// The handle of capability `C`, if provided.
    pub fn capability<C: Capability>(&self) -> Option<&C::Handle> {
        self.capabilities
            .get(&TypeId::of::<C>())
            .and_then(|handle| handle.downcast_ref::<C::Handle>())
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("tenant_id", &self.tenant_id)
            .field("capabilities", &self.capabilities.len())
            .finish()
    }
}
