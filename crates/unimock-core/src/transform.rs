//! Transformation hooks
//!
//! Hooks are plain function values attached to a section by an embedding
//! program at startup; they never appear on the YAML surface. Request hooks
//! run before a resource is written to the store, response hooks before the
//! response bytes are assembled. A hook error aborts the request.
//!
//! Hooks run outside the store lock, so user code cannot deadlock the
//! server.

use crate::store::Resource;
use crate::Result;
use std::sync::Arc;

/// A hook rewriting a resource, or failing the request
pub type TransformFn = Arc<dyn Fn(Resource) -> Result<Resource> + Send + Sync>;

/// Ordered request and response hook chains for one section
#[derive(Clone, Default)]
pub struct Transformations {
    request: Vec<TransformFn>,
    response: Vec<TransformFn>,
}

impl Transformations {
    /// No hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request hook; hooks run in registration order.
    pub fn add_request<F>(&mut self, hook: F)
    where
        F: Fn(Resource) -> Result<Resource> + Send + Sync + 'static,
    {
        self.request.push(Arc::new(hook));
    }

    /// Append a response hook; hooks run in registration order.
    pub fn add_response<F>(&mut self, hook: F)
    where
        F: Fn(Resource) -> Result<Resource> + Send + Sync + 'static,
    {
        self.response.push(Arc::new(hook));
    }

    /// Run the request chain.
    pub fn apply_request(&self, resource: Resource) -> Result<Resource> {
        Self::apply(&self.request, resource)
    }

    /// Run the response chain.
    pub fn apply_response(&self, resource: Resource) -> Result<Resource> {
        Self::apply(&self.response, resource)
    }

    /// Whether any response hooks are registered.
    pub fn has_response_hooks(&self) -> bool {
        !self.response.is_empty()
    }

    fn apply(chain: &[TransformFn], mut resource: Resource) -> Result<Resource> {
        for hook in chain {
            resource = hook(resource)?;
        }
        Ok(resource)
    }
}

impl std::fmt::Debug for Transformations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformations")
            .field("request", &self.request.len())
            .field("response", &self.response.len())
            .finish()
    }
}
