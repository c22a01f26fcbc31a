//! Pre-send and post-send extension points.
//!
//! Hooks are registered on one [`RestClient`](crate::RestClient) instance and
//! run in priority order, highest first. Registrations with equal priority run
//! in the order they were added.

use crate::error::Result;
use crate::request::{HttpRequest, RequestSpec};
use crate::response::HttpResponse;
use crate::transport::Transport;
use std::sync::Arc;

/// Priority used by authentication hooks.
pub const AUTH_PRIORITY: i32 = 100;

/// Everything a pre-send hook may read besides the outgoing request.
pub struct SendContext<'a> {
    /// The call as the caller issued it
    pub spec: &'a RequestSpec,
    /// Transport of the dispatching client, for hooks that need their own
    /// exchanges (credential handshakes)
    pub transport: &'a dyn Transport,
}

/// Runs before the request is transmitted and may modify it.
///
/// An error aborts the call before anything is sent.
pub trait PreSendHook: Send + Sync {
    fn before_send(&self, request: &mut HttpRequest, ctx: &SendContext<'_>) -> Result<()>;
}

impl<F> PreSendHook for F
where
    F: Fn(&mut HttpRequest, &SendContext<'_>) -> Result<()> + Send + Sync,
{
    fn before_send(&self, request: &mut HttpRequest, ctx: &SendContext<'_>) -> Result<()> {
        self(request, ctx)
    }
}

/// Observes the exchange after the response arrived.
pub trait PostSendHook: Send + Sync {
    fn after_send(&self, request: &HttpRequest, response: &HttpResponse);
}

impl<F> PostSendHook for F
where
    F: Fn(&HttpRequest, &HttpResponse) + Send + Sync,
{
    fn after_send(&self, request: &HttpRequest, response: &HttpResponse) {
        self(request, response)
    }
}

/// Handle returned on registration, used to remove the hook again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

struct Registered<H: ?Sized> {
    id: HookId,
    priority: i32,
    hook: Arc<H>,
}

fn insert_ordered<H: ?Sized>(list: &mut Vec<Registered<H>>, entry: Registered<H>) {
    let pos = list
        .iter()
        .position(|r| r.priority < entry.priority)
        .unwrap_or(list.len());
    list.insert(pos, entry);
}

#[derive(Default)]
pub(crate) struct HookRegistry {
    next_id: u64,
    pre_send: Vec<Registered<dyn PreSendHook>>,
    post_send: Vec<Registered<dyn PostSendHook>>,
}

impl HookRegistry {
    fn next_id(&mut self) -> HookId {
        self.next_id += 1;
        HookId(self.next_id)
    }

    pub(crate) fn add_pre_send(&mut self, priority: i32, hook: Arc<dyn PreSendHook>) -> HookId {
        let id = self.next_id();
        insert_ordered(&mut self.pre_send, Registered { id, priority, hook });
        id
    }

    pub(crate) fn add_post_send(&mut self, priority: i32, hook: Arc<dyn PostSendHook>) -> HookId {
        let id = self.next_id();
        insert_ordered(&mut self.post_send, Registered { id, priority, hook });
        id
    }

    /// Returns false when no hook with this id is registered
    pub(crate) fn remove(&mut self, id: HookId) -> bool {
        let before = self.pre_send.len() + self.post_send.len();
        self.pre_send.retain(|r| r.id != id);
        self.post_send.retain(|r| r.id != id);
        before != self.pre_send.len() + self.post_send.len()
    }

    pub(crate) fn contains(&self, id: HookId) -> bool {
        self.pre_send.iter().any(|r| r.id == id) || self.post_send.iter().any(|r| r.id == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.pre_send.len() + self.post_send.len()
    }

    pub(crate) fn run_pre_send(&self, request: &mut HttpRequest, ctx: &SendContext<'_>) -> Result<()> {
        for registered in &self.pre_send {
            registered.hook.before_send(request, ctx)?;
        }
        Ok(())
    }

    pub(crate) fn run_post_send(&self, request: &HttpRequest, response: &HttpResponse) {
        for registered in &self.post_send {
            registered.hook.after_send(request, response);
        }
    }
}
