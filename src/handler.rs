//! Handler collaborator interface.
//!
//! `auto` and `handler` scopes resolve through a collaborator the
//! caller may supply. The core holds no registry of its own: absent a
//! collaborator, `auto` degrades to `main` and `handler` fails with
//! [`crate::ExtractError::HandlerUnavailable`].

use crate::scope::Scope;

/// A handler matched for a URL: the handler's id and the scope it
/// prescribes.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerMatch {
    pub id: String,
    pub scope: Scope,
}

/// Collaborator that maps URLs and handler ids to scopes.
pub trait HandlerLookup {
    /// Find a handler for a page URL, for `auto` scope resolution.
    fn lookup_url(&self, url: &str) -> Option<HandlerMatch>;

    /// Resolve a handler id to its scope, for `handler` scopes.
    fn lookup_id(&self, id: &str) -> Option<Scope>;
}
