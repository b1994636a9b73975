//! Session → cart binding.
//!
//! One active cart id per session; absence means the session has no cart
//! yet. The capability is handed to the resolver explicitly — there is no
//! process-wide session singleton.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use trolley_core::{CartId, SessionId, StoreError};

/// Key-value binding between an opaque session handle and its cart.
pub trait SessionStore: Send + Sync {
    fn get_cart_id(&self, session: &SessionId) -> Result<Option<CartId>, StoreError>;

    fn bind_cart_id(&self, session: &SessionId, cart_id: CartId) -> Result<(), StoreError>;

    fn unbind_cart_id(&self, session: &SessionId) -> Result<(), StoreError>;
}

impl<S> SessionStore for Arc<S>
where
    S: SessionStore + ?Sized,
{
    fn get_cart_id(&self, session: &SessionId) -> Result<Option<CartId>, StoreError> {
        (**self).get_cart_id(session)
    }

    fn bind_cart_id(&self, session: &SessionId, cart_id: CartId) -> Result<(), StoreError> {
        (**self).bind_cart_id(session, cart_id)
    }

    fn unbind_cart_id(&self, session: &SessionId) -> Result<(), StoreError> {
        (**self).unbind_cart_id(session)
    }
}

/// In-memory session binding for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    bindings: RwLock<HashMap<SessionId, CartId>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get_cart_id(&self, session: &SessionId) -> Result<Option<CartId>, StoreError> {
        let bindings = self.bindings.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(bindings.get(session).copied())
    }

    fn bind_cart_id(&self, session: &SessionId, cart_id: CartId) -> Result<(), StoreError> {
        let mut bindings = self.bindings.write().map_err(|_| StoreError::LockPoisoned)?;
        bindings.insert(session.clone(), cart_id);
        Ok(())
    }

    fn unbind_cart_id(&self, session: &SessionId) -> Result<(), StoreError> {
        let mut bindings = self.bindings.write().map_err(|_| StoreError::LockPoisoned)?;
        bindings.remove(session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_session_has_no_cart() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.get_cart_id(&SessionId::from("s1")).unwrap(), None);
    }

    #[test]
    fn bind_replaces_previous_binding() {
        let store = InMemorySessionStore::new();
        let session = SessionId::from("s1");
        let first = CartId::new();
        let second = CartId::new();

        store.bind_cart_id(&session, first).unwrap();
        assert_eq!(store.get_cart_id(&session).unwrap(), Some(first));

        store.bind_cart_id(&session, second).unwrap();
        assert_eq!(store.get_cart_id(&session).unwrap(), Some(second));
    }

    #[test]
    fn unbind_clears_the_binding() {
        let store = InMemorySessionStore::new();
        let session = SessionId::from("s1");
        store.bind_cart_id(&session, CartId::new()).unwrap();
        store.unbind_cart_id(&session).unwrap();
        assert_eq!(store.get_cart_id(&session).unwrap(), None);

        // Unbinding an unbound session is a no-op.
        store.unbind_cart_id(&session).unwrap();
    }

    #[test]
    fn sessions_are_independent() {
        let store = InMemorySessionStore::new();
        let cart = CartId::new();
        store.bind_cart_id(&SessionId::from("s1"), cart).unwrap();
        assert_eq!(store.get_cart_id(&SessionId::from("s2")).unwrap(), None);
    }
}
