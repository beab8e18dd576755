//! Cancellation for an in-flight streaming send.

use std::cell::RefCell;
use std::rc::Rc;
use futures::future::{AbortHandle, AbortRegistration, Abortable};
use futures::stream::Stream;
use chat_types::{ChatError, Result};

/// Single-use token that aborts one streaming send.
///
/// Clones share the same token, so one clone can be handed to the send while
/// another stays with whoever may cancel it.
#[derive(Clone)]
pub struct CancelToken {
    handle: AbortHandle,
    registration: Rc<RefCell<Option<AbortRegistration>>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (handle, registration) = AbortHandle::new_pair();
        Self {
            handle,
            registration: Rc::new(RefCell::new(Some(registration))),
        }
    }

    /// Abort the guarded stream. The next poll ends it, which drops the
    /// underlying connection.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_aborted()
    }

    /// Bind the token to a stream. A token guards at most one stream.
    pub fn guard<S: Stream>(&self, stream: S) -> Result<Abortable<S>> {
        let registration = self.take_registration()?;
        Ok(Abortable::new(stream, registration))
    }

    /// Claim the token for one stream without binding it yet.
    pub fn take_registration(&self) -> Result<AbortRegistration> {
        self.registration
            .borrow_mut()
            .take()
            .ok_or_else(|| ChatError::Config("cancel token already in use".to_string()))
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
