//! Session context
//!
//! The backend and its shadow buffer, owned together by the session and
//! lent to the dispatcher and the event pump.

use std::collections::TryReserveError;

use crate::core::shadow::ShadowBuffer;
use crate::ui::Backend;

pub struct Context<B: Backend> {
    pub backend: B,
    pub shadow: ShadowBuffer,
}

impl<B: Backend> Context<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            shadow: ShadowBuffer::new(),
        }
    }

    /// Rebuild the shadow buffer at the backend's current size.
    pub fn resync(&mut self) -> Result<(), TryReserveError> {
        let (width, height) = (self.backend.width(), self.backend.height());
        self.shadow.resize(width, height)
    }
}
