//! Application state for the HTTP server.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::services::{ColorCycle, ImageryContext};

/// Initialization phase of the imagery client.
#[derive(Debug, Clone)]
pub enum Readiness {
    /// Credentials not yet loaded or the token exchange still in flight.
    Uninitialized,
    Ready(ImageryContext),
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    readiness: Arc<RwLock<Readiness>>,
    /// Region colour cursor, shared across requests.
    pub palette: Arc<ColorCycle>,
}

impl AppState {
    /// State for a server whose imagery client is still initializing.
    pub fn uninitialized() -> Self {
        Self {
            readiness: Arc::new(RwLock::new(Readiness::Uninitialized)),
            palette: Arc::new(ColorCycle::new()),
        }
    }

    /// State with an already-initialized client.
    pub fn ready(ctx: ImageryContext) -> Self {
        let state = Self::uninitialized();
        state.mark_ready(ctx);
        state
    }

    /// Publish the initialized client. Requests accepted afterwards see it.
    pub fn mark_ready(&self, ctx: ImageryContext) {
        *self.readiness.write() = Readiness::Ready(ctx);
    }

    /// The ready client, if initialization has finished.
    pub fn context(&self) -> Option<ImageryContext> {
        match &*self.readiness.read() {
            Readiness::Ready(ctx) => Some(ctx.clone()),
            Readiness::Uninitialized => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.readiness.read(), Readiness::Ready(_))
    }
}
