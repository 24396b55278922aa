//! Shared application state.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::events::EventSink;
use crate::storage::Storage;

pub struct AppState {
    pub storage: Storage,
    pub events: Arc<dyn EventSink>,
}

pub type SharedState = Arc<Mutex<AppState>>;
