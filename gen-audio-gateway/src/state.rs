//! Shared application state, following the teacher's `Arc`-wrapped-handle
//! ownership style (see `coordinator::scheduler::JobScheduler`'s
//! `Arc<Mutex<WorkerPool>>`): everything here is cheap to clone per-request
//! because the heavy objects are already internally pooled.

use std::sync::Arc;

use gen_audio_core::auth::TokenIssuer;
use gen_audio_core::broker::Broker;
use gen_audio_core::config::Config;
use gen_audio_core::store::MetadataStore;

use crate::rate_limit::RateLimiters;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MetadataStore>,
    pub broker: Arc<dyn Broker>,
    pub config: Arc<Config>,
    pub tokens: Arc<TokenIssuer>,
    pub rate_limiters: Arc<RateLimiters>,
}

/// The authenticated identity attached to a request by the auth
/// middleware, analogous to the teacher's pattern of resolving a typed
/// value once in middleware and reading it back out of extensions in
/// handlers.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: uuid::Uuid,
    pub username: String,
}
