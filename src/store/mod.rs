//! # store — Strategy persistence boundary
//!
//! The editor never talks to a database directly.  Strategies go through the
//! [`StrategyStore`] trait, which has two implementations:
//!
//! - [`SupabaseStore`] — PostgREST over HTTPS, row-level security enforced
//!   by the caller's access token.
//! - [`MemoryStore`] — process-local map used when Supabase isn't configured
//!   and as the test double.
//!
//! Every call is scoped to the signed-in user's [`Session`]; a strategy owned
//! by someone else is reported as absent, not forbidden.

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::Session;
use crate::config::AppConfig;
use crate::models::{NewStrategy, Strategy, StrategyUpdate};

mod memory;
mod supabase;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

#[async_trait]
pub trait StrategyStore {
    /// All strategies of the user, most recently updated first.
    async fn list(&self, session: &Session) -> anyhow::Result<Vec<Strategy>>;

    async fn get(&self, session: &Session, id: Uuid) -> anyhow::Result<Option<Strategy>>;

    async fn create(&self, session: &Session, new: NewStrategy) -> anyhow::Result<Strategy>;

    /// `Ok(None)` when the strategy doesn't exist for this user.
    async fn update(
        &self,
        session: &Session,
        id:      Uuid,
        update:  StrategyUpdate,
    ) -> anyhow::Result<Option<Strategy>>;

    /// `Ok(false)` when nothing was deleted.
    async fn delete(&self, session: &Session, id: Uuid) -> anyhow::Result<bool>;

    fn backend_name(&self) -> &'static str;
}

pub type DynStore = Box<dyn StrategyStore + Send + Sync>;

/// Pick the backend for this configuration.
pub fn build_store(config: &AppConfig, client: reqwest::Client) -> DynStore {
    match &config.supabase {
        Some(supabase) => Box::new(SupabaseStore::new(client, supabase.clone())),
        None => Box::new(MemoryStore::default()),
    }
}

/// Strategy built from a create request.
pub(crate) fn materialize(new: NewStrategy) -> Strategy {
    let mut strategy = Strategy::new(new.name, new.description);
    if let Some(graph) = new.graph {
        strategy.set_graph(graph);
    }
    strategy
}
