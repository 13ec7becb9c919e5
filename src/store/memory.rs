//! In-process [`StrategyStore`]: a map keyed by strategy id, each entry
//! tagged with the owning user.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{materialize, StrategyStore};
use crate::auth::Session;
use crate::models::{NewStrategy, Strategy, StrategyUpdate};

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<Uuid, (Uuid, Strategy)>>,
}

#[async_trait]
impl StrategyStore for MemoryStore {
    async fn list(&self, session: &Session) -> anyhow::Result<Vec<Strategy>> {
        let rows = self.rows.read().await;
        let mut out: Vec<Strategy> = rows
            .values()
            .filter(|(owner, _)| *owner == session.user.id)
            .map(|(_, s)| s.clone())
            .collect();
        out.sort_by(|a, b| b.updated.cmp(&a.updated));
        Ok(out)
    }

    async fn get(&self, session: &Session, id: Uuid) -> anyhow::Result<Option<Strategy>> {
        let rows = self.rows.read().await;
        Ok(rows
            .get(&id)
            .filter(|(owner, _)| *owner == session.user.id)
            .map(|(_, s)| s.clone()))
    }

    async fn create(&self, session: &Session, new: NewStrategy) -> anyhow::Result<Strategy> {
        let strategy = materialize(new);
        debug!(strategy_id = %strategy.id, user_id = %session.user.id, "💾 strategy created (memory)");
        self.rows
            .write()
            .await
            .insert(strategy.id, (session.user.id, strategy.clone()));
        Ok(strategy)
    }

    async fn update(
        &self,
        session: &Session,
        id:      Uuid,
        update:  StrategyUpdate,
    ) -> anyhow::Result<Option<Strategy>> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&id) {
            Some((owner, strategy)) if *owner == session.user.id => {
                update.apply(strategy);
                Ok(Some(strategy.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, session: &Session, id: Uuid) -> anyhow::Result<bool> {
        let mut rows = self.rows.write().await;
        let owned = rows.get(&id).is_some_and(|(owner, _)| *owner == session.user.id);
        if owned {
            rows.remove(&id);
        }
        Ok(owned)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
