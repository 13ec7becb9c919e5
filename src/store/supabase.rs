//! [`StrategyStore`] backed by Supabase's PostgREST API.
//!
//! Table `strategies(id uuid, name text, description text, nodes jsonb,
//! edges jsonb, created_at timestamptz, updated_at timestamptz, user_id uuid)`.
//! Requests carry the project `apikey` plus the user's bearer token so
//! row-level security applies; the explicit `user_id=eq.` filter is kept as
//! well so a permissive policy can't leak rows.

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{materialize, StrategyStore};
use crate::auth::Session;
use crate::config::SupabaseConfig;
use crate::models::{NewStrategy, Strategy, StrategyRow, StrategyUpdate};

const TABLE: &str = "strategies";

pub struct SupabaseStore {
    client: Client,
    config: SupabaseConfig,
}

impl SupabaseStore {
    pub fn new(client: Client, config: SupabaseConfig) -> Self {
        Self { client, config }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{TABLE}", self.config.url)
    }

    fn request(&self, method: Method, session: &Session) -> RequestBuilder {
        self.client
            .request(method, self.table_url())
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&session.access_token)
    }

    /// Send, fail on non-2xx, decode the returned rows.
    async fn rows(&self, request: RequestBuilder, what: &str) -> anyhow::Result<Vec<Strategy>> {
        let resp = request
            .send()
            .await
            .with_context(|| format!("Supabase {what}: request failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, what, body = %body, "❌ Supabase rejected request");
            anyhow::bail!("Supabase {what} failed ({status}): {body}");
        }

        let rows: Vec<StrategyRow> = resp
            .json()
            .await
            .with_context(|| format!("Supabase {what}: malformed rows"))?;

        rows.into_iter()
            .map(|row| Strategy::try_from(row).with_context(|| format!("Supabase {what}: bad graph JSON")))
            .collect()
    }

    fn filter_one(id: Uuid, session: &Session) -> [(&'static str, String); 2] {
        [("id", format!("eq.{id}")), ("user_id", format!("eq.{}", session.user.id))]
    }
}

/// PATCH body for a partial update; only the given fields are sent.
fn patch_body(update: StrategyUpdate) -> anyhow::Result<Value> {
    let mut body = Map::new();
    if let Some(name) = update.name {
        body.insert("name".into(), Value::String(name));
    }
    if let Some(description) = update.description {
        body.insert("description".into(), Value::String(description));
    }
    if let Some(graph) = update.graph {
        body.insert("nodes".into(), serde_json::to_value(&graph.nodes).context("encode nodes")?);
        body.insert("edges".into(), serde_json::to_value(&graph.edges).context("encode edges")?);
    }
    body.insert("updated_at".into(), json!(Utc::now()));
    Ok(Value::Object(body))
}

#[async_trait]
impl StrategyStore for SupabaseStore {
    async fn list(&self, session: &Session) -> anyhow::Result<Vec<Strategy>> {
        let req = self.request(Method::GET, session).query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", session.user.id)),
            ("order", "updated_at.desc".to_string()),
        ]);
        let out = self.rows(req, "list").await?;
        debug!(count = out.len(), user_id = %session.user.id, "📚 strategies loaded");
        Ok(out)
    }

    async fn get(&self, session: &Session, id: Uuid) -> anyhow::Result<Option<Strategy>> {
        let req = self
            .request(Method::GET, session)
            .query(&[("select", "*")])
            .query(&Self::filter_one(id, session));
        Ok(self.rows(req, "get").await?.into_iter().next())
    }

    async fn create(&self, session: &Session, new: NewStrategy) -> anyhow::Result<Strategy> {
        let row = materialize(new).into_row(session.user.id);
        let req = self
            .request(Method::POST, session)
            .header("Prefer", "return=representation")
            .json(&row);
        let created = self
            .rows(req, "create")
            .await?
            .into_iter()
            .next()
            .context("Supabase create: no row returned")?;
        debug!(strategy_id = %created.id, "💾 strategy created");
        Ok(created)
    }

    async fn update(
        &self,
        session: &Session,
        id:      Uuid,
        update:  StrategyUpdate,
    ) -> anyhow::Result<Option<Strategy>> {
        let req = self
            .request(Method::PATCH, session)
            .query(&Self::filter_one(id, session))
            .header("Prefer", "return=representation")
            .json(&patch_body(update)?);
        Ok(self.rows(req, "update").await?.into_iter().next())
    }

    async fn delete(&self, session: &Session, id: Uuid) -> anyhow::Result<bool> {
        let req = self
            .request(Method::DELETE, session)
            .query(&Self::filter_one(id, session))
            .header("Prefer", "return=representation");
        Ok(!self.rows(req, "delete").await?.is_empty())
    }

    fn backend_name(&self) -> &'static str {
        "supabase"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GraphSnapshot;

    fn store() -> SupabaseStore {
        SupabaseStore::new(
            Client::new(),
            SupabaseConfig { url: "https://demo.supabase.co".into(), anon_key: "anon".into() },
        )
    }

    #[test]
    fn test_request_carries_keys_and_filters() {
        let session = Session::mock();
        let id = Uuid::new_v4();
        let req = store()
            .request(Method::DELETE, &session)
            .query(&SupabaseStore::filter_one(id, &session))
            .build()
            .unwrap();

        assert_eq!(req.url().path(), "/rest/v1/strategies");
        let query = req.url().query().unwrap_or_default().to_string();
        assert!(query.contains(&format!("id=eq.{id}")));
        assert!(query.contains(&format!("user_id=eq.{}", session.user.id)));
        assert_eq!(req.headers()["apikey"], "anon");
        assert_eq!(req.headers()["authorization"], format!("Bearer {}", session.access_token).as_str());
    }

    #[test]
    fn test_patch_body_only_sends_given_fields() {
        let body = patch_body(StrategyUpdate { name: Some("Renamed".into()), ..Default::default() }).unwrap();
        assert_eq!(body["name"], "Renamed");
        assert!(body.get("description").is_none());
        assert!(body.get("nodes").is_none());
        assert!(body.get("updated_at").is_some());

        let body = patch_body(StrategyUpdate { graph: Some(GraphSnapshot::default()), ..Default::default() }).unwrap();
        assert_eq!(body["nodes"], json!([]));
        assert_eq!(body["edges"], json!([]));
    }
}
