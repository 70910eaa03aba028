//! Security rules maintenance
//!
//! Rules live at `/.settings/rules` as `{"rules": ...}`. These helpers move
//! them between the database and a local JSON file.

use crate::client::Client;
use crate::query::Query;
use fireman_core::{diff, Result};
use serde_json::{json, Value};
use std::path::Path;

/// Location of the rules document
pub const RULES_PATH: &str = ".settings/rules";

impl Client {
    /// Current rules; null when none are set
    pub async fn fetch_rules(&self) -> Result<Value> {
        let document = self.get(RULES_PATH, &Query::new()).await?;
        Ok(document.get("rules").cloned().unwrap_or(Value::Null))
    }

    /// Replace the rules
    pub async fn update_rules(&self, rules: Value) -> Result<Value> {
        self.put(RULES_PATH, json!({ "rules": rules })).await
    }

    /// Read rules from a JSON file
    pub async fn parse_rules(file: &Path) -> Result<Value> {
        let text = tokio::fs::read_to_string(file).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write rules to a JSON file, indented by two spaces
    pub async fn write_rules(file: &Path, rules: &Value) -> Result<()> {
        let text = serde_json::to_string_pretty(rules)?;
        tokio::fs::write(file, text).await?;
        Ok(())
    }

    /// First difference between the rules in `file` and the deployed ones,
    /// `None` when they match
    pub async fn diff_rules(&self, file: &Path) -> Result<Option<String>> {
        let (local, deployed) = tokio::try_join!(Self::parse_rules(file), self.fetch_rules())?;
        Ok(diff(&local, &deployed))
    }

    /// Overwrite `file` with the deployed rules
    pub async fn sync_rules(&self, file: &Path) -> Result<()> {
        let rules = self.fetch_rules().await?;
        Self::write_rules(file, &rules).await?;
        tracing::info!(target: "fireman::rules", file = %file.display(), "Rules written to file");
        Ok(())
    }

    /// Deploy the rules in `file`
    pub async fn deploy_rules(&self, file: &Path) -> Result<()> {
        let rules = Self::parse_rules(file).await?;
        self.update_rules(rules).await?;
        tracing::info!(target: "fireman::rules", file = %file.display(), "Rules deployed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalBackend;
    use fireman_concurrency::RetryConfig;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn client() -> Client {
        Client::new(Arc::new(LocalBackend::new()), RetryConfig::no_retry())
    }

    #[tokio::test]
    async fn missing_rules_are_null() {
        assert_eq!(client().fetch_rules().await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn deploy_then_sync_round_trip() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("rules.json");
        let synced = dir.path().join("synced.json");
        std::fs::write(&source, r#"{".read": true, "user": {".write": "auth != null"}}"#).unwrap();

        let client = client();
        client.deploy_rules(&source).await.unwrap();
        assert_eq!(
            client.fetch_rules().await.unwrap(),
            json!({".read": true, "user": {".write": "auth != null"}})
        );
        assert_eq!(client.diff_rules(&source).await.unwrap(), None);

        client.sync_rules(&synced).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&synced).unwrap(),
            "{\n  \".read\": true,\n  \"user\": {\n    \".write\": \"auth != null\"\n  }\n}"
        );
    }

    #[tokio::test]
    async fn diff_reports_first_change() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("rules.json");
        std::fs::write(&file, r#"{".read": false}"#).unwrap();

        let client = client();
        client.update_rules(json!({".read": true})).await.unwrap();
        let difference = client.diff_rules(&file).await.unwrap().unwrap();
        assert!(difference.contains(".read"), "{difference}");
    }

    #[tokio::test]
    async fn parse_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = Client::parse_rules(&dir.path().join("absent.json")).await;
        assert!(matches!(result, Err(fireman_core::Error::Io(_))));
    }
}
