//! Utilities for mirroring rows into a Supabase database.
use postgrest::Postgrest;

use crate::sync::{RemoteCall, RemoteError, RemoteStore};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SupabaseConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl SupabaseConfig {
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.supabase_url.trim_end_matches('/'))
    }
}

/// A [`RemoteStore`] backed by Supabase's PostgREST API.
pub struct SupabaseRemote {
    client: Postgrest,
}

impl SupabaseRemote {
    pub fn new(config: &SupabaseConfig) -> Self {
        Self::with_access_token(config, &config.supabase_anon_key)
    }

    /// Authenticate as a signed-in user instead of the anonymous role.
    pub fn with_access_token(config: &SupabaseConfig, access_token: &str) -> Self {
        let client = Postgrest::new(config.rest_url())
            .insert_header("apikey", config.supabase_anon_key.as_str())
            .insert_header("Authorization", format!("Bearer {access_token}"));
        Self { client }
    }
}

impl RemoteStore for SupabaseRemote {
    async fn execute(&self, call: &RemoteCall) -> Result<(), RemoteError> {
        let query = self.client.from(call.table());
        let query = match call {
            RemoteCall::Create { row, .. } => query.insert(row.to_string()),
            RemoteCall::Update { id, row, .. } => query.eq("id", id).update(row.to_string()),
            RemoteCall::Delete { id, .. } => query.eq("id", id).delete(),
            RemoteCall::Upsert { row, .. } => query.upsert(row.to_string()),
        };

        let response = query
            .execute()
            .await
            .map_err(|e| RemoteError::Transport(format!("{e:?}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RemoteError::Status { status, body });
        }

        Ok(())
    }
}
