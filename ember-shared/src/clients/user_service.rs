use std::collections::HashMap;
use std::time::Duration;

use uuid::Uuid;

use crate::types::profile::{
    BatchProfilesRequest, CandidatesRequest, CandidatesResponse, ProfileSummary,
};

/// Client for the user service's internal (unauthenticated) endpoints.
#[derive(Clone)]
pub struct UserServiceClient {
    http: reqwest::Client,
    base_url: String,
}

impl UserServiceClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn batch_profiles(&self, user_ids: &[Uuid]) -> anyhow::Result<Vec<ProfileSummary>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }
        let url = format!("{}/internal/profiles/batch", self.base_url);
        let profiles = self
            .http
            .post(&url)
            .json(&BatchProfilesRequest { user_ids: user_ids.to_vec() })
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<ProfileSummary>>()
            .await?;
        Ok(profiles)
    }

    /// Same as [`batch_profiles`](Self::batch_profiles) keyed by user id.
    /// Lookup failures are logged and yield an empty map.
    pub async fn profile_map(&self, user_ids: &[Uuid]) -> HashMap<Uuid, ProfileSummary> {
        match self.batch_profiles(user_ids).await {
            Ok(profiles) => profiles.into_iter().map(|p| (p.user_id, p)).collect(),
            Err(e) => {
                tracing::warn!(error = %e, count = user_ids.len(), "failed to fetch profile summaries");
                HashMap::new()
            }
        }
    }

    pub async fn profile(&self, user_id: Uuid) -> anyhow::Result<Option<ProfileSummary>> {
        Ok(self.batch_profiles(&[user_id]).await?.into_iter().next())
    }

    pub async fn candidates(&self, req: &CandidatesRequest) -> anyhow::Result<CandidatesResponse> {
        let url = format!("{}/internal/candidates", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(req)
            .send()
            .await?
            .error_for_status()?
            .json::<CandidatesResponse>()
            .await?;
        Ok(resp)
    }
}
