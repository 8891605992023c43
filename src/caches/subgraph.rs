use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Minimal GraphQL client for subgraph and REST listing endpoints.
#[derive(Clone, Debug)]
pub struct SubgraphClient {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

impl SubgraphClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Runs a GraphQL query and deserializes its `data` field.
    pub async fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .with_context(|| format!("POST {}", self.url))?
            .error_for_status()?;
        let body: GraphQlResponse<T> = response
            .json()
            .await
            .with_context(|| format!("malformed GraphQL response from {}", self.url))?;
        if let Some(error) = body.errors.first() {
            return Err(anyhow!("subgraph {} returned error: {}", self.url, error.message));
        }
        body.data
            .ok_or_else(|| anyhow!("subgraph {} returned no data", self.url))
    }

    /// Plain `GET` for REST listings.
    pub async fn get_json<T: DeserializeOwned>(&self) -> Result<T> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {}", self.url))?
            .error_for_status()?;
        response
            .json()
            .await
            .with_context(|| format!("malformed JSON from {}", self.url))
    }
}
