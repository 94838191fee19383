//! HTTP client for the DHIS2 Web API

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, SuggestError};
use crate::metadata::{Entity, EventRef, MetadataLookup, TrackedEntityRef};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials for the DHIS2 instance.
#[derive(Clone)]
pub enum Auth {
    /// Personal access token
    Token(String),
    Basic { username: String, password: String },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Token(_) => f.write_str("Token(***)"),
            Auth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

impl Auth {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Auth::Token(token) => request.header(AUTHORIZATION, format!("ApiToken {token}")),
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }
}

/// DHIS2 instance accessed over HTTP.
#[derive(Debug, Clone)]
pub struct D2Api {
    client: reqwest::Client,
    base_url: String,
    auth: Auth,
}

impl D2Api {
    pub fn new(base_url: &str, auth: Auth) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if Url::parse(&base_url).is_err() {
            return Err(SuggestError::InvalidUrl(base_url));
        }

        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    /// Instance URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?query, "GET");

        let request = self.client.get(&url).query(query);
        let response = self.auth.apply(request).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SuggestError::Status { status, url });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl MetadataLookup for D2Api {
    async fn entities(&self, collection: &str, id: &str) -> Result<Vec<Entity>> {
        let filter = format!("id:eq:{id}");
        let path = format!("/api/{collection}");

        let mut response: Map<String, Value> = self
            .get(&path, &[("fields", "id,name"), ("filter", filter.as_str())])
            .await?;

        match response.remove(collection) {
            Some(entities) => Ok(serde_json::from_value(entities)?),
            None => Ok(Vec::new()),
        }
    }

    async fn event(&self, id: &str) -> Result<EventRef> {
        self.get(&format!("/api/events/{id}"), &[]).await
    }

    async fn tracked_entity(&self, id: &str) -> Result<TrackedEntityRef> {
        self.get(
            &format!("/api/tracker/trackedEntities/{id}"),
            &[("fields", "*,enrollments")],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_without_trailing_slash() {
        let api = D2Api::new("https://play.dhis2.org/40/", Auth::Token(String::from("t"))).unwrap();
        assert_eq!(api.base_url(), "https://play.dhis2.org/40");
    }

    #[test]
    fn invalid_base_url() {
        assert!(matches!(
            D2Api::new("not a url", Auth::Token(String::from("t"))),
            Err(SuggestError::InvalidUrl(_))
        ));
    }

    #[test]
    fn credentials_are_not_printed() {
        let token = format!("{:?}", Auth::Token(String::from("d2pat_secret")));
        assert!(!token.contains("secret"));

        let basic = format!(
            "{:?}",
            Auth::Basic {
                username: String::from("admin"),
                password: String::from("district"),
            }
        );
        assert!(basic.contains("admin"));
        assert!(!basic.contains("district"));
    }
}
