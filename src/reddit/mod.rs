//! Reddit OAuth API client.
//!
//! [`RedditAuth`] performs the password-grant login and yields a
//! [`RedditSession`], which implements [`Platform`] over the
//! `oauth.reddit.com` endpoints.

mod more;
mod types;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{info, instrument};

use crate::config::Credentials;
use crate::traits::{CommentNode, MoreLimit, Platform, PlatformError, SessionProvider, Submission};
use more::MoreSource;
use types::{into_forest, MoreChildrenResponse, Thing, TokenResponse};

const AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";

/// Largest page the listing endpoints return.
const MAX_LISTING_LIMIT: usize = 100;

/// Logs in with the script-app password grant.
pub struct RedditAuth {
    client: reqwest::Client,
    credentials: Credentials,
}

impl RedditAuth {
    pub fn new(credentials: Credentials) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder()
            .user_agent(credentials.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            credentials,
        })
    }
}

#[async_trait]
impl SessionProvider for RedditAuth {
    type Session = RedditSession;

    #[instrument(skip(self), fields(username = %self.credentials.username))]
    async fn connect(&self) -> Result<RedditSession, PlatformError> {
        let resp = self
            .client
            .post(AUTH_URL)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PlatformError::Auth(format!("status {}: {}", status.as_u16(), body)));
        }

        let token: TokenResponse = resp.json().await?;
        let access_token = match (token.access_token, token.error) {
            (_, Some(error)) => return Err(PlatformError::Auth(error)),
            (Some(access_token), None) => access_token,
            (None, None) => {
                return Err(PlatformError::Auth("token response without access_token".to_string()))
            }
        };

        info!("Authenticated with Reddit");
        Ok(RedditSession {
            client: self.client.clone(),
            token: access_token,
        })
    }
}

/// An authenticated Reddit API session.
pub struct RedditSession {
    client: reqwest::Client,
    token: String,
}

impl RedditSession {
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PlatformError> {
        let url = format!("{}{}", API_BASE, path);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(query)
            .query(&[("raw_json", "1")])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PlatformError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Loads `/comments/{id}` and returns the comment listing as a forest.
    async fn comment_page(
        &self,
        post_id: &str,
        focus: Option<&str>,
    ) -> Result<Vec<CommentNode>, PlatformError> {
        let path = match focus {
            Some(comment_id) => format!("/comments/{}/_/{}", post_id, comment_id),
            None => format!("/comments/{}", post_id),
        };

        let page: Vec<Thing> = self.get_json(&path, &[]).await?;
        match page.into_iter().nth(1) {
            Some(Thing::Listing(listing)) => Ok(into_forest(listing.children)),
            _ => Err(PlatformError::Parse(format!(
                "{} did not return a comment listing",
                path
            ))),
        }
    }
}

#[async_trait]
impl MoreSource for RedditSession {
    async fn more_children(
        &self,
        link_id: &str,
        children: &[String],
    ) -> Result<Vec<CommentNode>, PlatformError> {
        let response: MoreChildrenResponse = self
            .get_json(
                "/api/morechildren",
                &[
                    ("api_type", "json".to_string()),
                    ("link_id", link_id.to_string()),
                    ("children", children.join(",")),
                ],
            )
            .await?;
        Ok(into_forest(response.into_things()?))
    }

    async fn focused_page(
        &self,
        post_id: &str,
        comment_id: &str,
    ) -> Result<Vec<CommentNode>, PlatformError> {
        self.comment_page(post_id, Some(comment_id)).await
    }
}

/// Path of the top listing. Subreddit names are `[A-Za-z0-9_]+`.
fn top_listing_path(community: &str) -> Result<String, PlatformError> {
    let valid =
        !community.is_empty() && community.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(PlatformError::InvalidCommunity(community.to_string()));
    }
    Ok(format!("/r/{}/top", community))
}

#[async_trait]
impl Platform for RedditSession {
    #[instrument(skip(self))]
    async fn top_posts(
        &self,
        community: &str,
        limit: usize,
    ) -> Result<Vec<Submission>, PlatformError> {
        let limit = limit.min(MAX_LISTING_LIMIT);
        let listing: Thing = self
            .get_json(
                &top_listing_path(community)?,
                &[("t", "all".to_string()), ("limit", limit.to_string())],
            )
            .await?;

        let Thing::Listing(listing) = listing else {
            return Err(PlatformError::Parse("top posts response is not a listing".to_string()));
        };

        Ok(listing
            .children
            .into_iter()
            .filter_map(|child| match child {
                Thing::Link(link) => Some(Submission::from(link)),
                _ => None,
            })
            .take(limit)
            .collect())
    }

    #[instrument(skip(self, submission), fields(post_id = %submission.id))]
    async fn comment_forest(
        &self,
        submission: &Submission,
        more_limit: MoreLimit,
    ) -> Result<Vec<CommentNode>, PlatformError> {
        let mut forest = self.comment_page(&submission.id, None).await?;
        more::resolve_placeholders(self, submission, &mut forest, more_limit).await?;
        Ok(forest)
    }
}
