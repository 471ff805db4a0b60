// SPDX-FileCopyrightText: 2025 Scrawl Authors
//
// SPDX-License-Identifier: Apache-2.0

use log::debug;
use secrecy::{ExposeSecret as _, SecretString};
use url::Url;

use crate::{
    api,
    error::{self, Error, Result},
    session,
};

/// The sole path by which the rest of the client reads or mutates posts.
///
/// Reads go out unauthenticated, always. Mutations fail fast while the
/// session is anonymous, and otherwise fetch a fresh bearer token from the
/// token supplier immediately before the call; a token that can't be minted
/// fails the operation rather than letting it go out unauthenticated.
///
/// The gateway holds no post state of its own. In particular, a successful
/// delete does not invalidate any list a caller may still be holding; that
/// list is the caller's to fix up.
pub(crate) struct Gateway {
    http: reqwest::Client,
    base: Url,
    session: session::Provider,
    tokens: session::TokenSupplier,
}

/// Pull the message out of a server error body. The API reports failures as
/// `{"error": "..."}` or `{"message": "..."}`; anything else is passed
/// through raw.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    parsed
        .as_ref()
        .and_then(|value| value.get("error").or_else(|| value.get("message")))
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.to_owned()
            }
        })
}

/// Map a response to the body text on success, or to the error taxonomy
/// otherwise. `id` is the resource id to report for a 404.
async fn check(resp: reqwest::Response, id: Option<&str>) -> Result<String> {
    let status = resp.status();
    let body = resp.text().await?;
    if status.is_success() {
        return Ok(body);
    }

    let message = error_message(&body, status);
    debug!("Request failed with status {}: {}", status, message);
    Err(match status {
        reqwest::StatusCode::NOT_FOUND => error::Api::NotFound {
            id: id.unwrap_or_default().to_owned(),
        },
        reqwest::StatusCode::BAD_REQUEST | reqwest::StatusCode::UNPROCESSABLE_ENTITY => {
            error::Api::Validation(message)
        }
        _ => error::Api::Server { status, message },
    }
    .into())
}

/// One multipart submission carrying the draft's text fields and, when
/// present, the image payload alongside them. Tags travel as a single
/// comma-joined field; the server splits them back apart.
fn multipart(draft: &api::Draft) -> Result<reqwest::multipart::Form> {
    let mut form = reqwest::multipart::Form::new()
        .text("title", draft.title.clone())
        .text("content", draft.content.clone())
        .text("tags", draft.tags.join(","));

    if let Some(image) = draft.image.as_ref() {
        form = form.part(
            "image",
            reqwest::multipart::Part::bytes(image.bytes.clone())
                .file_name(image.file_name.clone())
                .mime_str(&image.content_type)?,
        );
    }

    Ok(form)
}

impl Gateway {
    pub(crate) fn new(base: Url, session: session::Provider, tokens: session::TokenSupplier) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
            session,
            tokens,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Command)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn bearer(&self) -> Result<SecretString> {
        if !self.session.current().is_authenticated() {
            return Err(error::Auth::SignedOut.into());
        }
        self.tokens.get_token().await
    }

    /// All posts, in the order the server returns them (most recent first).
    /// The ordering authority is the remote store; nothing is re-sorted
    /// here.
    pub(crate) async fn list_posts(&self) -> Result<Vec<api::Post>> {
        let resp = self.http.get(self.endpoint(&["posts"])?).send().await?;
        let body = check(resp, None).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub(crate) async fn get_post(&self, id: &str) -> Result<api::Post> {
        let resp = self.http.get(self.endpoint(&["posts", id])?).send().await?;
        let body = check(resp, Some(id)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub(crate) async fn create_post(&self, draft: &api::Draft) -> Result<api::Post> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .post(self.endpoint(&["posts"])?)
            .bearer_auth(token.expose_secret())
            .multipart(multipart(draft)?)
            .send()
            .await?;
        let body = check(resp, None).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Full replacement of a post's writable fields; same multipart shape as
    /// create. Ownership is not re-checked here — the server is the
    /// authority, and the calling view already gated its affordances on
    /// [`api::can_modify`].
    pub(crate) async fn update_post(&self, id: &str, draft: &api::Draft) -> Result<api::Post> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .put(self.endpoint(&["posts", id])?)
            .bearer_auth(token.expose_secret())
            .multipart(multipart(draft)?)
            .send()
            .await?;
        let body = check(resp, Some(id)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub(crate) async fn delete_post(&self, id: &str) -> Result<()> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .delete(self.endpoint(&["posts", id])?)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        drop(check(resp, Some(id)).await?);
        Ok(())
    }
}
