// SPDX-FileCopyrightText: 2025 Scrawl Authors
//
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tabled::Tabled;

use crate::session;

/// A published post as the remote store returns it. Identifiers and
/// timestamps are assigned server-side and never synthesized here.
#[derive(Clone, Debug, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Post {
    #[serde(rename = "_id")]
    #[tabled(rename = "ID")]
    pub(crate) id: String,
    #[tabled(rename = "Title")]
    pub(crate) title: String,
    #[tabled(skip)]
    pub(crate) content: String,
    #[serde(default)]
    #[tabled(rename = "Tags", display_with = "Self::format_tags")]
    pub(crate) tags: Vec<String>,
    #[serde(default)]
    #[tabled(skip)]
    pub(crate) image_url: Option<String>,
    #[serde(rename = "userId")]
    #[tabled(skip)]
    pub(crate) owner_id: String,
    #[tabled(rename = "Author")]
    pub(crate) author: String,
    #[tabled(rename = "Published", display_with = "Self::format_timestamp")]
    pub(crate) created_at: DateTime<Utc>,
    #[tabled(skip)]
    pub(crate) updated_at: DateTime<Utc>,
}

impl Post {
    fn format_tags(tags: &Vec<String>) -> String {
        tags.join(", ")
    }

    fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
        timestamp.format("%Y-%m-%d").to_string()
    }
}

/// In-progress form state for create/edit. Holds the writable fields of a
/// post plus a pending image payload; discarded after a successful submit.
#[derive(Clone, Debug, Default)]
pub(crate) struct Draft {
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) tags: Vec<String>,
    pub(crate) image: Option<ImageUpload>,
}

#[derive(Clone, Debug)]
pub(crate) struct ImageUpload {
    pub(crate) file_name: String,
    pub(crate) content_type: String,
    pub(crate) bytes: Vec<u8>,
}

/// The single ownership check shared by every call site that decides whether
/// to offer edit/delete. The server re-verifies authoritatively; this only
/// gates the client-side affordance.
pub(crate) fn can_modify(state: &session::State, post: &Post) -> bool {
    match state {
        session::State::Authenticated(identity) => identity.id() == post.owner_id,
        session::State::Anonymous => false,
    }
}
