// SPDX-FileCopyrightText: 2025 Scrawl Authors
//
// SPDX-License-Identifier: Apache-2.0

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use tokio::io::AsyncReadExt as _;

use crate::{api, error::Result, gateway, identity, password, session};

pub(crate) mod create;
pub(crate) mod delete;
pub(crate) mod edit;
pub(crate) mod list;
pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod show;
pub(crate) mod signup;
pub(crate) mod whoami;

/// Everything a command may need: the gateway for post data, the session and
/// identity provider for sign-in state, and the password prompt chain.
pub(crate) struct Context {
    pub(crate) gateway: gateway::Gateway,
    pub(crate) session: session::Provider,
    pub(crate) identity: Arc<dyn identity::Provider>,
    pub(crate) prompt: Arc<Vec<Box<dyn password::Prompt>>>,
}

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, ctx: Context) -> Result<()>;
}

/// Body text for a draft: the flag value when given, otherwise everything on
/// standard input.
pub(crate) async fn read_content(content: Option<String>) -> Result<String> {
    match content {
        Some(content) => Ok(content),
        None => {
            let mut buffer = String::new();
            drop(tokio::io::stdin().read_to_string(&mut buffer).await?);
            Ok(buffer)
        }
    }
}

pub(crate) async fn load_image<P: AsRef<Path>>(path: P) -> Result<api::ImageUpload> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map_or_else(|| "image".to_owned(), |name| name.to_string_lossy().into_owned());
    let content_type = match path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some(_) | None => "application/octet-stream",
    }
    .to_owned();

    Ok(api::ImageUpload {
        file_name,
        content_type,
        bytes,
    })
}
