// SPDX-FileCopyrightText: 2025 Scrawl Authors
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use async_trait::async_trait;
use clap::Parser;
use log::warn;

use crate::{api, error::Result};

/// Replace the writable fields of an existing post. Fields you don't pass
/// keep their current values.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The id of the post to edit.
    #[clap()]
    id: String,

    /// A new title.
    #[arg(long)]
    title: Option<String>,

    /// New body text.
    #[arg(long)]
    content: Option<String>,

    /// Replace the tag list; repeat for multiple tags.
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Path to a new image for the post.
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    image: Option<PathBuf>,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: super::Context) -> Result<()> {
        let existing = ctx.gateway.get_post(&self.id).await?;
        if !api::can_modify(&ctx.session.current(), &existing) {
            // The server enforces ownership authoritatively; this is only a
            // heads-up before the round trip.
            warn!("You don't appear to own this post, so the server will likely reject the edit");
        }

        let image = match self.image {
            Some(path) => Some(super::load_image(path).await?),
            None => None,
        };
        let draft = api::Draft {
            title: self.title.unwrap_or(existing.title),
            content: self.content.unwrap_or(existing.content),
            tags: if self.tags.is_empty() {
                existing.tags
            } else {
                self.tags
            },
            image,
        };

        let post = ctx.gateway.update_post(&self.id, &draft).await?;
        println!("Updated \"{}\".", post.title);
        Ok(())
    }
}
