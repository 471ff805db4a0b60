// SPDX-FileCopyrightText: 2025 Scrawl Authors
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use async_trait::async_trait;
use clap::Parser;

use crate::{api, error::Result};

/// Publish a new post.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The title of the post.
    #[arg(long)]
    title: String,

    /// The body text. Read from standard input when not given.
    #[arg(long)]
    content: Option<String>,

    /// A tag to attach to the post; repeat for multiple tags.
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Path to an image to attach to the post.
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    image: Option<PathBuf>,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: super::Context) -> Result<()> {
        let image = match self.image {
            Some(path) => Some(super::load_image(path).await?),
            None => None,
        };
        let draft = api::Draft {
            title: self.title,
            content: super::read_content(self.content).await?,
            tags: self.tags,
            image,
        };

        let post = ctx.gateway.create_post(&draft).await?;
        println!("Published \"{}\" as {}.", post.title, post.id);
        Ok(())
    }
}
