// SPDX-FileCopyrightText: 2025 Scrawl Authors
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::{api, error::Result};

/// Print a single post.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The id of the post to show.
    #[clap()]
    id: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: super::Context) -> Result<()> {
        let post = ctx.gateway.get_post(&self.id).await?;

        println!("{}", post.title);
        println!(
            "By {} on {}",
            post.author,
            post.created_at.format("%Y-%m-%d %H:%M UTC")
        );
        if post.updated_at > post.created_at {
            println!(
                "Last edited {}",
                post.updated_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
        if !post.tags.is_empty() {
            println!("Tags: {}", post.tags.join(", "));
        }
        if let Some(image_url) = post.image_url.as_deref() {
            println!("Image: {image_url}");
        }
        println!();
        println!("{}", post.content);

        if api::can_modify(&ctx.session.current(), &post) {
            println!();
            println!("(You own this post; `edit` and `delete` are available.)");
        }
        Ok(())
    }
}
