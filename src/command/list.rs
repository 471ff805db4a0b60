// SPDX-FileCopyrightText: 2025 Scrawl Authors
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use tabled::{
    settings::{object::Segment, Alignment, Modify, Style},
    Table,
};

use crate::{api, error::Result};

/// List the published posts, most recent first.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// Only show posts you can edit (those owned by the signed-in identity).
    #[arg(long)]
    mine: bool,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: super::Context) -> Result<()> {
        let posts = ctx.gateway.list_posts().await?;

        let state = ctx.session.current();
        let posts: Vec<_> = posts
            .into_iter()
            .filter(|post| !self.mine || api::can_modify(&state, post))
            .collect();

        if posts.is_empty() {
            println!("No posts yet.");
        } else {
            println!(
                "{}",
                Table::new(&posts)
                    .with(Style::rounded())
                    .with(Modify::new(Segment::all()).with(Alignment::left()))
            );
        }
        Ok(())
    }
}
