// SPDX-FileCopyrightText: 2025 Scrawl Authors
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::error::Result;

/// Delete a post. Irreversible.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The id of the post to delete.
    #[clap()]
    id: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: super::Context) -> Result<()> {
        ctx.gateway.delete_post(&self.id).await?;
        println!("Deleted {}.", self.id);
        Ok(())
    }
}
