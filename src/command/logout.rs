// SPDX-FileCopyrightText: 2025 Scrawl Authors
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::error::Result;

/// Sign out and discard the stored credential. Does nothing when not signed
/// in.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: super::Context) -> Result<()> {
        ctx.session.sign_out(ctx.identity.as_ref()).await?;
        println!("Signed out.");
        Ok(())
    }
}
