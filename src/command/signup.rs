// SPDX-FileCopyrightText: 2025 Scrawl Authors
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::{
    error::{self, Result},
    password::{self, Prompt as _},
};

/// Create a new account on the blog and sign in to it.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The email address for the new account.
    #[clap()]
    email: String,

    /// The display name shown as the author of your posts.
    #[arg(long)]
    name: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: super::Context) -> Result<()> {
        let password = ctx
            .prompt
            .prompt(
                password::RequestBuilder::new()
                    .with_email(&self.email)
                    .into_request(),
            )
            .await?
            .ok_or(error::Password::NoPrompt)?;

        let identity = ctx
            .session
            .sign_up(ctx.identity.as_ref(), &self.email, &self.name, &password)
            .await?;
        println!("Created an account and signed in as {}.", identity.label());
        Ok(())
    }
}
