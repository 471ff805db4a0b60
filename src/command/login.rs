// SPDX-FileCopyrightText: 2025 Scrawl Authors
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::{
    error::{self, Error, Result},
    password::{self, Prompt as _},
};

/// Sign in to the blog with your email address.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The email address to sign in with.
    #[clap()]
    email: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: super::Context) -> Result<()> {
        let mut rejection: Option<String> = None;

        loop {
            let mut builder = password::RequestBuilder::new().with_email(&self.email);
            if let Some(message) = rejection.as_deref() {
                builder = builder.with_error(message);
            }
            let password = ctx
                .prompt
                .prompt(builder.into_request())
                .await?
                .ok_or(error::Password::NoPrompt)?;

            match ctx
                .session
                .sign_in(ctx.identity.as_ref(), &self.email, &password)
                .await
            {
                Ok(identity) => {
                    println!("Signed in as {}.", identity.label());
                    return Ok(());
                }
                // A rejected password is worth another attempt with the
                // provider's message shown; anything else is final.
                Err(Error::Auth(error::Auth::SignIn(message))) => rejection = Some(message),
                Err(e) => return Err(e),
            }
        }
    }
}
