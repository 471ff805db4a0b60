// SPDX-FileCopyrightText: 2025 Scrawl Authors
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::{error::Result, session};

/// Show the signed-in identity, if any.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: super::Context) -> Result<()> {
        match ctx.session.current() {
            session::State::Authenticated(identity) => {
                println!("{} ({})", identity.label(), identity.id());
            }
            session::State::Anonymous => println!("Not signed in."),
        }
        Ok(())
    }
}
