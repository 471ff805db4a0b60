// SPDX-FileCopyrightText: 2025 Scrawl Authors
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug,
    clippy::future_not_send
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]

mod api;
mod command;
mod error;
mod gateway;
mod identity;
mod metadata;
mod password;
mod session;
mod storage;

use std::{path::PathBuf, process, sync::Arc};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use error::Result;
use log::{error, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

#[derive(Debug, Subcommand)]
enum Command {
    List(command::list::Command),
    Show(command::show::Command),
    Create(command::create::Command),
    Edit(command::edit::Command),
    Delete(command::delete::Command),
    Signup(command::signup::Command),
    Login(command::login::Command),
    Logout(command::logout::Command),
    Whoami(command::whoami::Command),
}

#[async_trait]
impl command::Command for Command {
    async fn execute(self, ctx: command::Context) -> Result<()> {
        match self {
            Self::List(cmd) => cmd.execute(ctx).await,
            Self::Show(cmd) => cmd.execute(ctx).await,
            Self::Create(cmd) => cmd.execute(ctx).await,
            Self::Edit(cmd) => cmd.execute(ctx).await,
            Self::Delete(cmd) => cmd.execute(ctx).await,
            Self::Signup(cmd) => cmd.execute(ctx).await,
            Self::Login(cmd) => cmd.execute(ctx).await,
            Self::Logout(cmd) => cmd.execute(ctx).await,
            Self::Whoami(cmd) => cmd.execute(ctx).await,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The base URL of the blog API.
    #[arg(long, env = "SCRAWL_API_URL", default_value = "https://scrawl-api.onrender.com/api", value_parser = Url::parse)]
    api_url: Url,

    /// The base URL of the identity service used for sign-in.
    #[arg(long, env = "SCRAWL_IDENTITY_URL", default_value = "https://identitytoolkit.googleapis.com", value_parser = Url::parse)]
    identity_url: Url,

    /// The base URL of the token service used to mint access tokens.
    #[arg(long, env = "SCRAWL_TOKEN_URL", default_value = "https://securetoken.googleapis.com", value_parser = Url::parse)]
    token_url: Url,

    /// The API key identifying this client to the identity service.
    #[arg(long, env = "SCRAWL_IDENTITY_KEY")]
    identity_key: Option<String>,

    /// Turn off persistence of the sign-in credential between invocations.
    #[arg(long)]
    no_store_credentials: bool,

    /// The path to the Pinentry program to use when asking for your account
    /// password.
    #[arg(long, value_hint = clap::ValueHint::ExecutablePath)]
    pinentry_program: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

async fn get_credential_storage<
    T: Send + Serialize + Sync + for<'de> Deserialize<'de> + Clone + 'static,
>(
    args: &Args,
) -> Box<dyn storage::Storage<T>> {
    if !args.no_store_credentials {
        #[cfg(feature = "secret-service")]
        match storage::SecretService::new(&args.identity_url).await {
            Ok(secret_service_storage) => return Box::new(secret_service_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to the secret service: {}", e);
            }
        }

        #[cfg(feature = "keychain")]
        match storage::Keychain::new(&args.identity_url) {
            Ok(keychain_storage) => return Box::new(keychain_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to Keychain: {}", e);
            }
        }

        if let Some(file_storage) = storage::File::new("credentials.json") {
            return Box::new(file_storage);
        }

        warn!("We need to fall back to in-memory storage because there is no usable project directory; your sign-in won't outlive this invocation");
    }

    Box::new(storage::Memory::<T>::new())
}

async fn run(args: Args) -> Result<()> {
    let prompt: Vec<Box<dyn password::Prompt>> = vec![
        Box::new(args.pinentry_program.clone().map_or_else(
            password::PinentryPrompt::new,
            password::PinentryPrompt::new_with_executable,
        )),
        Box::new(password::RpasswordPrompt),
    ];

    let storage = Arc::new(Mutex::new(get_credential_storage(&args).await));
    let provider: Arc<dyn identity::Provider> = Arc::new(
        identity::http::Provider::new(
            storage,
            &args.identity_url,
            &args.token_url,
            args.identity_key.clone(),
        )
        .await?,
    );

    let session = session::Provider::with_current(provider.current());
    let tokens = session::TokenSupplier::new(session.clone(), Arc::clone(&provider));
    let gateway = gateway::Gateway::new(args.api_url.clone(), session.clone(), tokens);

    command::Command::execute(
        args.command,
        command::Context {
            gateway,
            session,
            identity: provider,
            prompt: Arc::new(prompt),
        },
    )
    .await
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("SCRAWL_LOG", "warn")
        .write_style("SCRAWL_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    if let Err(e) = run(Args::parse()).await {
        error!("We encountered an error: {}", e);
        process::exit(1);
    };
}
