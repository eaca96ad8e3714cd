use std::io::{BufRead, Write};

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::info;

use crate::{
    api::{
        entities::{Credentials, Registration},
        ApiError,
    },
    session::guards::{require_auth, require_guest},
    validation,
};

use super::Context;

#[derive(Debug, Parser)]
pub struct RegisterCommand {
    #[arg(help = "Email used to log in")]
    email: String,
    #[arg(long, help = "Display name")]
    name: Option<String>,
    #[arg(
        long,
        env = "TIMEFLOW_PASSWORD",
        hide_env_values = true,
        help = "Password. Read from stdin when missing"
    )]
    password: Option<String>,
}

#[derive(Debug, Parser)]
pub struct LoginCommand {
    #[arg(help = "Account email")]
    email: String,
    #[arg(
        long,
        env = "TIMEFLOW_PASSWORD",
        hide_env_values = true,
        help = "Password. Read from stdin when missing"
    )]
    password: Option<String>,
}

fn read_password(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Couldn't read the password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Creates the account and logs straight into it.
pub async fn process_register_command(
    context: &Context,
    RegisterCommand {
        email,
        name,
        password,
    }: RegisterCommand,
) -> Result<()> {
    require_guest(&context.auth.snapshot())?;
    let email = validation::email(&email)?;
    let password = read_password(password)?;
    validation::password(&password)?;
    let name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

    let api = context.repository.api();
    let user = api
        .register(&Registration {
            email: email.clone(),
            password: password.clone(),
            name,
        })
        .await?;
    info!("Registered user {}", user.id);
    api.login(&Credentials { email, password }).await?;
    println!("Registered and logged in as {}", user.email);
    Ok(())
}

pub async fn process_login_command(
    context: &Context,
    LoginCommand { email, password }: LoginCommand,
) -> Result<()> {
    require_guest(&context.auth.snapshot())?;
    let email = validation::email(&email)?;
    let password = read_password(password)?;
    let user = match context
        .repository
        .api()
        .login(&Credentials { email, password })
        .await
    {
        Ok(user) => user,
        Err(ApiError::Status { status: 401, .. }) => {
            anyhow::bail!("Wrong email or password")
        }
        Err(e) => return Err(e.into()),
    };
    println!(
        "Logged in as {}",
        user.name.as_deref().unwrap_or(user.email.as_str())
    );
    Ok(())
}

pub async fn process_logout_command(context: &Context) -> Result<()> {
    if !context.auth.snapshot().is_authenticated() {
        println!("Not logged in");
        return Ok(());
    }
    context.repository.api().logout().await?;
    println!("Logged out");
    Ok(())
}

/// Asks the server for the profile so an expired session shows up here rather than on the next
/// command.
pub async fn process_whoami_command(context: &Context) -> Result<()> {
    require_auth(&context.auth.snapshot())?;
    let user = context.repository.api().me().await?;
    match user.name {
        Some(name) => println!("{name} <{}>", user.email),
        None => println!("{}", user.email),
    }
    Ok(())
}
