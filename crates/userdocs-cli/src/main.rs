// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use userdocs_app::{AuthToken, Credentials};
use userdocs_client::Client;

const TOKEN_ENV: &str = "USERDOCS_TOKEN";
const PASSWORD_ENV: &str = "USERDOCS_PASSWORD";
const DEFAULT_LOG_FILTER: &str = "userdocs=info,userdocs_app=warn,userdocs_client=warn";
const VERBOSE_LOG_FILTER: &str = "userdocs=debug,userdocs_app=debug,userdocs_client=debug";

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    init_logging(options.verbose);

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `userdocs --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let client = Client::new(config.base_url(), config.api_prefix(), config.timeout()?)
        .with_context(|| {
            format!(
                "invalid [server] config in {}; fix base_url/api_prefix/timeout values",
                options.config_path.display()
            )
        })?;
    let notification_ttl = config.notification_ttl()?;
    if options.check_only {
        return Ok(());
    }

    let (token, user) = resolve_token(&client, &config, options.username.as_deref())?;
    info!(server = client.base_url(), user = user.as_deref(), "session ready");
    runtime::run(Arc::new(client), token, user, notification_ttl)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Returns the session token and, when it came from a login, the user name.
fn resolve_token(
    client: &Client,
    config: &Config,
    username: Option<&str>,
) -> Result<(AuthToken, Option<String>)> {
    if let Ok(token) = env::var(TOKEN_ENV)
        && !token.trim().is_empty()
    {
        return Ok((AuthToken::new(token.trim()), None));
    }

    let username = username.or(config.username()).ok_or_else(|| {
        anyhow!("no username; pass --user <name>, set [auth].username, or export {TOKEN_ENV}")
    })?;
    let password = match env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => prompt_password(username)?,
    };

    let token = client
        .login(&Credentials {
            username: username.to_owned(),
            password,
        })
        .with_context(|| format!("log in to {}", client.base_url()))?;
    Ok((token, Some(username.to_owned())))
}

fn prompt_password(username: &str) -> Result<String> {
    eprint!("password for {username}: ");
    io::stderr().flush().context("flush prompt")?;
    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read password from stdin")?;
    if read == 0 {
        bail!("no password on stdin; set {PASSWORD_ENV} or {TOKEN_ENV}");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    username: Option<String>,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    verbose: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        username: None,
        print_config_path: false,
        print_example: false,
        check_only: false,
        verbose: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--user" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--user requires a username such as user1"))?;
                options.username = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--verbose" | "-v" => {
                options.verbose = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("userdocs");
    println!("  --config <path>          Use a specific config path");
    println!("  --user <name>            Log in as this user (overrides [auth].username)");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config and exit");
    println!("  --verbose                Debug logging on stderr");
    println!("  --help                   Show this help");
    println!();
    println!("  {TOKEN_ENV} skips login; {PASSWORD_ENV} avoids the password prompt.");
}
