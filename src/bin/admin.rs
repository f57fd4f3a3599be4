//! CLI administration tool for the civic archive API.
//!
//! Generates credentials for the admission gate and checks configuration
//! without starting the server.
//!
//! # Usage
//!
//! ```bash
//! # Generate a static API key
//! cargo run --bin admin -- key generate
//!
//! # Mint a bearer token for a client
//! cargo run --bin admin -- token mint --sub ingest-bot --scope archive:write --ttl 3600
//!
//! # Validate the environment
//! cargo run --bin admin -- config check
//! ```
//!
//! # Environment Variables
//!
//! - `JWT_SECRET`, `JWT_AUDIENCE`, `JWT_ISSUER` - used by `token mint`
//! - everything read by the server - used by `config check`

use civic_archive_api::config::{self, Config, MIN_JWT_SECRET_BYTES};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{Input, Password};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

/// CLI tool for managing the civic archive API.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Manage static API keys
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Manage bearer tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Configuration tools
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// API key subcommands.
#[derive(Subcommand)]
enum KeyAction {
    /// Generate a random API key
    Generate {
        /// Key length in characters
        #[arg(short, long, default_value_t = 48)]
        length: usize,

        /// Print only the key (for scripts)
        #[arg(long)]
        raw: bool,
    },
}

/// Token subcommands.
#[derive(Subcommand)]
enum TokenAction {
    /// Mint an HS256 token signed with JWT_SECRET
    Mint {
        /// Subject claim (prompted if omitted)
        #[arg(short, long)]
        sub: Option<String>,

        /// Granted scope; repeat for several
        #[arg(long = "scope")]
        scopes: Vec<String>,

        /// Granted role; repeat for several
        #[arg(long = "role")]
        roles: Vec<String>,

        /// Lifetime in seconds
        #[arg(long, default_value_t = 3600)]
        ttl: i64,

        /// Print only the token (for scripts)
        #[arg(long)]
        raw: bool,
    },
}

/// Configuration subcommands.
#[derive(Subcommand)]
enum ConfigAction {
    /// Load and validate configuration from the environment
    Check,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Key {
            action: KeyAction::Generate { length, raw },
        } => generate_key(length, raw),
        Commands::Token {
            action:
                TokenAction::Mint {
                    sub,
                    scopes,
                    roles,
                    ttl,
                    raw,
                },
        } => mint_token(sub, scopes, roles, ttl, raw),
        Commands::Config {
            action: ConfigAction::Check,
        } => check_config(),
    }
}

/// Generates a random alphanumeric key and prints it with its SHA-256
/// fingerprint.
fn generate_key(length: usize, raw: bool) -> Result<()> {
    if length < 32 {
        anyhow::bail!("Key length must be at least 32 characters, got {}", length);
    }

    let key = random_key(length);

    if raw {
        println!("{}", key);
        return Ok(());
    }

    println!("{}", "🔑 API Key".bright_blue().bold());
    println!();
    println!("  Key:         {}", key.bright_yellow().bold());
    println!("  Fingerprint: {}", fingerprint(&key).bright_black());
    println!();
    println!("{}", "Set it on the server:".bright_white());
    println!("  {}=true", "REQUIRE_API_KEY".bright_cyan());
    println!("  {}={}", "API_KEY".bright_cyan(), key);
    println!();
    println!("{}", "Example:".bright_white());
    println!(
        "  curl -H \"X-API-Key: {}\" http://localhost:8000/api/news",
        key.bright_yellow()
    );
    println!();

    Ok(())
}

/// Mints a token the server will accept with the current environment.
fn mint_token(
    sub: Option<String>,
    scopes: Vec<String>,
    roles: Vec<String>,
    ttl: i64,
    raw: bool,
) -> Result<()> {
    if ttl <= 0 {
        anyhow::bail!("--ttl must be positive, got {}", ttl);
    }

    let config = Config::from_env().context("Failed to read configuration")?;

    let secret = match config.jwt_secret.clone() {
        Some(secret) => secret,
        None => Password::new()
            .with_prompt("JWT secret")
            .interact()
            .context("JWT_SECRET is not set and no secret was entered")?,
    };
    if secret.len() < MIN_JWT_SECRET_BYTES {
        anyhow::bail!(
            "JWT secret must be at least {} bytes, got {}",
            MIN_JWT_SECRET_BYTES,
            secret.len()
        );
    }

    let subject = match sub {
        Some(s) => s,
        None => Input::new().with_prompt("Subject").interact_text()?,
    };

    let now = Utc::now().timestamp();
    let claims = build_claims(
        &subject,
        now,
        ttl,
        &scopes,
        &roles,
        config.jwt_audience.as_deref(),
        config.jwt_issuer.as_deref(),
    );

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to sign token")?;

    if raw {
        println!("{}", token);
        return Ok(());
    }

    println!("{}", "🎫 Bearer Token".bright_blue().bold());
    println!();
    println!("  Subject: {}", subject.cyan());
    println!(
        "  Scopes:  {}",
        if scopes.is_empty() { "-".to_string() } else { scopes.join(" ") }
    );
    println!(
        "  Roles:   {}",
        if roles.is_empty() { "-".to_string() } else { roles.join(", ") }
    );
    println!("  Expires: {}s from now", ttl);
    println!();
    println!("  {}", token.bright_yellow());
    println!();
    println!("{}", "Add this to your requests:".bright_white());
    println!("  {}: Bearer <token>", "Authorization".bright_cyan());
    println!();

    Ok(())
}

/// Loads configuration the way the server does and reports the result.
fn check_config() -> Result<()> {
    println!("{}", "🔍 Configuration Check".bright_blue().bold());
    println!();

    match config::load_from_env() {
        Ok(config) => {
            let status = |on: bool| if on { "enabled".green() } else { "disabled".bright_black() };

            println!("  Listen:       {}", config.listen_addr.cyan());
            println!("  Strict mode:  {}", status(config.is_strict_mode()));
            println!("  API key:      {}", status(config.require_api_key));
            println!("  JWT:          {}", status(config.require_jwt));
            if config.rate_limit_per_minute == 0 {
                println!("  Rate limit:   {}", status(false));
            } else {
                println!(
                    "  Rate limit:   {}/min via {}",
                    config.rate_limit_per_minute.to_string().cyan(),
                    config.rate_limit_backend.cyan()
                );
            }
            if let Some(ref redis_url) = config.redis_url {
                println!("  Redis:        {}", config::mask_connection_string(redis_url));
            }
            println!();
            println!("{}", "✅ Configuration is valid".green().bold());
            Ok(())
        }
        Err(e) => {
            println!("{} {:#}", "❌".red(), e);
            Err(e)
        }
    }
}

fn random_key(length: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    let mut rng = rand::rng();

    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Short SHA-256 fingerprint for telling keys apart in logs and tickets.
fn fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..8])
}

fn build_claims(
    subject: &str,
    now: i64,
    ttl: i64,
    scopes: &[String],
    roles: &[String],
    audience: Option<&str>,
    issuer: Option<&str>,
) -> Value {
    let mut claims = Map::new();
    claims.insert("sub".into(), json!(subject));
    claims.insert("iat".into(), json!(now));
    claims.insert("nbf".into(), json!(now));
    claims.insert("exp".into(), json!(now + ttl));
    if !scopes.is_empty() {
        claims.insert("scope".into(), json!(scopes.join(" ")));
    }
    if !roles.is_empty() {
        claims.insert("roles".into(), json!(roles));
    }
    if let Some(aud) = audience {
        claims.insert("aud".into(), json!(aud));
    }
    if let Some(iss) = issuer {
        claims.insert("iss".into(), json!(iss));
    }
    Value::Object(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_key_shape() {
        let key = random_key(48);
        assert_eq!(key.len(), 48);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(key, random_key(48));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_eq!(fingerprint("abc").len(), 16);
    }

    #[test]
    fn test_build_claims() {
        let claims = build_claims(
            "bot",
            1_000,
            60,
            &["archive:read".to_string(), "archive:write".to_string()],
            &[],
            Some("civic-archive"),
            None,
        );

        assert_eq!(claims["sub"], "bot");
        assert_eq!(claims["exp"], 1_060);
        assert_eq!(claims["scope"], "archive:read archive:write");
        assert_eq!(claims["aud"], "civic-archive");
        assert!(claims.get("roles").is_none());
        assert!(claims.get("iss").is_none());
    }
}
