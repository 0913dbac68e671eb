use std::collections::HashMap;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use api::{ApiState, router};
use services::{AppServices, Clock, OpenAiCompletion, StaticVerifier};

#[derive(Clone, Debug, Parser)]
struct AppArgs {
    /// SQLite database URL or file path
    #[clap(long, env = "IELTS_DB_URL", default_value = "sqlite://ielts.sqlite3")]
    db: String,

    /// Address to bind the HTTP server on
    #[clap(long, env = "IELTS_BIND_ADDR", default_value = "127.0.0.1:8000")]
    bind: String,

    /// Comma-separated `token=subject` pairs accepted at login
    #[clap(long, env = "IELTS_AUTH_TOKENS", default_value = "")]
    auth_tokens: String,
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = AppArgs::parse();
    let db_url = normalize_sqlite_url(args.db.clone());

    // Open + migrate SQLite at startup. Keep this in the binary glue so
    // core/services stay pure.
    prepare_sqlite_file(&db_url)?;

    let verifier = StaticVerifier::new(parse_auth_tokens(&args.auth_tokens));
    if args.auth_tokens.trim().is_empty() {
        warn!("IELTS_AUTH_TOKENS is empty; every login will be rejected");
    }

    let completion = OpenAiCompletion::from_env();
    if !completion.enabled() {
        warn!("IELTS_AI_API_KEY is not set; essay grading will fail");
    }

    let services = AppServices::new_sqlite(
        &db_url,
        Clock::default_clock(),
        Arc::new(verifier),
        Arc::new(completion),
    )
    .await?;

    let app = router(ApiState::new(services));
    let listener = TcpListener::bind(&args.bind).await?;
    info!(addr = %args.bind, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn parse_auth_tokens(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (token, subject) = pair.split_once('=')?;
            let token = token.trim();
            let subject = subject.trim();
            if token.is_empty() || subject.is_empty() {
                return None;
            }
            Some((token.to_owned(), subject.to_owned()))
        })
        .collect()
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| format!("invalid sqlite url: {db_url}"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(format!("invalid sqlite url: {db_url}").into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_tokens_parse_pairs_and_skip_junk() {
        let tokens = parse_auth_tokens("t1=alice, t2=bob,,broken,=empty");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens["t1"], "alice");
        assert_eq!(tokens["t2"], "bob");
    }

    #[test]
    fn sqlite_urls_are_normalized() {
        assert_eq!(
            normalize_sqlite_url("sqlite::memory:".into()),
            "sqlite::memory:"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/a.db".into()),
            "sqlite:///tmp/a.db"
        );
        assert!(normalize_sqlite_url("sqlite:/tmp/a.db".into()).starts_with("sqlite:///"));
    }
}
