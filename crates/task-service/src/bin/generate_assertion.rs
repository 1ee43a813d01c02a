//! Generate a client assertion for `POST /token`.
//!
//! Reads a client RSA private key (PKCS#8 or PKCS#1 PEM) and the matching
//! certificate (PEM), and prints a signed RS256 assertion with the
//! certificate in `x5c`.
//!
//! ```text
//! generate-assertion --key secret/client.key --cert secret/client.crt \
//!     --issuer issuer-X --subject client-A
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use task_service::auth::{sign_client_assertion, AssertionRequest};
use task_service::config::parse_duration;

#[derive(Parser, Debug)]
#[command(name = "generate-assertion")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Client private key (PEM)
    #[arg(long, default_value = "secret/client.key")]
    key: PathBuf,

    /// Client certificate (PEM), embedded as `x5c`
    #[arg(long, default_value = "secret/client.crt")]
    cert: PathBuf,

    /// Issuer claim; must equal the service's trusted issuer
    #[arg(long, env = "JWT_ISSUER")]
    issuer: String,

    /// Client identity (`sub`)
    #[arg(long)]
    subject: String,

    #[arg(long, default_value = "http://localhost:8080/token")]
    audience: String,

    /// Assertion lifetime, e.g. `5m` or `1h`
    #[arg(long, default_value = "1h", value_parser = parse_duration)]
    lifetime: Duration,

    /// Optional `jti` claim
    #[arg(long)]
    jti: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let key_pem = std::fs::read(&cli.key)
        .map_err(|e| format!("failed to read key {}: {e}", cli.key.display()))?;
    let cert_pem = std::fs::read(&cli.cert)
        .map_err(|e| format!("failed to read certificate {}: {e}", cli.cert.display()))?;

    let request = AssertionRequest {
        issuer: cli.issuer,
        subject: cli.subject,
        audience: cli.audience,
        lifetime: cli.lifetime,
        jti: cli.jti,
    };

    let assertion = sign_client_assertion(&key_pem, &cert_pem, &request)?;
    println!("{assertion}");

    Ok(())
}
