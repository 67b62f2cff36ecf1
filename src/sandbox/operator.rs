// Inputs resolved on the operator's machine before the sandbox is deployed

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use reqwest::Client;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Service echoing the caller's public IPv4 address as plain text
pub const PUBLIC_IP_ENDPOINT: &str = "https://api.ipify.org";

/// Number of random bytes in a notebook token
const TOKEN_BYTES: usize = 32;

/// Fetch the operator's public IPv4 address
pub async fn detect_public_ip(http_client: &Client, endpoint: &str) -> Result<Ipv4Addr> {
    info!("Detecting public IP via {}", endpoint);

    let response = http_client
        .get(endpoint)
        .send()
        .await
        .context("Failed to reach public IP service")?;

    let status = response.status();
    if !status.is_success() {
        bail!("Public IP service returned status {}", status);
    }

    let body = response
        .text()
        .await
        .context("Failed to read public IP response")?;

    parse_public_ip(&body)
}

fn parse_public_ip(body: &str) -> Result<Ipv4Addr> {
    let trimmed = body.trim();
    trimmed
        .parse()
        .with_context(|| format!("Public IP service returned '{}', not an IPv4 address", trimmed))
}

/// Default location of the operator's SSH public key: `~/.ssh/id_rsa.pub`
pub fn default_public_key_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ssh").join("id_rsa.pub"))
}

/// Read an SSH public key, trimmed of surrounding whitespace
pub fn read_public_key(path: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read SSH public key: {}", path.display()))?;

    let key = contents.trim();
    if key.is_empty() {
        bail!("SSH public key file is empty: {}", path.display());
    }

    debug!("Loaded SSH public key from {}", path.display());
    Ok(key.to_string())
}

/// Generate a URL-safe notebook token from 32 random bytes
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
