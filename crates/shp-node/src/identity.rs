//! Node key file: the Ed25519 secret as hex, created on first start.

use crate::error::NodeError;
use shp_crypto::{generate_keypair, keypair_from_hex, KeyPair};
use std::fs;
use std::path::Path;

pub fn load_or_create(path: &Path) -> Result<KeyPair, NodeError> {
    if path.exists() {
        let text = fs::read_to_string(path)?;
        let keypair = keypair_from_hex(&text)?;
        log::info!("🔑 Loaded node key {}", keypair.public_key_string());
        return Ok(keypair);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let keypair = generate_keypair();
    fs::write(path, keypair.secret_hex())?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    log::info!(
        "🔑 Generated node key {} at {}",
        keypair.public_key_string(),
        path.display()
    );
    Ok(keypair)
}
