use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::core::{Result, ScopeError};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
}

/// Database connection configuration.
///
/// The scope does not validate or interpret these fields; they are passed
/// through to the pool provider at process start. The password is stored
/// encrypted and must be decrypted through a [`PasswordDecryptor`] before
/// the provider sees it.
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    pub driver: String,
    pub url: String,
    pub user: Option<String>,
    /// Encrypted password as stored on disk.
    pub password: Option<String>,
}

/// Decrypts the stored database password.
///
/// Stands in for whatever external secret utility the deployment uses; the
/// library never implements the cipher itself.
pub trait PasswordDecryptor {
    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// Decryptor for configurations that store the password in the clear.
pub struct PlaintextPassword;

impl PasswordDecryptor for PlaintextPassword {
    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        Ok(ciphertext.to_string())
    }
}

/// Resolved credentials, ready to hand to a pool provider.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: Option<String>,
    pub password: Option<String>,
}

impl DatabaseConfig {
    /// Resolves the configured credentials, decrypting the password.
    pub fn credentials<D: PasswordDecryptor>(&self, decryptor: &D) -> Result<Credentials> {
        let password = match &self.password {
            Some(ciphertext) => Some(decryptor.decrypt(ciphertext)?),
            None => None,
        };
        Ok(Credentials {
            user: self.user.clone(),
            password,
        })
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| ScopeError::Config(e.to_string()))
}
