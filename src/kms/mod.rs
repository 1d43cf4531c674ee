//! Master-key resolution for the fieldcrypt library
//!
//! A master key lives in a remote KMS and is only ever used to wrap and
//! unwrap keysets, never to encrypt field data directly. Clients are held in
//! a process-wide registry keyed by URI prefix; registering a prefix twice is
//! a no-op, so resolution cost is paid once per key URI rather than per field
//! operation.
//!
//! Built-in backends:
//! - `fake-kms://` — in-process master keys for tests and demos
//! - `aws-kms://`  — AWS KMS, behind the `aws-kms` cargo feature
//!
//! Custom backends implement the [`KmsClient`](crate::KmsClient) trait and
//! register via [`register_kms_client`].

mod master_key;
mod static_kms;

#[cfg(feature = "aws-kms")]
pub mod aws;

pub use master_key::MasterKeyHandle;
pub use static_kms::{StaticKmsClient, FAKE_KMS_PREFIX};

use crate::error::{Error, Result};
use crate::KmsClient;
use std::path::Path;
use std::sync::{Arc, RwLock};

// Process-wide client registry: (uri prefix, client)
static KMS_CLIENTS: RwLock<Vec<(String, Arc<dyn KmsClient>)>> = RwLock::new(Vec::new());

/// Registers a KMS client for a key URI prefix
///
/// Registration is idempotent per prefix: a prefix that is already served
/// keeps its original client.
pub fn register_kms_client(uri_prefix: impl Into<String>, client: Arc<dyn KmsClient>) {
    let prefix = uri_prefix.into();
    let mut clients = KMS_CLIENTS.write().unwrap();
    if clients.iter().any(|(p, _)| *p == prefix) {
        return;
    }
    clients.push((prefix, client));
}

/// Looks up a registered client serving the given key URI
fn registered_client_for(key_uri: &str) -> Option<Arc<dyn KmsClient>> {
    let clients = KMS_CLIENTS.read().unwrap();
    clients
        .iter()
        .find(|(prefix, _)| key_uri.starts_with(prefix.as_str()))
        .map(|(_, client)| client.clone())
}

/// Resolves a master key handle for a KMS-resident key
///
/// `credentials` may be `None` (ambient credentials) or a path to an explicit
/// credential bundle. The resolved client is registered process-wide, so
/// subsequent resolutions of the same URI reuse it.
///
/// Fails with [`Error::KeyResolution`] when the URI is malformed, the scheme
/// has no client, or the credentials locator is unreadable. Remote-key
/// accessibility surfaces on the first wrap/unwrap call.
pub async fn resolve_master_key(
    key_uri: &str,
    credentials: Option<&Path>,
) -> Result<MasterKeyHandle> {
    let scheme = uri_scheme(key_uri)?;

    if let Some(path) = credentials {
        if !path.is_file() {
            return Err(Error::KeyResolution(format!(
                "credentials locator is not a readable file: {}",
                path.display()
            )));
        }
    }

    if let Some(client) = registered_client_for(key_uri) {
        if !client.supports(key_uri) {
            return Err(Error::KeyResolution(format!(
                "registered client rejected key URI: {}",
                key_uri
            )));
        }
        crate::log::debugf(format_args!("reusing registered KMS client for {}", key_uri));
        return Ok(MasterKeyHandle::new(key_uri, client));
    }

    let client: Arc<dyn KmsClient> = match scheme {
        "fake-kms" => {
            let client = Arc::new(StaticKmsClient::new());
            register_kms_client(FAKE_KMS_PREFIX, client.clone());
            client
        }
        #[cfg(feature = "aws-kms")]
        "aws-kms" => {
            if credentials.is_some() {
                // The AWS SDK resolves credentials from the ambient chain only
                return Err(Error::KeyResolution(
                    "aws-kms does not accept an explicit credentials locator".into(),
                ));
            }
            let client = Arc::new(aws::AwsKmsClient::new().await?);
            register_kms_client(aws::AWS_KMS_PREFIX, client.clone());
            client
        }
        other => {
            return Err(Error::KeyResolution(format!(
                "no KMS client available for scheme '{}'",
                other
            )))
        }
    };

    crate::log::debugf(format_args!("registered KMS client for {}", key_uri));
    Ok(MasterKeyHandle::new(key_uri, client))
}

/// Extracts the scheme of a key URI, failing on malformed input
fn uri_scheme(key_uri: &str) -> Result<&str> {
    match key_uri.split_once("://") {
        Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => Ok(scheme),
        _ => Err(Error::KeyResolution(format!(
            "malformed key URI: {:?}",
            key_uri
        ))),
    }
}
