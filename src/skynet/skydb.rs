// SkyDB: JSON documents addressed by (public key, data key)
//
// The registry entry for a data key holds the raw skylink of the latest
// upload; the upload holds the JSON wrapped in a small envelope.

use serde_json::{json, Value};

use crate::crypto::{hash_data_key, KeyPair, PublicKey};
use crate::error::SkynetError;

use super::client::SkynetClient;
use super::skylink::{Skylink, RAW_SKYLINK_SIZE};
use super::types::RegistryEntry;

/// Envelope version written by `set_json`
const JSON_ENVELOPE_VERSION: u64 = 2;

/// A JSON document read from SkyDB
#[derive(Debug, Clone, PartialEq)]
pub struct JsonData {
    pub data: Value,
    /// Registry revision the document was published at
    pub revision: u64,
    pub data_link: Skylink,
}

impl SkynetClient {
    /// Read the JSON document under (public key, data key)
    ///
    /// Returns `None` if nothing was ever published there.
    pub async fn get_json(
        &self,
        public_key: &PublicKey,
        data_key: &str,
    ) -> Result<Option<JsonData>, SkynetError> {
        let Some(signed) = self.get_entry(public_key, data_key).await? else {
            return Ok(None);
        };

        let data_link = skylink_from_entry_data(&signed.entry.data)?;
        let body = self.download_bytes(&data_link).await?;
        let value: Value = serde_json::from_slice(&body)?;

        Ok(Some(JsonData {
            data: unwrap_envelope(value),
            revision: signed.entry.revision,
            data_link,
        }))
    }

    /// Publish `data` as the JSON document under the key pair and data key
    ///
    /// Re-reads the current revision right before writing and publishes at
    /// revision + 1 (0 for a fresh data key). Returns the revision written.
    pub async fn set_json(
        &self,
        keys: &KeyPair,
        data_key: &str,
        data: &Value,
    ) -> Result<u64, SkynetError> {
        let revision = match self.get_entry(&keys.public_key(), data_key).await? {
            Some(existing) => existing
                .entry
                .revision
                .checked_add(1)
                .ok_or(SkynetError::RevisionOverflow)?,
            None => 0,
        };

        let body = serde_json::to_vec(&json!({
            "_data": data,
            "_v": JSON_ENVELOPE_VERSION,
        }))?;
        let file_name = format!("dk:{}", hex::encode(hash_data_key(data_key)));
        let data_link = self
            .upload_bytes(&file_name, body, "application/json")
            .await?;

        let entry = RegistryEntry {
            data_key_hash: hash_data_key(data_key),
            data: data_link.as_bytes().to_vec(),
            revision,
        };
        self.set_entry(keys, &entry).await?;

        log::debug!("SkyDB '{}' written at revision {}", data_key, revision);
        Ok(revision)
    }
}

/// Entries written by older tools may hold the skylink as text
fn skylink_from_entry_data(data: &[u8]) -> Result<Skylink, SkynetError> {
    if data.len() == RAW_SKYLINK_SIZE {
        return Skylink::from_bytes(data);
    }
    let text = std::str::from_utf8(data)
        .map_err(|_| SkynetError::invalid_entry("entry data is neither a raw nor a text skylink"))?;
    text.parse()
}

fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("_data") => {
            map.remove("_data").unwrap_or(Value::Null)
        }
        other => other,
    }
}
