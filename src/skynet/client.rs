use reqwest::StatusCode;

use crate::crypto::{hash_data_key, KeyPair, PublicKey};
use crate::error::SkynetError;

use super::skylink::Skylink;
use super::types::*;

/// HTTP client for a single Skynet portal
#[derive(Clone, Debug)]
pub struct SkynetClient {
    /// Portal base URL without trailing slash
    portal_url: String,

    /// reqwest::Client is internally Arc-based
    http_client: reqwest::Client,
}

impl SkynetClient {
    pub fn new(portal_url: &str) -> Self {
        Self::with_http_client(portal_url, reqwest::Client::new())
    }

    pub fn with_http_client(portal_url: &str, http_client: reqwest::Client) -> Self {
        Self {
            portal_url: portal_url.trim_end_matches('/').to_string(),
            http_client,
        }
    }

    pub fn portal_url(&self) -> &str {
        &self.portal_url
    }

    /// Look up the registry entry for (public key, data key)
    ///
    /// Returns `None` when the portal has no entry. The signature is verified
    /// against `public_key` before the entry is returned.
    pub async fn get_entry(
        &self,
        public_key: &PublicKey,
        data_key: &str,
    ) -> Result<Option<SignedRegistryEntry>, SkynetError> {
        let data_key_hash = hash_data_key(data_key);
        let response = self
            .http_client
            .get(format!("{}/skynet/registry", self.portal_url))
            .query(&[
                ("publickey", public_key.to_skynet_string()),
                ("datakey", hex::encode(data_key_hash)),
            ])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            log::debug!("No registry entry for data key '{}'", data_key);
            return Ok(None);
        }
        let response = ensure_success(response).await?;

        let lookup: RegistryLookupResponse = response.json().await?;
        let signed = lookup.into_signed_entry(public_key, data_key_hash)?;
        log::debug!(
            "Registry entry for '{}' at revision {}",
            data_key,
            signed.entry.revision
        );
        Ok(Some(signed))
    }

    /// Sign and publish a registry entry
    pub async fn set_entry(
        &self,
        keys: &KeyPair,
        entry: &RegistryEntry,
    ) -> Result<(), SkynetError> {
        let signature = keys.sign(&entry.digest());
        let body = RegistryUpdateRequest::new(&keys.public_key(), entry, &signature);

        let response = self
            .http_client
            .post(format!("{}/skynet/registry", self.portal_url))
            .json(&body)
            .send()
            .await?;
        ensure_success(response).await?;

        log::debug!("Registry entry published at revision {}", entry.revision);
        Ok(())
    }

    /// Upload bytes as a skyfile and return its skylink
    pub async fn upload_bytes(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Skylink, SkynetError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http_client
            .post(format!("{}/skynet/skyfile", self.portal_url))
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let upload: UploadResponse = response.json().await?;
        let skylink: Skylink = upload.skylink.parse()?;
        log::debug!("Uploaded {} as {}", file_name, skylink);
        Ok(skylink)
    }

    /// Download the content behind a skylink
    pub async fn download_bytes(&self, skylink: &Skylink) -> Result<Vec<u8>, SkynetError> {
        let response = self
            .http_client
            .get(format!("{}/{}", self.portal_url, skylink))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Map non-2xx responses to `SkynetError::Portal` carrying the body text
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, SkynetError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SkynetError::portal(status.as_u16(), body))
}
