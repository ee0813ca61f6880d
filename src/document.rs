//! Typed model of the shared user document
//!
//! The document is one JSON object keyed by public address. Field names on the
//! wire stay as other clients of the same document expect them (`NFTs`,
//! `collections`, ...); fields this crate does not know are carried through
//! untouched so a rewrite never drops them. Decoding is lenient: `null` reads
//! as the field default, and a record that still does not fit the model is
//! kept verbatim instead of failing the whole document.

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::ops::Index;

use crate::error::StoreError;

/// Longest username accepted by `UserUpdate`
pub const MAX_USERNAME_LENGTH: usize = 64;

/// NFT metadata as stored per collection, keyed by `image`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nft {
    pub name: String,
    pub description: String,
    pub image: String,
}

impl Nft {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            image: image.into(),
        }
    }
}

/// NFTs of one contract, keyed by image
///
/// Other clients put non-NFT entries next to the NFTs, most commonly a
/// collection `title`. Those are kept aside and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    nfts: IndexMap<String, Nft>,
    extra: Map<String, Value>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nfts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nfts.is_empty()
    }

    pub fn get(&self, image: &str) -> Option<&Nft> {
        self.nfts.get(image)
    }

    pub fn contains_key(&self, image: &str) -> bool {
        self.nfts.contains_key(image)
    }

    /// Insert or replace the NFT under `image`
    pub fn insert(&mut self, image: String, nft: Nft) -> Option<Nft> {
        self.extra.remove(&image);
        self.nfts.insert(image, nft)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Nft> {
        self.nfts.iter()
    }

    /// Title stored inside the collection object itself
    pub fn title(&self) -> Option<&str> {
        self.extra.get("title").and_then(Value::as_str)
    }

    /// Entries that are not NFTs
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

impl Index<&str> for Collection {
    type Output = Nft;

    fn index(&self, image: &str) -> &Nft {
        &self.nfts[image]
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.nfts.len() + self.extra.len()))?;
        for (image, nft) in &self.nfts {
            map.serialize_entry(image, nft)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Collection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Option::<IndexMap<String, Value>>::deserialize(deserializer)?;
        let mut collection = Collection::new();
        for (key, value) in entries.unwrap_or_default() {
            match Nft::deserialize(&value) {
                Ok(nft) => {
                    collection.nfts.insert(key, nft);
                }
                Err(_) => {
                    collection.extra.insert(key, value);
                }
            }
        }
        Ok(collection)
    }
}

/// contract address -> collection, in insertion order
pub type Collections = IndexMap<String, Collection>;

/// Reads `null` as the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Everything stored for one public address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,

    /// Transaction hashes, unique, in log order
    #[serde(default, deserialize_with = "null_as_default")]
    pub transactions: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub collections: Collections,

    /// Legacy append-only contract address log, no dedup
    #[serde(rename = "NFTs", default, skip_serializing_if = "Option::is_none")]
    pub nfts: Option<Vec<String>>,

    /// contract address -> human readable collection title
    #[serde(
        rename = "collectionTitles",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub collection_titles: IndexMap<String, String>,

    /// Fields written by other clients
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    /// Append a transaction hash unless already logged; true if appended
    pub fn log_transaction(&mut self, hash: &str) -> bool {
        if self.transactions.iter().any(|h| h == hash) {
            return false;
        }
        self.transactions.push(hash.to_string());
        true
    }

    /// Append to the legacy contract log (duplicates kept)
    pub fn log_contract_address(&mut self, contract_address: &str) {
        self.nfts
            .get_or_insert_with(Vec::new)
            .push(contract_address.to_string());
    }

    /// Insert or replace an NFT, keyed by its image
    pub fn upsert_nft(&mut self, contract_address: &str, nft: Nft) {
        self.collections
            .entry(contract_address.to_string())
            .or_default()
            .insert(nft.image.clone(), nft);
    }

    /// First collection (in insertion order) with this title
    ///
    /// A collection matches on its `collectionTitles` entry or on a `title`
    /// stored inside the collection object.
    pub fn collection_by_title(&self, title: &str) -> Option<(&str, &Collection)> {
        self.collections
            .iter()
            .find(|(contract, collection)| {
                self.collection_titles.get(contract.as_str()).map(String::as_str) == Some(title)
                    || collection.title() == Some(title)
            })
            .map(|(contract, collection)| (contract.as_str(), collection))
    }
}

/// Partial update of a user record; only `Some` fields are replaced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collections: Option<Collections>,
}

impl UserUpdate {
    pub fn username(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.transactions.is_none() && self.collections.is_none()
    }

    /// Reject values the document must never hold
    pub fn validate(&self) -> Result<(), StoreError> {
        if let Some(username) = &self.username {
            if username.chars().count() > MAX_USERNAME_LENGTH {
                return Err(StoreError::InvalidUpdate(format!(
                    "username longer than {} characters",
                    MAX_USERNAME_LENGTH
                )));
            }
            if username.chars().any(char::is_control) {
                return Err(StoreError::InvalidUpdate(
                    "username contains control characters".to_string(),
                ));
            }
        }
        if let Some(transactions) = &self.transactions {
            let mut seen = std::collections::HashSet::new();
            if let Some(dup) = transactions.iter().find(|h| !seen.insert(h.as_str())) {
                return Err(StoreError::InvalidUpdate(format!(
                    "duplicate transaction hash {}",
                    dup
                )));
            }
        }
        if let Some(collections) = &self.collections {
            for (contract, collection) in collections {
                if let Some((key, _)) = collection.iter().find(|(key, nft)| *key != &nft.image) {
                    return Err(StoreError::InvalidUpdate(format!(
                        "collection {} keys NFT under '{}' instead of its image",
                        contract, key
                    )));
                }
            }
        }
        Ok(())
    }

    /// Merge into `record`, field by field
    pub fn apply_to(self, record: &mut UserRecord) {
        if let Some(username) = self.username {
            record.username = username;
        }
        if let Some(transactions) = self.transactions {
            record.transactions = transactions;
        }
        if let Some(collections) = self.collections {
            record.collections = collections;
        }
    }
}

/// A user record together with the address it is stored under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub record: UserRecord,
    #[serde(rename = "publicAddress")]
    pub public_address: String,
}

/// One entry of the document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
enum Entry {
    Record(UserRecord),
    /// Value that does not decode as a record, written back as found
    Unreadable(Value),
}

/// public address -> user record, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document {
    users: IndexMap<String, Entry>,
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = IndexMap::<String, Value>::deserialize(deserializer)?;
        let users = raw
            .into_iter()
            .map(|(address, value)| {
                let entry = match UserRecord::deserialize(&value) {
                    Ok(record) => Entry::Record(record),
                    Err(e) => {
                        log::warn!("Keeping unreadable record for {} as is: {}", address, e);
                        Entry::Unreadable(value)
                    }
                };
                (address, entry)
            })
            .collect();
        Ok(Self { users })
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<Value, StoreError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Number of addresses, readable or not
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.users.contains_key(address)
    }

    pub fn user(&self, address: &str) -> Option<&UserRecord> {
        match self.users.get(address)? {
            Entry::Record(record) => Some(record),
            Entry::Unreadable(_) => None,
        }
    }

    pub fn user_mut(&mut self, address: &str) -> Option<&mut UserRecord> {
        match self.users.get_mut(address)? {
            Entry::Record(record) => Some(record),
            Entry::Unreadable(_) => None,
        }
    }

    /// Insert a default record; false if the address was already present
    pub fn onboard(&mut self, address: &str) -> bool {
        if self.users.contains_key(address) {
            return false;
        }
        self.users
            .insert(address.to_string(), Entry::Record(UserRecord::default()));
        true
    }

    /// Record for `address`, created with defaults if missing
    ///
    /// `None` when the address holds a value that is not a readable record.
    pub fn user_or_default(&mut self, address: &str) -> Option<&mut UserRecord> {
        match self
            .users
            .entry(address.to_string())
            .or_insert_with(|| Entry::Record(UserRecord::default()))
        {
            Entry::Record(record) => Some(record),
            Entry::Unreadable(_) => None,
        }
    }

    /// First user (in insertion order) with this username
    pub fn find_by_username(&self, username: &str) -> Option<UserProfile> {
        self.iter()
            .find(|(_, record)| record.username == username)
            .map(|(address, record)| UserProfile {
                record: record.clone(),
                public_address: address.clone(),
            })
    }

    /// Readable records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &UserRecord)> {
        self.users.iter().filter_map(|(address, entry)| match entry {
            Entry::Record(record) => Some((address, record)),
            Entry::Unreadable(_) => None,
        })
    }

    /// Addresses whose value could not be decoded
    pub fn unreadable(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.users.iter().filter_map(|(address, entry)| match entry {
            Entry::Unreadable(value) => Some((address, value)),
            Entry::Record(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_defaults_for_missing_fields() {
        let doc = Document::from_value(json!({"0xA": {"username": "ape"}})).unwrap();
        let user = doc.user("0xA").unwrap();
        assert_eq!(user.username, "ape");
        assert!(user.transactions.is_empty());
        assert!(user.collections.is_empty());
        assert!(user.nfts.is_none());
    }

    #[test]
    fn test_wire_shape() {
        let mut doc = Document::new();
        doc.onboard("0xA");
        let user = doc.user_mut("0xA").unwrap();
        user.upsert_nft("0xC", Nft::new("X", "d", "img1"));
        user.log_contract_address("0xC");

        assert_eq!(
            doc.to_value().unwrap(),
            json!({
                "0xA": {
                    "username": "",
                    "transactions": [],
                    "collections": {
                        "0xC": {"img1": {"name": "X", "description": "d", "image": "img1"}}
                    },
                    "NFTs": ["0xC"]
                }
            })
        );
    }

    #[test]
    fn test_unknown_fields_survive() {
        let value = json!({"0xA": {"username": "ape", "avatar": "ipfs://x", "transactions": []}});
        let doc = Document::from_value(value).unwrap();
        let back = doc.to_value().unwrap();
        assert_eq!(back["0xA"]["avatar"], json!("ipfs://x"));
    }

    #[test]
    fn test_log_transaction_dedups() {
        let mut user = UserRecord::default();
        assert!(user.log_transaction("0x1"));
        assert!(!user.log_transaction("0x1"));
        assert!(user.log_transaction("0x2"));
        assert_eq!(user.transactions, vec!["0x1", "0x2"]);
    }

    #[test]
    fn test_update_merges_only_present_fields() {
        let mut user = UserRecord::default();
        user.log_transaction("0x1");

        UserUpdate::username("ape").apply_to(&mut user);
        assert_eq!(user.username, "ape");
        assert_eq!(user.transactions, vec!["0x1"]);
    }

    #[test]
    fn test_update_validation() {
        assert!(UserUpdate::username("ape").validate().is_ok());
        assert!(UserUpdate::username("a".repeat(MAX_USERNAME_LENGTH + 1)).validate().is_err());
        assert!(UserUpdate::username("bad\nname").validate().is_err());

        let dup = UserUpdate {
            transactions: Some(vec!["0x1".into(), "0x1".into()]),
            ..Default::default()
        };
        assert!(dup.validate().is_err());

        let mut collection = Collection::new();
        collection.insert("wrong-key".to_string(), Nft::new("X", "d", "img1"));
        let mut collections = Collections::new();
        collections.insert("0xC".into(), collection);
        let misplaced = UserUpdate {
            collections: Some(collections),
            ..Default::default()
        };
        assert!(misplaced.validate().is_err());
    }

    #[test]
    fn test_collection_by_title() {
        let mut user = UserRecord::default();
        user.upsert_nft("0xC1", Nft::new("X", "d", "img1"));
        user.upsert_nft("0xC2", Nft::new("Y", "d", "img2"));
        user.collection_titles.insert("0xC2".into(), "Apes".into());
        // Title without a collection is skipped
        user.collection_titles.insert("0xC0".into(), "Apes".into());

        let (contract, collection) = user.collection_by_title("Apes").unwrap();
        assert_eq!(contract, "0xC2");
        assert!(collection.contains_key("img2"));
        assert!(user.collection_by_title("Nope").is_none());
    }

    #[test]
    fn test_nulls_and_collection_titles_decode() {
        let value = json!({
            "0xA": {
                "username": "ape",
                "collections": {
                    "0xC": {
                        "title": "Apes",
                        "img1": {"name": "X", "description": "d", "image": "img1"}
                    }
                }
            },
            "0xB": {"username": null, "transactions": null, "collections": null, "NFTs": null}
        });
        let doc = Document::from_value(value).unwrap();

        let alice = doc.user("0xA").unwrap();
        let collection = &alice.collections["0xC"];
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.title(), Some("Apes"));
        let (contract, found) = alice.collection_by_title("Apes").unwrap();
        assert_eq!(contract, "0xC");
        assert!(found.contains_key("img1"));

        let bob = doc.user("0xB").unwrap();
        assert_eq!(bob.username, "");
        assert!(bob.transactions.is_empty());
        assert!(bob.collections.is_empty());
        assert!(bob.nfts.is_none());

        // The collection title is written back next to the NFTs
        let back = doc.to_value().unwrap();
        assert_eq!(back["0xA"]["collections"]["0xC"]["title"], json!("Apes"));
        assert_eq!(back["0xA"]["collections"]["0xC"]["img1"]["name"], json!("X"));
    }

    #[test]
    fn test_unreadable_record_is_kept_verbatim() {
        let value = json!({
            "0xA": {"username": "ape"},
            "0xB": {"transactions": 7},
            "0xC": "not a record"
        });
        let mut doc = Document::from_value(value.clone()).unwrap();

        assert_eq!(doc.len(), 3);
        assert_eq!(doc.user("0xA").unwrap().username, "ape");
        assert!(doc.user("0xB").is_none());
        assert!(doc.contains("0xB"));
        assert_eq!(doc.unreadable().count(), 2);

        // Neither replaced by onboarding nor by an NFT write
        assert!(!doc.onboard("0xB"));
        assert!(doc.user_or_default("0xC").is_none());
        let back = doc.to_value().unwrap();
        assert_eq!(back["0xB"], value["0xB"]);
        assert_eq!(back["0xC"], value["0xC"]);
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut doc = Document::new();
        doc.onboard("0xZED");
        doc.onboard("0xAAA");
        doc.user_mut("0xZED").unwrap().username = "ape".into();
        doc.user_mut("0xAAA").unwrap().username = "ape".into();

        let addresses: Vec<&str> = doc.iter().map(|(address, _)| address.as_str()).collect();
        assert_eq!(addresses, vec!["0xZED", "0xAAA"]);
        assert_eq!(doc.find_by_username("ape").unwrap().public_address, "0xZED");

        let text = serde_json::to_string(&doc).unwrap();
        assert!(text.find("0xZED").unwrap() < text.find("0xAAA").unwrap());

        let reread: Document = serde_json::from_str(&text).unwrap();
        let addresses: Vec<&str> = reread.iter().map(|(address, _)| address.as_str()).collect();
        assert_eq!(addresses, vec!["0xZED", "0xAAA"]);
    }

    #[test]
    fn test_profile_serializes_flat() {
        let mut doc = Document::new();
        doc.onboard("0xA");
        doc.user_mut("0xA").unwrap().username = "ape".into();

        let profile = doc.find_by_username("ape").unwrap();
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["publicAddress"], json!("0xA"));
        assert_eq!(value["username"], json!("ape"));
    }
}
