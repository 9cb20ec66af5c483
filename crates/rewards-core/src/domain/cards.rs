//! Cards - reward cards のペイロード
//!
//! CardFetcher は JSON の中身を解釈しません（CardBytes はただのバイト列）。
//! 構造が必要な呼び出し側だけが `CardBytes::decode` で CardsDocument に変換します。

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// CardBytes は取得した JSON ドキュメントの生バイト列
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CardBytes(Bytes);

impl CardBytes {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_inner(self) -> Bytes {
        self.0
    }

    /// JSON として CardsDocument にデコード
    pub fn decode(&self) -> Result<CardsDocument, serde_json::Error> {
        serde_json::from_slice(&self.0)
    }
}

impl Deref for CardBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for CardBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Bytes> for CardBytes {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for CardBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<&'static str> for CardBytes {
    fn from(s: &'static str) -> Self {
        Self(Bytes::from_static(s.as_bytes()))
    }
}

/// CardsDocument は cards JSON のトップレベル
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardsDocument {
    #[serde(default)]
    pub card: Vec<Card>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub title: String,
    pub description: String,
    pub url: String,
    pub thumbnail: String,
}
