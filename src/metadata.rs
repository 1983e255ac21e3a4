use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use url::Url;

use crate::validate::{self, ValidationError};

/// ルートとなるメタデータレコード
///
/// `Deserialize` は [`validate::validate`] を経由するため、
/// `serde_json::from_str::<RogueMetadata>` でも同じ検証が走る。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct RogueMetadata {
    pub name: String,
    pub description: String,
    pub image: Url,
    pub animation_url: Option<Url>,
    pub attributes: Vec<Attribute>,
    pub unlockable_content_ipfs: Option<Url>,
    pub external_url: Option<Url>,
    /// 省略時は空リスト。明示的な `null` のときだけ `None`
    pub tags: Option<Vec<String>>,
    pub metadata_version: String,
    pub prompt_version: String,
    pub minting: Option<MintingInfo>,
    /// タイムスタンプ形式のチェックはしない
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Attribute {
    pub trait_type: String,
    pub value: AttributeValue,
}

/// 属性値。文字列 → 整数 → 浮動小数 → 真偽値 の順にマッチさせる
///
/// 整数は i64 と u64 の両方の範囲を受けるため `i128` で持つ。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, try_from = "Value")]
pub enum AttributeValue {
    Text(String),
    Integer(i128),
    Float(f64),
    Boolean(bool),
}

/// ミント時の来歴情報。全フィールド任意
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct MintingInfo {
    pub chain: Option<String>,
    pub contract_address: Option<String>,
    pub token_id: Option<TokenId>,
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged, try_from = "Value")]
pub enum TokenId {
    Text(String),
    Integer(i128),
}

/// テキストからの読み込みエラー（デコード失敗と検証失敗を区別する）
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read metadata: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl RogueMetadata {
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        validate::validate(value)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&value)?)
    }

    /// YAML は一度 JSON の値モデルに落としてから同じ検証にかける
    pub fn from_yaml_str(text: &str) -> Result<Self, ParseError> {
        let value: Value = serde_yaml::from_str(text)?;
        Ok(Self::from_value(&value)?)
    }

    /// `tags` が `null` だった場合も空スライスとして扱う
    pub fn tags(&self) -> &[String] {
        self.tags.as_deref().unwrap_or(&[])
    }
}

impl Attribute {
    pub fn new(trait_type: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            trait_type: trait_type.into(),
            value: value.into(),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        validate::validate_attribute(value)
    }
}

impl MintingInfo {
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        validate::validate_minting(value)
    }
}

impl TryFrom<Value> for RogueMetadata {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

impl TryFrom<Value> for Attribute {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

impl TryFrom<Value> for MintingInfo {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

impl TryFrom<Value> for AttributeValue {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        validate::validate_attribute_value(&value)
    }
}

impl TryFrom<Value> for TokenId {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        validate::validate_token_id(&value)
    }
}

impl AttributeValue {
    /// 集計やレポートで使うバリアント名
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Text(_) => "text",
            AttributeValue::Integer(_) => "integer",
            AttributeValue::Float(_) => "float",
            AttributeValue::Boolean(_) => "boolean",
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Float(x) => write!(f, "{}", x),
            AttributeValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i.into())
    }
}

impl From<u64> for AttributeValue {
    fn from(i: u64) -> Self {
        AttributeValue::Integer(i.into())
    }
}

impl From<f64> for AttributeValue {
    fn from(x: f64) -> Self {
        AttributeValue::Float(x)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Boolean(b)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenId::Text(s) => f.write_str(s),
            TokenId::Integer(i) => write!(f, "{}", i),
        }
    }
}
