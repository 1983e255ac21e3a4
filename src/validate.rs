//! 型なしの入力（デコード済み JSON）から [`RogueMetadata`] を組み立てる検証処理。
//!
//! 最初のエラーで止めず、1回の走査で見つかったフィールドエラーを全て集める。
//! 型の自動変換はしない（`"42"` は文字列、`42` は整数のまま）。

use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::fmt;
use url::Url;

use crate::metadata::{Attribute, AttributeValue, MintingInfo, RogueMetadata, TokenId};

const ROOT_FIELDS: &[&str] = &[
    "name",
    "description",
    "image",
    "animation_url",
    "attributes",
    "unlockable_content_ipfs",
    "external_url",
    "tags",
    "metadata_version",
    "prompt_version",
    "minting",
    "created_at",
];

/// エラー表示で実際の文字列値を切り詰める長さ
const MAX_ACTUAL_CHARS: usize = 64;

/// URL フィールドの最大長（文字数）
pub const MAX_URL_CHARS: usize = 2083;

const URL_SCHEMES: &[&str] = &["http", "https"];

/// フィールドが満たすべき型・制約
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expected {
    Present,
    Text,
    NonEmptyText,
    HttpUrl,
    List,
    Object,
    AttributeValue,
    TokenId,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Expected::Present => "a value (field required)",
            Expected::Text => "a string",
            Expected::NonEmptyText => "a non-empty string",
            Expected::HttpUrl => "an http(s) URL with a host, at most 2083 characters",
            Expected::List => "a list",
            Expected::Object => "an object",
            Expected::AttributeValue => "a string, number or boolean",
            Expected::TokenId => "a string or integer within the 64-bit range",
        };
        f.write_str(s)
    }
}

/// 1フィールド分の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// `minting.token_id` や `attributes[0].value` の形式。ルートは空文字列
    pub path: String,
    pub expected: Expected,
    /// 実際に渡された値の説明（欠落時は `missing`）
    pub actual: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "<root>" } else { &self.path };
        write!(f, "{}: expected {}, got {}", path, self.expected, self.actual)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{} validation error(s): {}", .errors.len(), summarize(.errors))]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.path.as_str())
    }

    pub fn for_path<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a FieldError> {
        self.errors.iter().filter(move |e| e.path == path)
    }
}

/// 走査中に見つかったエラーを溜めておく
#[derive(Default)]
struct Collector {
    errors: Vec<FieldError>,
}

impl Collector {
    fn reject(&mut self, path: &str, expected: Expected, actual: &Value) {
        self.errors.push(FieldError {
            path: path.to_string(),
            expected,
            actual: describe(actual),
        });
    }

    fn missing(&mut self, path: &str) {
        self.errors.push(FieldError {
            path: path.to_string(),
            expected: Expected::Present,
            actual: "missing".to_string(),
        });
    }

    fn finish<T>(self, value: Option<T>) -> Result<T, ValidationError> {
        match value {
            Some(v) if self.errors.is_empty() => Ok(v),
            _ => Err(ValidationError {
                errors: self.errors,
            }),
        }
    }
}

fn run<T>(
    value: &Value,
    what: &str,
    check: impl FnOnce(&Value, &str, &mut Collector) -> Option<T>,
) -> Result<T, ValidationError> {
    let mut collector = Collector::default();
    let result = check(value, "", &mut collector);
    let result = collector.finish(result);
    if let Err(err) = &result {
        tracing::debug!(record = what, errors = err.len(), "validation failed: {}", err);
    }
    result
}

/// ルートレコードを検証して組み立てる
pub fn validate(value: &Value) -> Result<RogueMetadata, ValidationError> {
    run(value, "RogueMetadata", rogue_metadata)
}

pub(crate) fn validate_attribute(value: &Value) -> Result<Attribute, ValidationError> {
    run(value, "Attribute", attribute)
}

pub(crate) fn validate_minting(value: &Value) -> Result<MintingInfo, ValidationError> {
    run(value, "MintingInfo", minting_info)
}

pub(crate) fn validate_attribute_value(value: &Value) -> Result<AttributeValue, ValidationError> {
    run(value, "AttributeValue", attribute_value)
}

pub(crate) fn validate_token_id(value: &Value) -> Result<TokenId, ValidationError> {
    run(value, "TokenId", token_id_value)
}

fn rogue_metadata(value: &Value, path: &str, c: &mut Collector) -> Option<RogueMetadata> {
    let fields = object(value, path, c)?;

    for key in fields.keys() {
        if !ROOT_FIELDS.contains(&key.as_str()) {
            tracing::trace!(field = %key, "ignoring unknown field");
        }
    }

    let name = required(fields, "name", path, c, text);
    let description = required(fields, "description", path, c, text);
    let image = required(fields, "image", path, c, http_url);
    let animation_url = optional(fields, "animation_url", path, c, http_url);
    let attributes = required(fields, "attributes", path, c, |v, p, c| {
        list(v, p, c, attribute)
    });
    let unlockable_content_ipfs =
        optional(fields, "unlockable_content_ipfs", path, c, http_url);
    let external_url = optional(fields, "external_url", path, c, http_url);
    let tags = match fields.get("tags") {
        None => Some(Some(Vec::new())),
        Some(Value::Null) => Some(None),
        Some(v) => list(v, &join(path, "tags"), c, text).map(Some),
    };
    let metadata_version = required(fields, "metadata_version", path, c, text);
    let prompt_version = required(fields, "prompt_version", path, c, text);
    let minting = optional(fields, "minting", path, c, minting_info);
    let created_at = optional(fields, "created_at", path, c, text);

    Some(RogueMetadata {
        name: name?,
        description: description?,
        image: image?,
        animation_url: animation_url?,
        attributes: attributes?,
        unlockable_content_ipfs: unlockable_content_ipfs?,
        external_url: external_url?,
        tags: tags?,
        metadata_version: metadata_version?,
        prompt_version: prompt_version?,
        minting: minting?,
        created_at: created_at?,
    })
}

fn attribute(value: &Value, path: &str, c: &mut Collector) -> Option<Attribute> {
    let fields = object(value, path, c)?;
    let trait_type = required(fields, "trait_type", path, c, non_empty_text);
    let value = required(fields, "value", path, c, attribute_value);

    Some(Attribute {
        trait_type: trait_type?,
        value: value?,
    })
}

fn minting_info(value: &Value, path: &str, c: &mut Collector) -> Option<MintingInfo> {
    let fields = object(value, path, c)?;
    let chain = optional(fields, "chain", path, c, text);
    let contract_address = optional(fields, "contract_address", path, c, text);
    let token_id = optional(fields, "token_id", path, c, token_id_value);
    let transaction_hash = optional(fields, "transaction_hash", path, c, text);

    Some(MintingInfo {
        chain: chain?,
        contract_address: contract_address?,
        token_id: token_id?,
        transaction_hash: transaction_hash?,
    })
}

/// 必須フィールド。欠落は `Present` エラー、`null` は型エラーとして扱う
fn required<T>(
    fields: &Map<String, Value>,
    key: &str,
    path: &str,
    c: &mut Collector,
    check: impl FnOnce(&Value, &str, &mut Collector) -> Option<T>,
) -> Option<T> {
    let path = join(path, key);
    match fields.get(key) {
        Some(v) => check(v, &path, c),
        None => {
            c.missing(&path);
            None
        }
    }
}

/// 任意フィールド。外側の `None` は検証失敗、内側の `None` は値なし
fn optional<T>(
    fields: &Map<String, Value>,
    key: &str,
    path: &str,
    c: &mut Collector,
    check: impl FnOnce(&Value, &str, &mut Collector) -> Option<T>,
) -> Option<Option<T>> {
    match fields.get(key) {
        None | Some(Value::Null) => Some(None),
        Some(v) => check(v, &join(path, key), c).map(Some),
    }
}

fn object<'a>(value: &'a Value, path: &str, c: &mut Collector) -> Option<&'a Map<String, Value>> {
    match value {
        Value::Object(fields) => Some(fields),
        other => {
            c.reject(path, Expected::Object, other);
            None
        }
    }
}

/// 要素ごとのエラーも全て集めてから失敗を返す
fn list<T>(
    value: &Value,
    path: &str,
    c: &mut Collector,
    item: impl Fn(&Value, &str, &mut Collector) -> Option<T>,
) -> Option<Vec<T>> {
    let Value::Array(items) = value else {
        c.reject(path, Expected::List, value);
        return None;
    };

    let mut out = Vec::with_capacity(items.len());
    let mut ok = true;
    for (i, v) in items.iter().enumerate() {
        match item(v, &format!("{}[{}]", path, i), c) {
            Some(x) => out.push(x),
            None => ok = false,
        }
    }
    ok.then_some(out)
}

fn text(value: &Value, path: &str, c: &mut Collector) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        other => {
            c.reject(path, Expected::Text, other);
            None
        }
    }
}

fn non_empty_text(value: &Value, path: &str, c: &mut Collector) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        other => {
            c.reject(path, Expected::NonEmptyText, other);
            None
        }
    }
}

/// http / https でホストを持ち、長さ上限以内の URL のみ受け付ける
fn http_url(value: &Value, path: &str, c: &mut Collector) -> Option<Url> {
    let parsed = match value {
        Value::String(s) if s.chars().count() <= MAX_URL_CHARS => Url::parse(s).ok(),
        _ => None,
    };
    match parsed.filter(is_http_url) {
        Some(url) => Some(url),
        None => {
            c.reject(path, Expected::HttpUrl, value);
            None
        }
    }
}

fn is_http_url(url: &Url) -> bool {
    URL_SCHEMES.contains(&url.scheme()) && url.host_str().is_some_and(|h| !h.is_empty())
}

fn attribute_value(value: &Value, path: &str, c: &mut Collector) -> Option<AttributeValue> {
    let matched = match value {
        Value::String(s) => Some(AttributeValue::Text(s.clone())),
        Value::Number(n) => integer(n)
            .map(AttributeValue::Integer)
            .or_else(|| n.as_f64().map(AttributeValue::Float)),
        Value::Bool(b) => Some(AttributeValue::Boolean(*b)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    if matched.is_none() {
        c.reject(path, Expected::AttributeValue, value);
    }
    matched
}

fn token_id_value(value: &Value, path: &str, c: &mut Collector) -> Option<TokenId> {
    let matched = match value {
        Value::String(s) => Some(TokenId::Text(s.clone())),
        Value::Number(n) => integer(n).map(TokenId::Integer),
        _ => None,
    };
    if matched.is_none() {
        c.reject(path, Expected::TokenId, value);
    }
    matched
}

/// JSON の整数（i64 / u64 の範囲）。浮動小数で表された数は `None`
fn integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("{} {}", number_kind(n), n),
        Value::String(s) => {
            let mut shown: String = s.chars().take(MAX_ACTUAL_CHARS).collect();
            if shown.len() < s.len() {
                shown.push('…');
            }
            format!("string {:?}", shown)
        }
        Value::Array(items) => format!("list of {} item(s)", items.len()),
        Value::Object(_) => "object".to_string(),
    }
}

fn number_kind(n: &Number) -> &'static str {
    if n.is_f64() { "float" } else { "integer" }
}
