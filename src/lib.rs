pub mod config;
pub mod logging;
pub mod metadata;
pub mod scan;
pub mod validate;

pub use metadata::{Attribute, AttributeValue, MintingInfo, ParseError, RogueMetadata, TokenId};
pub use validate::{Expected, FieldError, ValidationError, validate};
