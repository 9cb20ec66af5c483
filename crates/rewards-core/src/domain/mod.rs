//! Domain - ドメインモデル（cards ペイロード, object の場所, ストレージエラー）

pub mod cards;
pub mod location;
pub mod errors;

pub use self::cards::{Card, CardBytes, CardsDocument};
pub use self::location::ObjectLocation;
pub use self::errors::StorageError;
