//! # Common - Shared Types
//!
//! Foundation types used by every other LoamKV crate: the non-owning
//! [`ByteView`], the live/tombstone [`ValueKind`] tag with its [`ValueEntry`]
//! pairing, and the [`StoreError`] outcome taxonomy.

mod error;
mod value;
mod view;

pub use error::{Result, StoreError};
pub use value::{ValueEntry, ValueKind};
pub use view::ByteView;
