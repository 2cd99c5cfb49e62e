//! Value model, row codec, atomic-file helpers and the closed error
//! taxonomy shared by `heapsql-parser` and `heapsql`.

pub mod codec;
pub mod error;
pub mod fsutil;
pub mod value;

pub use codec::{decode, encode, HeapRecord, Rid, Row};
pub use error::{EngineError, EngineResult};
pub use value::{ColumnType, Value};
