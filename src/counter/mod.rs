//! Named counters.
//!
//! Storage layout, per counter id:
//! - `<id>_total`: the count, as a decimal string
//! - `<id>_name`: the display name
//!
//! plus a single `list` key holding the JSON array of listed ids. Unlisting a
//! counter keeps its entries; [`CounterStore::purge_data`] removes them.

mod id;
mod store;

pub use id::{decode_id, encode_id, IdMinter};
pub use store::{
  Counter, CounterStore, FALLBACK_NAME, LIST_KEY, NAME_SUFFIX, TOTAL_SUFFIX, UNNAMED_COUNTER,
};
