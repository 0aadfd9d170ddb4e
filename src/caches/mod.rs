// Sub-cache module for the index cache coordinator
//
// Each file defines the capability trait the coordinator consumes for one
// cache kind, plus a bundled in-memory implementation of it. Sub-caches own
// their storage, eviction, and internal thread-safety; the coordinator only
// dispatches lifecycle, invalidation, and statistics calls.

mod field_value;
mod filter;
mod id;
mod membership;
mod query_parser;

// Re-exports
pub use field_value::{FieldValueCache, InMemoryFieldValueCache};
pub use filter::{EntriesStats, FilterCache, FilterDocs, InMemoryFilterCache};
pub use id::{IdCache, InMemoryIdCache};
pub use membership::{InMemoryMembershipCache, MembershipCache};
pub use query_parser::{InMemoryQueryParserCache, ParsedQuery, QueryParserCache};
