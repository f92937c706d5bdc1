//! # strix - Length-Tagged Byte Strings
//!
//! This crate provides [`Strix`], a binary-safe byte string that tracks its
//! own length instead of relying on a terminator, together with
//! Knuth-Morris-Pratt substring search and a swappable allocator beneath
//! every buffer.
//!
//! ## Overview
//!
//! ```text
//!   Strix Layout:
//!
//!   ┌──────────────────────┐        ┌───┬───┬───┬───┬───┬───┬───┐
//!   │ Strix                │        │ h │ i │\0 │ t │ h │ e │ r │
//!   │  buf ────────────────┼──────▶ └───┴───┴───┴───┴───┴───┴───┘
//!   │  len: 7              │          ▲                       ▲
//!   │  ctx ──▶ Context     │          0                     len-1
//!   └──────────────────────┘
//!
//!   The zero byte at offset 2 is ordinary content; `len` alone decides
//!   where the string ends.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   strix
//!   ├── align      - Alignment macros (align!, align_to!)
//!   ├── block      - Block and segment headers (internal)
//!   ├── heap       - RawAllocator trait, Backend selector, HeapStats
//!   ├── system     - malloc/free backend
//!   ├── segmented  - Segmented pool backend with garbage collection
//!   ├── config     - Config defaults, setters, STRIX_* environment
//!   ├── context    - Context: allocator switch + status latch
//!   ├── error      - StrixError, ErrorCode, Result
//!   ├── search     - KMP search, MatchPositions
//!   ├── strix      - The Strix type
//!   └── array      - StrixArray, the result of a split
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use strix::Context;
//!
//! let ctx = Context::new();
//!
//! let mut greeting = ctx.create(b"hello").unwrap();
//! let world = ctx.create(b", world!").unwrap();
//! greeting.concat(Some(&world)).unwrap();
//! assert_eq!(greeting, b"hello, world!");
//!
//! assert_eq!(greeting.find(b"world").unwrap(), Some(7));
//! assert_eq!(greeting.slice(0, 4).unwrap(), b"hello");
//!
//! let pieces = ctx.create(b"\n\nfoo\nbar\n\n").unwrap().split_by_delim(b'\n').unwrap();
//! assert_eq!(pieces.len(), 2);
//! ```
//!
//! ## How Allocation Works
//!
//! Every buffer comes from the [`Context`] the strix was created with. The
//! context holds two backends and a switch between them:
//!
//! ```text
//!   Context
//!   ┌─────────────────────────────────────────────────────────┐
//!   │  backend: System ◀──── use_backend() ────▶ Segmented    │
//!   │                                                         │
//!   │  ┌──────────────────┐     ┌──────────────────────────┐  │
//!   │  │ SystemAllocator  │     │ SegmentedAllocator       │  │
//!   │  │  malloc / free   │     │  segments from malloc    │  │
//!   │  └──────────────────┘     │  blocks bumped + reused  │  │
//!   │                           │  idle segments collected │  │
//!   │                           └──────────────────────────┘  │
//!   │  status: ErrorCode      stats: HeapStats                │
//!   └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Each buffer remembers the backend that produced it, so switching never
//! strands a live buffer on the wrong allocator.
//!
//! The segmented backend carves blocks out of large regions:
//!
//! ```text
//!   Single Segment:
//!   ┌──────────┬────────┬──────────┬────────┬──────────┬────────────────┐
//!   │ Segment  │ Block  │  data    │ Block  │  data    │    unused      │
//!   │ header   │ header │ (live)   │ header │ (free)   │                │
//!   └──────────┴────────┴──────────┴────────┴──────────┴────────────────┘
//!                        ▲                   ▲          ▲
//!                        │                   │          └── bump offset
//!                        │                   └── reused by a later request
//!                        └── pointer handed to the strix
//! ```
//!
//! ## Errors
//!
//! Every fallible operation returns [`Result`]. The context additionally
//! latches the [`ErrorCode`] of the most recent operation, readable through
//! [`Context::last_error`] and printable with [`Context::perror`].
//!
//! ## Limitations
//!
//! - **Single-threaded contexts**: a `Context` and its strings are `!Send`
//! - **Byte oriented**: no encoding awareness
//! - **Unix allocator**: backends use `libc`

pub mod align;
mod array;
mod block;
pub mod config;
mod context;
mod error;
mod heap;
pub mod search;
mod segmented;
mod strix;
mod system;

pub use array::StrixArray;
pub use config::Config;
pub use context::Context;
pub use error::{ErrorCode, Result, StrixError};
pub use heap::{Backend, HeapStats, RawAllocator, UnknownBackend};
pub use search::{Kmp, MatchPositions, count_all, find_all, find_first};
pub use segmented::{SearchMode, SegmentedAllocator};
pub use strix::Strix;
pub use system::SystemAllocator;
