//! Boundary schemas for the query surface.
//!
//! These types are the truthful boundary: a transport adapter (HTTP or
//! otherwise) maps its request into them and its response out of them,
//! with nothing supervision-shaped living in the adapter itself.

pub mod pack;
pub mod query;

pub use pack::{pack_pair, unpack_pair, PackError};
pub use query::{
    Delta, EditedQuery, EditedReply, Horizon, QueryError, QuerySurface, ReplyFormat,
};
