/*
The chunked container layer.
Every tile file is a flat stream of `(tag, size, payload)` records. This
module holds the byte buffer those records are read from and written to,
the generic chunk containers, and the versioned schema engine that routes
each record to the field that owns it.
*/

pub mod buffer;
pub mod chunk;
pub mod fourcc;
pub mod schema;
pub mod scope;
pub mod storage;
pub mod version;
