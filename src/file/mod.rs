//! Byte-level helpers shared by the stream decoders and the code writer.

pub(crate) mod io;
pub mod output;
