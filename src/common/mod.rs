//! Helpers shared by the record decoders.

pub mod binary;
