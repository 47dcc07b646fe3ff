// Copyright @yucwang 2026

pub mod emitter;
pub mod hit;
pub mod packet;
pub mod rng;
#[cfg(feature = "stats")]
pub mod stats;
pub mod texture;
