// Copyright @yucwang 2026

pub mod core;
pub mod emitters;
pub mod io;
pub mod math;
pub mod textures;
