// Copyright 2020 @TwoCookingMice

pub mod constants;
pub mod distribution;
pub mod lanes;
pub mod mask;
pub mod ray;
pub mod spectrum;
