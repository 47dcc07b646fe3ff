/* Copyright 2020 @Yuchen Wong */

pub type Float = f32;
pub type UInt = u32;

pub type Vector2f = nalgebra::Vector2<Float>;
pub type Vector3f = nalgebra::Vector3<Float>;
pub type Vector4f = nalgebra::Vector4<Float>;

pub const PI: Float = 3.14159265359;
pub const TWO_PI: Float = 6.28318530718;
pub const INV_PI: Float = 0.31830988618;
pub const INV_TWO_PI: Float = 0.15915494309;

// Largest float strictly below 1.0.
pub const ONE_MINUS_EPSILON: Float = 1.0 - Float::EPSILON / 2.0;
