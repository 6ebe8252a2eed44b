//! Core image views and planar geometry for hex-board scanning.
//!
//! This crate is purely geometric: raw RGB buffers, bilinear sampling,
//! homography estimation and warping, and polygon helpers. It knows
//! nothing about boards, colors or cameras.

mod geometry;
mod homography;
mod image;
mod logger;

pub use geometry::{
    clip_half_plane, contains_point, convex_hull, is_convex, mean_point, perimeter,
    polygon_area, polygon_centroid, regular_hexagon, signed_area, simplify_closed,
    sort_by_polar_angle, AREA_EPS,
};
pub use homography::{estimate_homography, homography_from_4pt, warp_perspective_rgb, Homography};
pub use image::{
    sample_bilinear_rgb, sample_bilinear_rgb_u8, Frame, ImageBufferError, RgbImage, RgbImageView,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{default_directives, init_with_level, level_for_verbosity};

pub use nalgebra::{Point2, Vector2};
