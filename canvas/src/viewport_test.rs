#![allow(clippy::float_cmp)]

use super::*;

#[test]
fn unscaled_offsets_by_rect_origin() {
    let vp = Viewport { left: 10.0, top: 20.0, ..Viewport::unscaled(800.0, 600.0) };
    assert_eq!(vp.to_surface(110.0, 220.0), Point::new(100.0, 200.0));
}

#[test]
fn device_pixel_ratio_scales_into_backing_store() {
    let vp = Viewport { left: 0.0, top: 0.0, css_width: 400.0, css_height: 300.0, surface_width: 800.0, surface_height: 600.0 };
    assert_eq!(vp.to_surface(100.0, 50.0), Point::new(200.0, 100.0));
}

#[test]
fn round_trip_client_surface() {
    let vp = Viewport { left: 5.0, top: 7.0, css_width: 400.0, css_height: 300.0, surface_width: 1000.0, surface_height: 750.0 };
    let client = Point::new(123.0, 45.0);
    let back = vp.to_client(vp.to_surface(client.x, client.y));
    assert!((back.x - client.x).abs() < 1e-9);
    assert!((back.y - client.y).abs() < 1e-9);
}

#[test]
fn zero_css_size_maps_one_to_one() {
    let vp = Viewport { left: 0.0, top: 0.0, css_width: 0.0, css_height: 0.0, surface_width: 300.0, surface_height: 150.0 };
    assert_eq!(vp.to_surface(12.0, 34.0), Point::new(12.0, 34.0));
}
