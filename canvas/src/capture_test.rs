use super::*;
use crate::recording::pt;
use frames::{Rgb, Tool};

fn open(capture: &mut StrokeCapture, x: f64, y: f64) -> bool {
    capture.begin(Stroke::begin("me", Tool::Brush, Rgb::INK, 4.0, pt(x, y)))
}

#[test]
fn starts_idle() {
    let capture = StrokeCapture::new();
    assert_eq!(*capture.state(), CaptureState::Idle);
    assert!(!capture.is_drawing());
}

#[test]
fn two_point_stroke_is_emitted() {
    let mut capture = StrokeCapture::new();
    assert!(open(&mut capture, 0.0, 0.0));
    assert_eq!(capture.extend(pt(1.0, 1.0)), Some((pt(0.0, 0.0), pt(1.0, 1.0))));

    let stroke = capture.finish().expect("stroke with two points");
    assert_eq!(stroke.points, vec![pt(0.0, 0.0), pt(1.0, 1.0)]);
    assert!(!capture.is_drawing());
}

#[test]
fn tap_is_suppressed() {
    let mut capture = StrokeCapture::new();
    open(&mut capture, 5.0, 5.0);
    assert!(capture.finish().is_none());
    assert!(!capture.is_drawing());
}

#[test]
fn moves_while_idle_are_ignored() {
    let mut capture = StrokeCapture::new();
    assert!(capture.extend(pt(1.0, 1.0)).is_none());
    assert!(capture.finish().is_none());
}

#[test]
fn second_pointer_down_keeps_open_stroke() {
    let mut capture = StrokeCapture::new();
    open(&mut capture, 0.0, 0.0);
    capture.extend(pt(1.0, 0.0));
    assert!(!open(&mut capture, 50.0, 50.0));

    let stroke = capture.finish().expect("original stroke");
    assert_eq!(stroke.points[0], pt(0.0, 0.0));
}

#[test]
fn every_move_is_kept() {
    let mut capture = StrokeCapture::new();
    open(&mut capture, 0.0, 0.0);
    for i in 1..=10 {
        capture.extend(pt(f64::from(i), 0.0));
    }
    assert_eq!(capture.finish().expect("stroke").points.len(), 11);
}

#[test]
fn cancel_drops_stroke() {
    let mut capture = StrokeCapture::new();
    open(&mut capture, 0.0, 0.0);
    capture.extend(pt(1.0, 1.0));
    capture.cancel();
    assert!(capture.finish().is_none());
}

#[test]
fn cursor_throttle_gates_by_interval() {
    let mut throttle = CursorThrottle::new(100.0);
    assert!(throttle.allow(1000.0));
    assert!(!throttle.allow(1050.0));
    assert!(!throttle.allow(1099.0));
    assert!(throttle.allow(1100.0));
    assert!(!throttle.allow(1150.0));
}
