use super::*;
use frames::{Rgb, Tool};

fn stroke(author: &str, x: f64) -> Stroke {
    let mut s = Stroke::begin(author, Tool::Brush, Rgb::INK, 4.0, Point::new(x, 0.0));
    s.points.push(Point::new(x + 1.0, 1.0));
    s
}

fn end(author: &str, x: f64) -> Operation {
    Operation::new(author, "lobby", OperationPayload::StrokeEnd(stroke(author, x)))
}

fn log() -> OperationLog {
    OperationLog::new(RoomLimits::default())
}

fn authors(log: &OperationLog) -> Vec<&str> {
    log.entries().iter().map(|e| e.author_id.as_str()).collect()
}

#[test]
fn only_closing_operations_are_logged() {
    let mut log = log();
    let start = Operation::new("a", "lobby", OperationPayload::StrokeStart(stroke("a", 0.0)));
    let point = Operation::new("a", "lobby", OperationPayload::StrokePoint(Point::new(1.0, 1.0)));
    assert!(!start.is_closing());
    assert!(!log.append(start));
    assert!(!log.append(point));
    assert!(log.is_empty());

    assert!(log.append(end("a", 0.0)));
    assert_eq!(log.len(), 1);
}

#[test]
fn stroke_end_without_points_is_discarded() {
    let mut log = log();
    let mut empty = stroke("a", 0.0);
    empty.points.clear();
    assert!(!log.append(Operation::new("a", "lobby", OperationPayload::StrokeEnd(empty))));
    assert!(log.is_empty());
}

#[test]
fn undo_retracts_only_the_authors_newest_stroke() {
    let mut log = log();
    log.append(end("a", 0.0));
    log.append(end("b", 10.0));
    log.append(end("a", 20.0));
    log.append(end("b", 30.0));

    let Some(Inverse::EraseStroke { stroke, .. }) = log.undo("a") else {
        panic!("expected an inverse for a");
    };
    assert!((stroke.points[0].x - 20.0).abs() < f64::EPSILON);
    assert_eq!(authors(&log), vec!["a", "b", "b"]);
    assert_eq!(log.redo_depth("a"), 1);
    assert_eq!(log.redo_depth("b"), 0);
}

#[test]
fn undo_without_eligible_entry_returns_none() {
    let mut log = log();
    log.append(end("b", 0.0));
    assert!(log.undo("a").is_none());
    assert_eq!(log.len(), 1);
}

#[test]
fn undo_then_redo_restores_exact_log() {
    let mut log = log();
    log.append(end("a", 0.0));
    log.append(end("b", 10.0));
    log.append(end("a", 20.0));
    log.append(end("b", 30.0));
    let before = log.entries().to_vec();

    log.undo("a");
    log.undo("a");
    assert_eq!(authors(&log), vec!["b", "b"]);

    assert!(log.redo("a").is_some());
    assert!(log.redo("a").is_some());
    assert_eq!(log.entries(), before.as_slice());
    assert!(log.redo("a").is_none());
}

#[test]
fn new_stroke_clears_authors_redo_stack() {
    let mut log = log();
    log.append(end("a", 0.0));
    log.append(end("b", 5.0));
    log.undo("a");
    log.undo("b");

    log.append(end("a", 40.0));
    assert_eq!(log.redo_depth("a"), 0);
    assert!(log.redo("a").is_none());
    assert_eq!(log.redo_depth("b"), 1);
}

#[test]
fn clear_empties_log_and_redo_stacks() {
    let mut log = log();
    log.append(end("a", 0.0));
    log.append(end("a", 1.0));
    log.undo("a");

    assert!(log.append(Operation::new("b", "lobby", OperationPayload::Clear)));
    assert!(log.is_empty());
    assert_eq!(log.redo_depth("a"), 0);
    assert!(log.undo("a").is_none());
}

#[test]
fn log_is_trimmed_to_newest_entries_when_over_cap() {
    let limits = RoomLimits { oplog_max_entries: 4, oplog_trim_to: 2, ..RoomLimits::default() };
    let mut log = OperationLog::new(limits);
    for i in 0..5 {
        log.append(end("a", f64::from(i)));
    }
    let xs: Vec<f64> = log.entries().iter().map(|e| e.stroke.points[0].x).collect();
    assert_eq!(xs, vec![3.0, 4.0]);
}

#[test]
fn redo_stack_drops_oldest_past_depth() {
    let limits = RoomLimits { redo_max_depth: 2, ..RoomLimits::default() };
    let mut log = OperationLog::new(limits);
    for i in 0..3 {
        log.append(end("a", f64::from(i)));
    }
    for _ in 0..3 {
        log.undo("a");
    }
    assert_eq!(log.redo_depth("a"), 2);
    log.redo("a");
    log.redo("a");
    assert!(log.redo("a").is_none());
    let xs: Vec<f64> = log.entries().iter().map(|e| e.stroke.points[0].x).collect();
    assert_eq!(xs, vec![0.0, 1.0]);
}

#[test]
fn drop_redo_forgets_author() {
    let mut log = log();
    log.append(end("a", 0.0));
    log.undo("a");
    log.drop_redo("a");
    assert!(log.redo("a").is_none());
}

#[test]
fn active_strokes_follow_arrival_order() {
    let mut log = log();
    log.append(end("b", 1.0));
    log.append(end("a", 2.0));
    let strokes = log.active_strokes();
    assert_eq!(strokes.len(), 2);
    assert_eq!(strokes[0].author_id, "b");
    assert_eq!(strokes[1].author_id, "a");
    assert!(log.entries()[0].seq < log.entries()[1].seq);
}
