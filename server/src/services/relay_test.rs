use super::*;
use crate::config::RoomLimits;
use frames::{Rgb, Snapshot, Tool};
use tokio::sync::mpsc;

fn session(id: &str) -> (Session, mpsc::Receiver<ServerEvent>) {
    let (tx, rx) = mpsc::channel(64);
    (Session { id: id.to_owned(), tx }, rx)
}

fn drain(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

fn kinds(events: &[ServerEvent]) -> Vec<&'static str> {
    events.iter().map(ServerEvent::kind).collect()
}

fn join(room: &str, name: &str) -> ClientEvent {
    ClientEvent::JoinRoom { room: room.into(), display_name: name.into(), color: Rgb::INK }
}

fn start(room: &str, x: f64, y: f64) -> ClientEvent {
    ClientEvent::StrokeStart { room: room.into(), x, y, tool: Tool::Brush, color: Rgb::INK, width: 4.0 }
}

fn point(room: &str, x: f64, y: f64) -> ClientEvent {
    ClientEvent::StrokePoint { room: room.into(), x, y }
}

fn end(room: &str) -> ClientEvent {
    ClientEvent::StrokeEnd { room: room.into() }
}

struct Lobby {
    registry: RoomRegistry,
    a: Session,
    a_rx: mpsc::Receiver<ServerEvent>,
    b: Session,
    b_rx: mpsc::Receiver<ServerEvent>,
}

/// Two sessions in "lobby" with handshake traffic drained.
async fn lobby() -> Lobby {
    let registry = RoomRegistry::new(RoomLimits::default());
    let (a, mut a_rx) = session("a");
    let (b, mut b_rx) = session("b");
    relay(&registry, &a, join("lobby", "Ada")).await.expect("a joins");
    relay(&registry, &b, join("lobby", "Bo")).await.expect("b joins");
    drain(&mut a_rx);
    drain(&mut b_rx);
    Lobby { registry, a, a_rx, b, b_rx }
}

async fn draw(l: &Lobby, who: &Session, x: f64) {
    relay(&l.registry, who, start("lobby", x, 0.0)).await.expect("start");
    relay(&l.registry, who, point("lobby", x + 1.0, 1.0)).await.expect("point");
    relay(&l.registry, who, end("lobby")).await.expect("end");
}

#[tokio::test]
async fn stroke_events_reach_peers_but_not_sender() {
    let mut l = lobby().await;
    draw(&l, &l.a, 0.0).await;

    let b_events = drain(&mut l.b_rx);
    assert_eq!(kinds(&b_events), vec!["stroke-start", "stroke-point", "stroke-end"]);
    for event in &b_events {
        match event {
            ServerEvent::StrokeStart { session_id, .. }
            | ServerEvent::StrokePoint { session_id, .. }
            | ServerEvent::StrokeEnd { session_id } => assert_eq!(session_id, "a"),
            other => panic!("unexpected {other:?}"),
        }
    }
    assert!(drain(&mut l.a_rx).is_empty());
}

#[tokio::test]
async fn stroke_end_logs_the_accumulated_stroke() {
    let l = lobby().await;
    relay(&l.registry, &l.a, start("lobby", 0.0, 0.0)).await.expect("start");
    relay(&l.registry, &l.a, point("lobby", 1.0, 1.0)).await.expect("point");
    relay(&l.registry, &l.a, point("lobby", 2.0, 2.0)).await.expect("point");
    relay(&l.registry, &l.a, end("lobby")).await.expect("end");

    let room = l.registry.room("lobby").await.expect("room");
    let room = room.lock().await;
    let strokes = room.log().active_strokes();
    assert_eq!(strokes.len(), 1);
    assert_eq!(strokes[0].author_id, "a");
    assert_eq!(strokes[0].points.len(), 3);
}

#[tokio::test]
async fn stroke_width_is_clamped() {
    let mut l = lobby().await;
    let wide = ClientEvent::StrokeStart { room: "lobby".into(), x: 0.0, y: 0.0, tool: Tool::Eraser, color: Rgb::INK, width: 500.0 };
    relay(&l.registry, &l.a, wide).await.expect("start");
    match drain(&mut l.b_rx).as_slice() {
        [ServerEvent::StrokeStart { width, tool, .. }] => {
            assert!((*width - 100.0).abs() < f64::EPSILON);
            assert_eq!(*tool, Tool::Eraser);
        }
        other => panic!("expected stroke-start, got {other:?}"),
    }
}

#[tokio::test]
async fn stroke_end_without_open_stroke_is_dropped() {
    let mut l = lobby().await;
    let err = relay(&l.registry, &l.a, end("lobby")).await.expect_err("no open stroke");
    assert_eq!(err, DropReason::NoOpenStroke);
    assert_eq!(err.error_code(), "E_NO_OPEN_STROKE");
    assert!(drain(&mut l.b_rx).is_empty());
}

#[tokio::test]
async fn events_from_sessions_without_room_are_dropped() {
    let l = lobby().await;
    let (c, _c_rx) = session("c");
    let err = relay(&l.registry, &c, point("lobby", 1.0, 1.0)).await.expect_err("c never joined");
    assert_eq!(err, DropReason::NotInRoom);
    assert_eq!(relay(&l.registry, &c, ClientEvent::LeaveRoom).await, Err(DropReason::NotInRoom));
}

#[tokio::test]
async fn mismatched_room_claim_is_dropped() {
    let mut l = lobby().await;
    let (c, mut c_rx) = session("c");
    relay(&l.registry, &c, join("studio", "Cy")).await.expect("c joins studio");
    drain(&mut c_rx);

    let err = relay(&l.registry, &l.a, point("studio", 1.0, 1.0)).await.expect_err("a is in lobby");
    assert_eq!(err.error_code(), "E_ROOM_MISMATCH");
    assert!(drain(&mut c_rx).is_empty());
    assert!(drain(&mut l.b_rx).is_empty());
}

#[tokio::test]
async fn room_a_events_never_reach_room_b() {
    let mut l = lobby().await;
    let (c, mut c_rx) = session("c");
    relay(&l.registry, &c, join("studio", "Cy")).await.expect("c joins studio");
    drain(&mut c_rx);

    draw(&l, &l.a, 0.0).await;
    relay(&l.registry, &l.a, ClientEvent::CursorMove { room: "lobby".into(), x: 3.0, y: 4.0 })
        .await
        .expect("cursor");
    assert!(drain(&mut c_rx).is_empty());
    assert_eq!(drain(&mut l.b_rx).len(), 4);
}

#[tokio::test]
async fn malformed_events_are_rejected_before_room_state() {
    let l = lobby().await;
    let bad = ClientEvent::StrokePoint { room: "lobby".into(), x: f64::NAN, y: 0.0 };
    assert!(matches!(relay(&l.registry, &l.a, bad).await, Err(DropReason::Malformed(_))));

    let blank = ClientEvent::JoinRoom { room: "  ".into(), display_name: "x".into(), color: Rgb::INK };
    let err = relay(&l.registry, &l.a, blank).await.expect_err("blank room");
    assert_eq!(err.error_code(), "E_MALFORMED");
    assert_eq!(l.registry.room_of("a").await.as_deref(), Some("lobby"));
}

#[tokio::test]
async fn cursor_move_carries_sender_presence() {
    let mut l = lobby().await;
    relay(&l.registry, &l.a, ClientEvent::CursorMove { room: "lobby".into(), x: 10.0, y: 20.0 })
        .await
        .expect("cursor");
    match drain(&mut l.b_rx).as_slice() {
        [ServerEvent::CursorMove { session_id, display_name, color, x, y }] => {
            assert_eq!(session_id, "a");
            assert_eq!(display_name, "Ada");
            assert_eq!(*color, Rgb::INK);
            assert!((*x - 10.0).abs() < f64::EPSILON);
            assert!((*y - 20.0).abs() < f64::EPSILON);
        }
        other => panic!("expected cursor-move, got {other:?}"),
    }
}

#[tokio::test]
async fn undo_broadcasts_remaining_strokes_to_room() {
    let mut l = lobby().await;
    draw(&l, &l.a, 0.0).await;
    draw(&l, &l.b, 10.0).await;
    drain(&mut l.a_rx);
    drain(&mut l.b_rx);

    let delivery = relay(&l.registry, &l.a, ClientEvent::Undo { room: "lobby".into() }).await.expect("undo");
    assert_eq!(delivery.recipients, 2);
    for rx in [&mut l.a_rx, &mut l.b_rx] {
        match drain(rx).as_slice() {
            [ServerEvent::Undo { session_id, strokes }] => {
                assert_eq!(session_id, "a");
                assert_eq!(strokes.len(), 1);
                assert_eq!(strokes[0].author_id, "b");
            }
            other => panic!("expected undo, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn redo_broadcasts_restored_strokes_in_arrival_order() {
    let mut l = lobby().await;
    draw(&l, &l.a, 0.0).await;
    draw(&l, &l.b, 10.0).await;
    relay(&l.registry, &l.a, ClientEvent::Undo { room: "lobby".into() }).await.expect("undo");
    drain(&mut l.a_rx);
    drain(&mut l.b_rx);

    let delivery = relay(&l.registry, &l.a, ClientEvent::Redo { room: "lobby".into() }).await.expect("redo");
    assert_eq!(delivery.recipients, 2);
    for rx in [&mut l.a_rx, &mut l.b_rx] {
        match drain(rx).as_slice() {
            [ServerEvent::Redo { session_id, strokes }] => {
                assert_eq!(session_id, "a");
                let authors: Vec<_> = strokes.iter().map(|s| s.author_id.as_str()).collect();
                assert_eq!(authors, vec!["a", "b"]);
            }
            other => panic!("expected redo, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn redo_after_new_stroke_is_silent() {
    let mut l = lobby().await;
    draw(&l, &l.a, 0.0).await;
    relay(&l.registry, &l.a, ClientEvent::Undo { room: "lobby".into() }).await.expect("undo");
    draw(&l, &l.a, 20.0).await;
    drain(&mut l.a_rx);
    drain(&mut l.b_rx);

    let delivery = relay(&l.registry, &l.a, ClientEvent::Redo { room: "lobby".into() }).await.expect("redo");
    assert_eq!(delivery, Delivery::default());
    assert!(drain(&mut l.a_rx).is_empty());
    assert!(drain(&mut l.b_rx).is_empty());

    let handle = l.registry.room("lobby").await.expect("room handle");
    let room = handle.lock().await;
    assert_eq!(room.log().len(), 1);
}

#[tokio::test]
async fn undo_with_nothing_to_undo_broadcasts_nothing() {
    let mut l = lobby().await;
    draw(&l, &l.b, 0.0).await;
    drain(&mut l.a_rx);

    let delivery = relay(&l.registry, &l.a, ClientEvent::Undo { room: "lobby".into() }).await.expect("undo");
    assert_eq!(delivery, Delivery::default());
    let delivery = relay(&l.registry, &l.a, ClientEvent::Redo { room: "lobby".into() }).await.expect("redo");
    assert_eq!(delivery.recipients, 0);
    assert!(drain(&mut l.a_rx).is_empty());
    assert!(drain(&mut l.b_rx).is_empty());
}

#[tokio::test]
async fn clear_resets_snapshot_and_log_for_late_joiners() {
    let mut l = lobby().await;
    draw(&l, &l.a, 0.0).await;
    let snapshot = Snapshot::from("data:image/png;base64,AAAA".to_owned());
    relay(&l.registry, &l.a, ClientEvent::SnapshotUpdate { room: "lobby".into(), snapshot }).await.expect("snapshot");
    drain(&mut l.b_rx);

    relay(&l.registry, &l.b, ClientEvent::ClearCanvas { room: "lobby".into() }).await.expect("clear");
    assert_eq!(kinds(&drain(&mut l.a_rx)), vec!["canvas-cleared"]);

    let (c, mut c_rx) = session("c");
    relay(&l.registry, &c, join("lobby", "Cy")).await.expect("c joins");
    match drain(&mut c_rx).as_slice() {
        [ServerEvent::RoomJoined { canvas_snapshot, members, .. }] => {
            assert!(canvas_snapshot.is_blank());
            assert_eq!(members.len(), 3);
        }
        other => panic!("expected room-joined, got {other:?}"),
    }
    let room = l.registry.room("lobby").await.expect("room");
    assert!(room.lock().await.log().is_empty());
}

#[tokio::test]
async fn snapshot_update_is_stored_not_relayed() {
    let mut l = lobby().await;
    let snapshot = Snapshot::from("data:image/png;base64,QUJD".to_owned());
    let delivery = relay(&l.registry, &l.a, ClientEvent::SnapshotUpdate { room: "lobby".into(), snapshot: snapshot.clone() })
        .await
        .expect("snapshot");
    assert_eq!(delivery.recipients, 0);
    assert!(drain(&mut l.b_rx).is_empty());

    let state = l.registry.current_state("lobby").await.expect("state");
    assert_eq!(state.canvas_snapshot, snapshot);
}

#[tokio::test]
async fn oversized_snapshot_is_rejected() {
    let registry = RoomRegistry::new(RoomLimits { max_snapshot_bytes: 4, ..RoomLimits::default() });
    let (a, _a_rx) = session("a");
    relay(&registry, &a, join("lobby", "Ada")).await.expect("join");

    let snapshot = Snapshot::from("0123456789".to_owned());
    let err = relay(&registry, &a, ClientEvent::SnapshotUpdate { room: "lobby".into(), snapshot })
        .await
        .expect_err("too large");
    assert_eq!(err, DropReason::SnapshotTooLarge { size: 10, limit: 4 });
    assert!(registry.current_state("lobby").await.expect("state").canvas_snapshot.is_blank());
}

#[tokio::test]
async fn request_state_answers_only_the_sender() {
    let mut l = lobby().await;
    let delivery = relay(&l.registry, &l.a, ClientEvent::RequestState { room: "lobby".into() }).await.expect("state");
    assert_eq!(delivery.recipients, 1);
    match drain(&mut l.a_rx).as_slice() {
        [ServerEvent::RoomState { room, members, .. }] => {
            assert_eq!(room, "lobby");
            assert_eq!(members.len(), 2);
        }
        other => panic!("expected room-state, got {other:?}"),
    }
    assert!(drain(&mut l.b_rx).is_empty());
}

#[tokio::test]
async fn leave_room_notifies_remaining_members() {
    let mut l = lobby().await;
    let delivery = relay(&l.registry, &l.a, ClientEvent::LeaveRoom).await.expect("leave");
    assert_eq!(delivery.recipients, 1);
    assert_eq!(kinds(&drain(&mut l.b_rx)), vec!["user-left"]);
    assert_eq!(
        relay(&l.registry, &l.a, point("lobby", 0.0, 0.0)).await,
        Err(DropReason::NotInRoom)
    );
}

#[tokio::test]
async fn per_sender_order_is_preserved() {
    let mut l = lobby().await;
    relay(&l.registry, &l.a, start("lobby", 0.0, 0.0)).await.expect("start");
    for i in 1..=20 {
        relay(&l.registry, &l.a, point("lobby", f64::from(i), 0.0)).await.expect("point");
    }
    let xs: Vec<f64> = drain(&mut l.b_rx)
        .into_iter()
        .filter_map(|e| match e {
            ServerEvent::StrokePoint { x, .. } => Some(x),
            _ => None,
        })
        .collect();
    let expected: Vec<f64> = (1..=20).map(f64::from).collect();
    assert_eq!(xs, expected);
}
