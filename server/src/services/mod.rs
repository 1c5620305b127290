//! Room services used by the websocket route.
//!
//! ARCHITECTURE
//! ============
//! `registry` owns rooms and membership, `oplog` owns per-room undo/redo
//! history, and `relay` turns decoded client events into room mutations and
//! peer fan-out. Route handlers stay focused on transport and encoding.

pub mod oplog;
pub mod registry;
pub mod relay;
