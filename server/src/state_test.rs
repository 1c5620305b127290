use super::*;
use crate::config::RoomLimits;

#[tokio::test]
async fn new_state_starts_empty() {
    let state = AppState::new(RelayConfig::default());
    let stats = state.registry.stats().await;
    assert_eq!(stats.rooms, 0);
    assert_eq!(stats.users, 0);
}

#[test]
fn clones_share_registry_and_config() {
    let config = RelayConfig { limits: RoomLimits { redo_max_depth: 7, ..RoomLimits::default() }, ..RelayConfig::default() };
    let a = AppState::new(config);
    let b = a.clone();
    assert!(Arc::ptr_eq(&a.registry, &b.registry));
    assert_eq!(b.config.limits.redo_max_depth, 7);
}
