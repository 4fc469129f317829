//! Unit tests for frame_sync.rs

use crate::error::Error;
use crate::frame_sync::{FrameCursor, SlotState, SyncSlot};

#[test]
fn test_cursor_starts_at_zero() {
    let cursor = FrameCursor::new(3);
    assert_eq!(cursor.index(), 0);
    assert_eq!(cursor.count(), 3);
}

#[test]
fn test_cursor_advance_wraps() {
    let mut cursor = FrameCursor::new(3);
    assert_eq!(cursor.advance(), 1);
    assert_eq!(cursor.advance(), 2);
    assert_eq!(cursor.advance(), 0);
}

#[test]
fn test_cursor_advance_is_plus_one_mod_count() {
    for count in 1..=5 {
        let mut cursor = FrameCursor::new(count);
        for _ in 0..(count * 3) {
            let before = cursor.index();
            cursor.advance();
            assert_eq!(cursor.index(), (before + 1) % count);
        }
    }
}

#[test]
fn test_cursor_zero_count_is_clamped() {
    let mut cursor = FrameCursor::new(0);
    assert_eq!(cursor.count(), 1);
    assert_eq!(cursor.advance(), 0);
}

#[test]
fn test_slot_full_cycle() {
    let mut slot = SyncSlot::new(42);
    assert_eq!(slot.state, SlotState::Available);

    slot.transition(SlotState::Available, SlotState::Rendering).unwrap();
    slot.transition(SlotState::Rendering, SlotState::BlitPending).unwrap();
    slot.transition(SlotState::BlitPending, SlotState::Presenting).unwrap();
    slot.transition(SlotState::Presenting, SlotState::Available).unwrap();

    assert_eq!(slot.state, SlotState::Available);
    assert_eq!(slot.texture, 42);
}

#[test]
fn test_slot_wrong_transition_keeps_state() {
    let mut slot = SyncSlot::new(1);
    let result = slot.transition(SlotState::Rendering, SlotState::BlitPending);
    assert!(matches!(result, Err(Error::InvalidState(_))));
    assert_eq!(slot.state, SlotState::Available);
}
