use crate::base::{Base, BaseSlotView};

#[test]
fn acquiring_and_dropping_a_hold_tracks_the_count() {
    let base = Base::new_open(1);
    assert_eq!(base.hold_count(), 0);

    let hold = base.acquire_hold();
    assert_eq!(base.hold_count(), 1);
    assert_eq!(hold.base_id(), 1);

    let hold2 = base.acquire_hold();
    assert_eq!(base.hold_count(), 2);

    drop(hold);
    assert_eq!(base.hold_count(), 1);
    drop(hold2);
    assert_eq!(base.hold_count(), 0);
}

#[test]
fn snapshot_slot_reflects_invalidation() {
    let base = Base::new_open(2);
    assert!(matches!(base.snapshot_slot(), BaseSlotView::Open));

    base.invalidate();
    assert!(matches!(base.snapshot_slot(), BaseSlotView::Invalidated));
}

#[test]
fn a_hold_survives_invalidation_of_the_base_it_was_taken_on() {
    let base = Base::new_open(3);
    let hold = base.acquire_hold();
    base.invalidate();

    // The hold itself is just a refcount bump; it does not prevent the slot
    // from moving to Invalidated. Callers are expected to re-check the slot
    // after acquiring a hold, per spec.md §5.
    assert!(matches!(base.snapshot_slot(), BaseSlotView::Invalidated));
    assert_eq!(base.hold_count(), 1);
    drop(hold);
    assert_eq!(base.hold_count(), 0);
}
