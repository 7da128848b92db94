use proptest::prelude::*;
use spinwheel_world::pointer_index;

#[test]
fn empty_wheel_has_no_pointer() {
    assert_eq!(pointer_index(0.0, 0), None);
}

#[test]
fn boundaries_between_sectors_resolve_to_the_earlier_sector() {
    // With three sectors of 120 degrees, sector 0 spans offsets (-60, 60].
    assert_eq!(pointer_index(60.0, 3), Some(0));
    assert_eq!(pointer_index(-60.0, 3), Some(1));
    assert_eq!(pointer_index(180.0, 3), Some(2));
}

proptest! {
    #[test]
    fn pointer_always_lands_on_an_existing_sector(
        offset in -1.0e6f64..1.0e6,
        count in 1usize..64,
    ) {
        let index = pointer_index(offset, count).expect("non-empty wheel");
        prop_assert!(index < count);
    }

    #[test]
    fn full_turns_do_not_change_the_pointer(
        offset in 0.0f64..360.0,
        count in 1usize..32,
        turns in -8i32..8,
    ) {
        let turned = offset + f64::from(turns) * 360.0;
        let base = pointer_index(offset, count);
        let rotated = pointer_index(turned, count);
        // Float error near a sector edge may shift by one sector at most.
        let (Some(base), Some(rotated)) = (base, rotated) else {
            return Err(TestCaseError::fail("non-empty wheel"));
        };
        let distance = base.abs_diff(rotated);
        prop_assert!(distance == 0 || distance == 1 || distance == count - 1);
    }
}
