use crate::field::{FieldConfigError, FieldMutator, FieldType, Mode};

fn counter(kind: FieldType, mask: u32, value: u32, mode: Mode, count: u32) -> FieldMutator {
    FieldMutator::new(kind, 0, mask, value, mode, count).expect("valid mutator")
}

fn values(m: &FieldMutator, n: u64) -> Vec<u32> {
    (0..n).map(|i| m.value_at(i)).collect()
}

#[test]
fn increment_visits_consecutive_values() {
    let m = counter(FieldType::Counter16, 0x0fff, 101, Mode::Increment, 7);
    assert_eq!(values(&m, 7), vec![101, 102, 103, 104, 105, 106, 107]);
}

#[test]
fn decrement_visits_consecutive_values_down() {
    let m = counter(FieldType::Counter16, 0x0fff, 101, Mode::Decrement, 7);
    assert_eq!(values(&m, 7), vec![101, 100, 99, 98, 97, 96, 95]);
}

#[test]
fn value_freezes_after_count() {
    let m = counter(FieldType::Counter32, 0xff, 101, Mode::Increment, 5);
    assert_eq!(
        values(&m, 10),
        vec![101, 102, 103, 104, 105, 105, 105, 105, 105, 105]
    );
    assert_eq!(m.value_at(u64::MAX), 105);
}

#[test]
fn decrement_is_reverse_of_increment_from_the_far_end() {
    let n = 7;
    let up = counter(FieldType::Counter16, 0x0fff, 95, Mode::Increment, n);
    let down = counter(FieldType::Counter16, 0x0fff, 101, Mode::Decrement, n);
    for k in 0..u64::from(n) {
        assert_eq!(down.value_at(k), up.value_at(u64::from(n) - 1 - k), "k={k}");
    }
}

#[test]
fn increment_wraps_to_mask_minimum() {
    let m = counter(FieldType::Counter16, 0x0fff, 0x0ffe, Mode::Increment, 4);
    assert_eq!(values(&m, 4), vec![0x0ffe, 0x0fff, 0, 1]);
}

#[test]
fn decrement_wraps_to_mask_maximum() {
    let m = counter(FieldType::Counter16, 0x0fff, 1, Mode::Decrement, 4);
    assert_eq!(values(&m, 4), vec![1, 0, 0x0fff, 0x0ffe]);
}

#[test]
fn full_width_counter32_wraps() {
    let m = counter(FieldType::Counter32, 0xffff_ffff, 0xffff_ffff, Mode::Increment, 3);
    assert_eq!(values(&m, 3), vec![0xffff_ffff, 0, 1]);
}

#[test]
fn shifted_mask_steps_by_lowest_set_bit() {
    let m = counter(FieldType::Counter16, 0xff00, 0xfe00, Mode::Increment, 3);
    assert_eq!(values(&m, 3), vec![0xfe00, 0xff00, 0x0000]);
}

#[test]
fn produced_values_never_leave_the_mask() {
    let masks = [0x0001, 0x0fff, 0x00f0, 0xf00f, 0x0000_00ff, 0xffff_0000, 0x8000_0001];
    for mask in masks {
        let kind = if mask > 0xffff {
            FieldType::Counter32
        } else {
            FieldType::Counter16
        };
        for mode in [Mode::Increment, Mode::Decrement] {
            let m = counter(kind, mask, mask & 0x5555_5555, mode, 300);
            for i in 0..300 {
                let v = m.value_at(i);
                assert_eq!(v & !mask, 0, "mask={mask:#x} mode={mode:?} i={i} v={v:#x}");
            }
        }
    }
}

#[test]
fn construction_rejects_bad_parameters() {
    assert_eq!(
        FieldMutator::new(FieldType::Counter16, 0, 0x0fff, 1, Mode::Increment, 0),
        Err(FieldConfigError::ZeroCount)
    );
    assert_eq!(
        FieldMutator::new(FieldType::Counter16, 0, 0, 0, Mode::Increment, 1),
        Err(FieldConfigError::ZeroMask)
    );
    assert_eq!(
        FieldMutator::new(FieldType::Counter16, 0, 0x1_0000, 0, Mode::Increment, 1),
        Err(FieldConfigError::MaskTooWide {
            mask: 0x1_0000,
            width: 2
        })
    );
    assert_eq!(
        FieldMutator::new(FieldType::Counter16, 0, 0x0fff, 0x1000, Mode::Increment, 1),
        Err(FieldConfigError::ValueOutsideMask {
            value: 0x1000,
            mask: 0x0fff
        })
    );
}

#[test]
fn apply_keeps_bits_outside_the_mask() {
    // VLAN TCI with PCP=5 in the top bits; only the 12-bit VID changes.
    let m = FieldMutator::new(FieldType::Counter16, 2, 0x0fff, 101, Mode::Decrement, 7)
        .expect("valid mutator");
    let mut buf = vec![0x81, 0x00, 0xa0, 0x00];
    m.apply(&mut buf, 2, 3);
    assert_eq!(buf, vec![0x81, 0x00, 0xa0, 98]);
}

#[test]
fn apply_writes_counter32_big_endian() {
    let m = FieldMutator::new(FieldType::Counter32, 0, 0xff, 101, Mode::Increment, 5)
        .expect("valid mutator");
    let mut buf = vec![5, 6, 7, 8];
    m.apply(&mut buf, 0, 4);
    assert_eq!(buf, vec![5, 6, 7, 105]);
}

#[test]
fn apply_out_of_bounds_is_a_no_op() {
    let m = FieldMutator::new(FieldType::Counter32, 0, 0xff, 1, Mode::Increment, 1)
        .expect("valid mutator");
    let mut buf = vec![1, 2, 3];
    m.apply(&mut buf, 0, 0);
    assert_eq!(buf, vec![1, 2, 3]);
}
