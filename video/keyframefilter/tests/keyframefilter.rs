// Copyright (C) 2022 Bohdan Shubenok <bohdan.shubenok@sigma.software>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// <https://mozilla.org/MPL/2.0/>.
//
// SPDX-License-Identifier: MPL-2.0

use gst::prelude::*;

fn init() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        gst::init().unwrap();
        gstkeyframefilter::plugin_register_static().expect("keyframefilter test");
    });
}

fn new_harness() -> gst_check::Harness {
    let mut h = gst_check::Harness::new("keyframefilter");
    h.set_src_caps_str("video/x-h264, stream-format=(string)byte-stream, alignment=(string)au");
    h
}

fn frame(index: u64, flags: gst::BufferFlags) -> gst::Buffer {
    let mut buffer = gst::Buffer::with_size(1).unwrap();
    {
        let buffer = buffer.get_mut().unwrap();
        buffer.set_pts(index.seconds());
        buffer.set_duration(gst::ClockTime::SECOND);
        buffer.set_flags(flags);
    }
    buffer
}

fn delta_frame(index: u64, delta_unit: bool) -> gst::Buffer {
    let flags = if delta_unit {
        gst::BufferFlags::DELTA_UNIT
    } else {
        gst::BufferFlags::empty()
    };
    frame(index, flags)
}

#[test]
fn test_forwards_key_frames_only() {
    init();

    let mut h = new_harness();

    for (index, delta_unit) in [false, true, true, false, true].into_iter().enumerate() {
        assert_eq!(
            h.push(delta_frame(index as u64, delta_unit)),
            Ok(gst::FlowSuccess::Ok)
        );
    }

    assert_eq!(h.buffers_in_queue(), 2);

    let buffer = h.pull().expect("Couldn't pull buffer");
    assert_eq!(buffer.pts(), Some(gst::ClockTime::ZERO));
    assert!(!buffer.flags().contains(gst::BufferFlags::DELTA_UNIT));

    let buffer = h.pull().expect("Couldn't pull buffer");
    assert_eq!(buffer.pts(), Some(3.seconds()));
    assert!(!buffer.flags().contains(gst::BufferFlags::DELTA_UNIT));

    assert!(h.try_pull().is_none());

    let element = h.element().unwrap();
    assert_eq!(element.property::<u64>("frames-seen"), 5);
    assert_eq!(element.property::<u64>("keyframes"), 2);
}

#[test]
fn test_forwards_buffer_unchanged() {
    init();

    let mut h = new_harness();

    let input = gst::Buffer::from_slice([0u8, 0, 0, 1, 0x65, 0x88, 0x84]);
    let input_ptr = input.as_ptr();
    assert_eq!(h.push(input), Ok(gst::FlowSuccess::Ok));

    let output = h.pull().expect("Couldn't pull buffer");
    assert_eq!(output.as_ptr(), input_ptr);
    let map = output.map_readable().unwrap();
    assert_eq!(map.as_slice(), &[0u8, 0, 0, 1, 0x65, 0x88, 0x84]);
}

#[test]
fn test_only_delta_units() {
    init();

    let mut h = new_harness();

    for index in 0..10 {
        assert_eq!(h.push(delta_frame(index, true)), Ok(gst::FlowSuccess::Ok));
    }

    assert_eq!(h.buffers_in_queue(), 0);

    let element = h.element().unwrap();
    assert_eq!(element.property::<u64>("frames-seen"), 10);
    assert_eq!(element.property::<u64>("keyframes"), 0);
}

#[test]
fn test_initial_counters() {
    init();

    let h = new_harness();
    let element = h.element().unwrap();

    assert_eq!(element.property::<u64>("frames-seen"), 0);
    assert_eq!(element.property::<u64>("keyframes"), 0);
}

#[test]
fn test_gap_buffers_follow_delta_unit_flag() {
    init();

    let mut h = new_harness();

    assert_eq!(
        h.push(frame(0, gst::BufferFlags::GAP)),
        Ok(gst::FlowSuccess::Ok)
    );
    assert_eq!(
        h.push(frame(
            1,
            gst::BufferFlags::GAP | gst::BufferFlags::DELTA_UNIT
        )),
        Ok(gst::FlowSuccess::Ok)
    );

    assert_eq!(h.buffers_in_queue(), 1);
    let buffer = h.pull().expect("Couldn't pull buffer");
    assert_eq!(buffer.pts(), Some(gst::ClockTime::ZERO));
    assert!(buffer.flags().contains(gst::BufferFlags::GAP));

    let element = h.element().unwrap();
    assert_eq!(element.property::<u64>("frames-seen"), 2);
    assert_eq!(element.property::<u64>("keyframes"), 1);
}

#[test]
fn test_propagates_downstream_flow_return() {
    init();

    let mut h = new_harness();

    h.sinkpad()
        .expect("harness has no sinkpad")
        .set_active(false)
        .unwrap();

    assert_eq!(
        h.push(delta_frame(0, false)),
        Err(gst::FlowError::Flushing)
    );
    // Dropped frames never reach downstream
    assert_eq!(h.push(delta_frame(1, true)), Ok(gst::FlowSuccess::Ok));

    let element = h.element().unwrap();
    assert_eq!(element.property::<u64>("frames-seen"), 2);
    assert_eq!(element.property::<u64>("keyframes"), 1);
}

#[test]
fn test_forwards_events() {
    init();

    let mut h = new_harness();

    assert!(h.push_event(gst::event::Eos::new()));

    let mut saw_caps = false;
    let mut saw_eos = false;
    while let Some(event) = h.try_pull_event() {
        match event.view() {
            gst::EventView::Caps(ev) => {
                saw_caps = true;
                assert!(ev.caps().structure(0).unwrap().has_name("video/x-h264"));
            }
            gst::EventView::Eos(..) => saw_eos = true,
            _ => (),
        }
    }

    assert!(saw_caps);
    assert!(saw_eos);
}
