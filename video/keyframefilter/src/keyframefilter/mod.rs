// Copyright (C) 2022 Bohdan Shubenok <bohdan.shubenok@sigma.software>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// <https://mozilla.org/MPL/2.0/>.
//
// SPDX-License-Identifier: MPL-2.0

/**
 * SECTION:element-keyframefilter
 *
 * Drops every buffer of an H.264 stream except key frames, i.e. buffers without the
 * `DELTA_UNIT` flag. Key frames are passed through untouched and in order.
 *
 * ## Example pipeline
 *
 * ```bash
 * gst-launch-1.0 filesrc location=video.mp4 ! qtdemux ! h264parse ! keyframefilter ! avdec_h264 ! videoconvert ! autovideosink
 * ```
 */
use gst::glib;
use gst::prelude::*;

use crate::selector::Frame;

mod imp;

impl Frame for gst::BufferRef {
    fn delta_unit(&self) -> Option<bool> {
        Some(self.flags().contains(gst::BufferFlags::DELTA_UNIT))
    }
}

impl Frame for gst::Buffer {
    fn delta_unit(&self) -> Option<bool> {
        <gst::BufferRef as Frame>::delta_unit(self)
    }
}

glib::wrapper! {
    pub struct KeyFrameFilter(ObjectSubclass<imp::KeyFrameFilter>) @extends gst::Element, gst::Object;
}

pub fn register(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    gst::Element::register(
        Some(plugin),
        "keyframefilter",
        gst::Rank::NONE,
        KeyFrameFilter::static_type(),
    )
}
