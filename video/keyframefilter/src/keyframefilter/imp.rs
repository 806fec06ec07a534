// Copyright (C) 2022 Bohdan Shubenok <bohdan.shubenok@sigma.software>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// <https://mozilla.org/MPL/2.0/>.
//
// SPDX-License-Identifier: MPL-2.0

use gst::glib;
use gst::prelude::*;
use gst::subclass::prelude::*;

use std::sync::LazyLock;
use std::sync::Mutex;

use crate::selector::{Action, KeyFrameSelector};

static CAT: LazyLock<gst::DebugCategory> = LazyLock::new(|| {
    gst::DebugCategory::new(
        "keyframefilter",
        gst::DebugColorFlags::empty(),
        Some("H.264 key frame filter"),
    )
});

pub struct KeyFrameFilter {
    srcpad: gst::Pad,
    sinkpad: gst::Pad,
    selector: Mutex<KeyFrameSelector>,
}

impl KeyFrameFilter {
    fn sink_chain(
        &self,
        pad: &gst::Pad,
        buffer: gst::Buffer,
    ) -> Result<gst::FlowSuccess, gst::FlowError> {
        let (action, frames_seen) = {
            let mut selector = self.selector.lock().unwrap();
            let action = selector.on_frame(&buffer);
            (action, selector.frames_seen())
        };

        match action {
            Action::Forward => {
                gst::info!(CAT, obj = pad, "Key frame number {frames_seen}");
                self.srcpad.push(buffer)
            }
            Action::Drop => {
                gst::trace!(CAT, obj = pad, "Dropping {buffer:?}");
                Ok(gst::FlowSuccess::Ok)
            }
        }
    }

    fn sink_event(&self, pad: &gst::Pad, event: gst::Event) -> bool {
        gst::log!(CAT, obj = pad, "Handling event {event:?}");

        if let gst::EventView::Eos(..) = event.view() {
            let selector = self.selector.lock().unwrap();
            gst::debug!(
                CAT,
                obj = pad,
                "EOS after {} frames, {} key frames forwarded",
                selector.frames_seen(),
                selector.keyframes(),
            );
        }

        gst::Pad::event_default(pad, Some(&*self.obj()), event)
    }
}

#[glib::object_subclass]
impl ObjectSubclass for KeyFrameFilter {
    const NAME: &'static str = "GstKeyFrameFilter";
    type Type = super::KeyFrameFilter;
    type ParentType = gst::Element;

    fn with_class(klass: &Self::Class) -> Self {
        let templ = klass.pad_template("sink").unwrap();
        let sinkpad = gst::Pad::builder_from_template(&templ)
            .chain_function(|pad, parent, buffer| {
                KeyFrameFilter::catch_panic_pad_function(
                    parent,
                    || Err(gst::FlowError::Error),
                    |filter| filter.sink_chain(pad, buffer),
                )
            })
            .event_function(|pad, parent, event| {
                KeyFrameFilter::catch_panic_pad_function(
                    parent,
                    || false,
                    |filter| filter.sink_event(pad, event),
                )
            })
            .flags(gst::PadFlags::PROXY_CAPS | gst::PadFlags::PROXY_ALLOCATION)
            .build();

        let templ = klass.pad_template("src").unwrap();
        let srcpad = gst::Pad::builder_from_template(&templ)
            .flags(gst::PadFlags::PROXY_CAPS | gst::PadFlags::PROXY_ALLOCATION)
            .build();

        Self {
            srcpad,
            sinkpad,
            selector: Mutex::new(KeyFrameSelector::default()),
        }
    }
}

impl ObjectImpl for KeyFrameFilter {
    fn properties() -> &'static [glib::ParamSpec] {
        static PROPERTIES: LazyLock<Vec<glib::ParamSpec>> = LazyLock::new(|| {
            vec![
                glib::ParamSpecUInt64::builder("frames-seen")
                    .nick("Frames Seen")
                    .blurb("Number of buffers received so far")
                    .read_only()
                    .build(),
                glib::ParamSpecUInt64::builder("keyframes")
                    .nick("Key Frames")
                    .blurb("Number of key frames forwarded so far")
                    .read_only()
                    .build(),
            ]
        });

        PROPERTIES.as_ref()
    }

    fn property(&self, _id: usize, pspec: &glib::ParamSpec) -> glib::Value {
        let selector = self.selector.lock().unwrap();

        match pspec.name() {
            "frames-seen" => selector.frames_seen().to_value(),
            "keyframes" => selector.keyframes().to_value(),
            _ => unimplemented!(),
        }
    }

    fn constructed(&self) {
        self.parent_constructed();

        let obj = self.obj();
        obj.add_pad(&self.sinkpad).unwrap();
        obj.add_pad(&self.srcpad).unwrap();
    }
}

impl GstObjectImpl for KeyFrameFilter {}

impl ElementImpl for KeyFrameFilter {
    fn metadata() -> Option<&'static gst::subclass::ElementMetadata> {
        static ELEMENT_METADATA: LazyLock<gst::subclass::ElementMetadata> = LazyLock::new(|| {
            gst::subclass::ElementMetadata::new(
                "H.264 Key Frame Filter",
                "Filter/Video",
                "Drops all frames except key frames",
                "Bohdan Shubenok <bohdan.shubenok@sigma.software>",
            )
        });

        Some(&*ELEMENT_METADATA)
    }

    fn pad_templates() -> &'static [gst::PadTemplate] {
        static PAD_TEMPLATES: LazyLock<Vec<gst::PadTemplate>> = LazyLock::new(|| {
            let caps = gst::Caps::builder("video/x-h264").build();
            let src_pad_template = gst::PadTemplate::new(
                "src",
                gst::PadDirection::Src,
                gst::PadPresence::Always,
                &caps,
            )
            .unwrap();

            let sink_pad_template = gst::PadTemplate::new(
                "sink",
                gst::PadDirection::Sink,
                gst::PadPresence::Always,
                &caps,
            )
            .unwrap();

            vec![src_pad_template, sink_pad_template]
        });

        PAD_TEMPLATES.as_ref()
    }
}
