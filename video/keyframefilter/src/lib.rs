// Copyright (C) 2022 Bohdan Shubenok <bohdan.shubenok@sigma.software>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// <https://mozilla.org/MPL/2.0/>.
//
// SPDX-License-Identifier: MPL-2.0
#![allow(unused_doc_comments)]

/**
 * plugin-keyframefilter:
 *
 * Since: plugins-rs-0.14.0
 */
use gst::glib;

mod keyframefilter;
pub mod player;
pub mod selector;

fn plugin_init(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    keyframefilter::register(plugin)
}

gst::plugin_define!(
    keyframefilter,
    env!("CARGO_PKG_DESCRIPTION"),
    plugin_init,
    concat!(env!("CARGO_PKG_VERSION"), "-", env!("COMMIT_ID")),
    "MPL",
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_REPOSITORY"),
    env!("BUILD_REL_DATE")
);
