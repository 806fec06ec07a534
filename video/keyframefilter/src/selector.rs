// Copyright (C) 2022 Bohdan Shubenok <bohdan.shubenok@sigma.software>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// <https://mozilla.org/MPL/2.0/>.
//
// SPDX-License-Identifier: MPL-2.0

//! Key frame selection, independent of any pipeline machinery.
//!
//! A [`KeyFrameSelector`] looks at one frame at a time and decides whether it is forwarded
//! or dropped. Only the delta unit tag of a frame is consulted, the frame itself is never
//! copied, inspected or modified.

/// A unit of encoded video that carries a delta unit tag.
pub trait Frame {
    /// `Some(true)` for frames that depend on other frames, `Some(false)` for key frames and
    /// `None` if the frame carries no usable tag.
    fn delta_unit(&self) -> Option<bool>;
}

impl<T: Frame + ?Sized> Frame for &T {
    fn delta_unit(&self) -> Option<bool> {
        (**self).delta_unit()
    }
}

/// Outcome of [`KeyFrameSelector::on_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Forward,
    Drop,
}

/// What to do with frames that carry no delta unit tag.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UntaggedPolicy {
    /// Treat them like delta units.
    #[default]
    Drop,
    /// Treat them like key frames.
    Forward,
}

#[derive(Debug, Default)]
pub struct KeyFrameSelector {
    policy: UntaggedPolicy,
    frames_seen: u64,
    keyframes: u64,
}

impl KeyFrameSelector {
    pub fn new(policy: UntaggedPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn policy(&self) -> UntaggedPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: UntaggedPolicy) {
        self.policy = policy;
    }

    /// Number of frames passed to [`on_frame`](Self::on_frame) so far.
    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// Number of frames that were forwarded so far.
    pub fn keyframes(&self) -> u64 {
        self.keyframes
    }

    /// Decides whether `frame` is forwarded downstream.
    ///
    /// Never fails. Untagged frames are handled according to the configured
    /// [`UntaggedPolicy`].
    pub fn on_frame<F: Frame + ?Sized>(&mut self, frame: &F) -> Action {
        self.frames_seen += 1;

        let action = match (frame.delta_unit(), self.policy) {
            (Some(false), _) | (None, UntaggedPolicy::Forward) => Action::Forward,
            (Some(true), _) | (None, UntaggedPolicy::Drop) => Action::Drop,
        };

        if action == Action::Forward {
            self.keyframes += 1;
        }

        action
    }

    /// Lazily filters `frames` down to the ones that are forwarded.
    ///
    /// Each input frame is looked at only when the returned iterator is advanced, and a
    /// forwarded frame is handed out before the next input frame is pulled.
    pub fn select<I>(&mut self, frames: I) -> Select<'_, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: Frame,
    {
        Select {
            selector: self,
            frames: frames.into_iter(),
        }
    }
}

/// Iterator returned by [`KeyFrameSelector::select`].
#[derive(Debug)]
pub struct Select<'a, I> {
    selector: &'a mut KeyFrameSelector,
    frames: I,
}

impl<I> Iterator for Select<'_, I>
where
    I: Iterator,
    I::Item: Frame,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        for frame in self.frames.by_ref() {
            if self.selector.on_frame(&frame) == Action::Forward {
                return Some(frame);
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.frames.size_hint().1)
    }
}
