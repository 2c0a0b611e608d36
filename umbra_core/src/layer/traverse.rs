// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use crate::occlusion::TraversalEvent;

use super::element::LayerRef;
use super::id::{INVALID, LayerId};
use super::store::LayerStore;

/// An iterator over the direct children of a layer.
///
/// Created by [`LayerStore::children`].
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a LayerStore,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a LayerStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = LayerId;

    fn next(&mut self) -> Option<LayerId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(LayerId {
            idx,
            generation: self.store.generation[idx as usize],
        })
    }
}

/// Front-to-back traversal events for one root.
///
/// Created by [`LayerStore::front_to_back`].
#[derive(Debug)]
pub struct FrontToBack<'a> {
    store: &'a LayerStore,
    events: core::slice::Iter<'a, TraversalEvent<u32>>,
}

impl<'a> Iterator for FrontToBack<'a> {
    type Item = TraversalEvent<LayerRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let store = self.store;
        let at = |idx: u32| LayerRef::new(store, idx);
        self.events.next().map(|event| match *event {
            TraversalEvent::Itself { layer, target } => TraversalEvent::Itself {
                layer: at(layer),
                target: at(target),
            },
            TraversalEvent::TargetSurface(owner) => TraversalEvent::TargetSurface(at(owner)),
            TraversalEvent::ContributingSurface { surface, target } => {
                TraversalEvent::ContributingSurface {
                    surface: at(surface),
                    target: at(target),
                }
            }
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.events.size_hint()
    }
}

impl ExactSizeIterator for FrontToBack<'_> {}

impl LayerStore {
    /// Returns the front-to-back traversal of the tree rooted at `root`.
    ///
    /// The list is built by
    /// [`update_draw_properties`](Self::update_draw_properties); before the
    /// first pass, or for a layer that was not a root during the last pass,
    /// it is empty.
    ///
    /// Each render surface's content is listed top-most first. A surface with
    /// content appears as its content, then
    /// [`TargetSurface`](TraversalEvent::TargetSurface), then
    /// [`ContributingSurface`](TraversalEvent::ContributingSurface). The
    /// traversal ends with `TargetSurface(root)`.
    #[must_use]
    pub fn front_to_back(&self, root: LayerId) -> FrontToBack<'_> {
        self.validate(root);
        let events = self
            .front_to_back
            .iter()
            .find(|(r, _)| *r == root.idx)
            .map_or(&[][..], |(_, events)| events.as_slice());
        FrontToBack {
            store: self,
            events: events.iter(),
        }
    }
}
