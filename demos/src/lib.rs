// Copyright 2025 the Midstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared scaffolding for the midstory demos: a console-backed "host" that
//! stands in for a real widget toolkit.

use kurbo::Rect;
use midstory_pool::HandleLifecycle;

/// A stand-in display handle: in a real host this would be a widget or view.
#[derive(Debug, Default)]
pub struct RowView {
    /// Logical index currently bound to this view, if any.
    pub index: Option<usize>,
    /// Where the view was last positioned in content-local coordinates.
    pub rect: Rect,
    /// The text content last applied.
    pub label: String,
}

/// A lifecycle that narrates create/attach/reset transitions to stdout.
#[derive(Debug, Default)]
pub struct ConsoleHost {
    created: usize,
    verbose: bool,
}

impl ConsoleHost {
    /// A host that prints every handle transition.
    #[must_use]
    pub fn verbose() -> Self {
        Self {
            created: 0,
            verbose: true,
        }
    }

    /// How many views were ever created (as opposed to recycled).
    #[must_use]
    pub fn created(&self) -> usize {
        self.created
    }
}

impl HandleLifecycle for ConsoleHost {
    type Handle = RowView;

    fn create(&mut self) -> RowView {
        self.created += 1;
        if self.verbose {
            println!("  [host] create view #{}", self.created);
        }
        RowView::default()
    }

    fn attach(&mut self, handle: &mut RowView, index: usize) {
        handle.index = Some(index);
        if self.verbose {
            println!("  [host] attach view -> item {index}");
        }
    }

    fn reset(&mut self, handle: &mut RowView) {
        if self.verbose {
            if let Some(index) = handle.index {
                println!("  [host] reset view (was item {index})");
            }
        }
        handle.index = None;
        handle.label.clear();
    }
}
