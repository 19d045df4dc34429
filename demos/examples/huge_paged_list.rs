// Copyright 2025 the Midstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A paged list over one million rows with bounded materialization.
//!
//! The paged engine keeps at most one page of items alive no matter how far
//! the list scrolls, shifting the page and re-anchoring the offset when the
//! window approaches a page edge.
//!
//! Run:
//! - `cargo run -p midstory_demos --example huge_paged_list`

use std::num::NonZeroUsize;

use kurbo::{Size, Vec2};
use midstory_demos::{ConsoleHost, RowView};
use midstory_scroll::{Flow, PagedScrollEngine};

fn main() {
    let page = NonZeroUsize::new(64).unwrap();
    let mut list = PagedScrollEngine::new(ConsoleHost::default(), Flow::TopDown, page);
    list.set_viewport_size(Size::new(320.0, 240.0));
    list.set_count_fn(|| 1_000_000);
    list.set_size_fn(|_| Size::new(320.0, 24.0));
    list.set_update_fn(|index, view: &mut RowView, rect| {
        view.rect = rect;
        view.label = format!("row {index}");
    });
    list.update_data(true);

    // Drag downwards for a while; the page slides underneath the viewport.
    for _ in 0..2_000 {
        list.scroll_by(Vec2::new(0.0, 18.0));
    }
    let window = list.logical_window().expect("rows visible");
    println!(
        "after dragging: rows {}..={} shown, page starts at {}, {} handles live",
        window.first_shown,
        window.last_shown,
        list.start_offset(),
        list.pool().bound_len()
    );
    assert!(list.pool().bound_len() <= list.page_size() + 2);

    // Jump near the end; the page re-centers around the target.
    list.scroll_to(999_990, 0.0);
    let window = list.logical_window().expect("rows visible");
    println!(
        "after jumping: rows {}..={} shown, page starts at {}, {} handles live",
        window.first_shown,
        window.last_shown,
        list.start_offset(),
        list.pool().bound_len()
    );

    println!("views ever created: {}", list.pool().lifecycle().created());
}
