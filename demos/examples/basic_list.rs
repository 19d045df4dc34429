// Copyright 2025 the Midstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A virtualized list over 1,000 variable-height rows.
//!
//! This example shows the full host loop:
//! - bind the count/size/update callbacks,
//! - defer the first refresh until the viewport is sized (`end_frame`),
//! - push scroll offsets in and watch the critical window slide,
//! - jump with `scroll_to` and an anchor fraction.
//!
//! Run:
//! - `cargo run -p midstory_demos --example basic_list`

use kurbo::{Size, Vec2};
use midstory_demos::{ConsoleHost, RowView};
use midstory_scroll::{Align, Flow, ScrollEngine};

fn row_height(index: usize) -> f64 {
    // Every fifth row is a tall "section header".
    if index % 5 == 0 { 64.0 } else { 28.0 }
}

fn main() {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let mut list = ScrollEngine::new(ConsoleHost::verbose(), Flow::TopDown);
    list.set_spacing(4.0);
    list.set_count_fn(|| 1_000);
    list.set_size_fn(|index| Size::new(320.0, row_height(index)));
    list.set_update_fn(|index, view: &mut RowView, rect| {
        view.rect = rect;
        view.label = format!("row {index}");
    });

    // Data arrives before layout: the refresh is parked until the host
    // reports a viewport size.
    list.update_data(false);
    assert!(list.end_frame().is_empty());

    list.set_viewport_size(Size::new(320.0, 240.0));
    list.end_frame();
    report("after first layout", &mut list);

    // Smooth scrolling: each offset change patches the window boundaries.
    for step in 1..=6 {
        list.set_scroll_offset(Vec2::new(0.0, step as f64 * 45.0));
    }
    report("after scrolling to 270px", &mut list);

    // Long-distance jump: center row 500 in the viewport.
    list.scroll_to(500, 0.5);
    report("after centering row 500", &mut list);

    // And nudge the last row fully into view.
    list.scroll_to_aligned(999, Align::Nearest);
    report("after revealing the last row", &mut list);

    println!(
        "\nviews ever created: {} (recycled across {} rows)",
        list.pool().lifecycle().created(),
        list.len()
    );
}

fn report(label: &str, list: &mut ScrollEngine<ConsoleHost>) {
    let window = list.window().expect("list should have visible rows");
    let extent = list.content_extent();
    println!(
        "\n== {label}: rows {}..={} shown, content {:.0}px ==",
        window.first_shown, window.last_shown, extent.height
    );
    for index in window.shown() {
        let view = list.handle(index).expect("shown rows are materialized");
        println!(
            "  {:<8} y = {:6.1} .. {:6.1}",
            view.label, view.rect.y0, view.rect.y1
        );
    }
}
