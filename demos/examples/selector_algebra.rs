// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Selector algebra.
//!
//! Combine geometric selectors with boolean operators and test them against particles
//! with a support radius.
//!
//! Run:
//! - `cargo run -p parcel_demos --example selector_algebra`

use glam::DVec3;
use parcel_select::Selector;

fn main() {
    let h = 0.25;
    let particles = [
        DVec3::ZERO,
        DVec3::new(1.0, 0.0, 0.0),
        DVec3::new(0.0, 1.0, 0.0),
        DVec3::new(0.0, 0.0, 1.0),
    ];

    let origin = Selector::sphere(DVec3::ZERO, 0.5).unwrap();
    let x_unit = Selector::sphere(DVec3::X, 0.5).unwrap();
    let everything = Selector::region(DVec3::splat(-4.0), DVec3::splat(4.0)).unwrap();

    let named = [
        ("origin | x_unit", origin.clone() | x_unit.clone()),
        ("origin & x_unit", origin.clone() & x_unit.clone()),
        ("everything - origin", everything.clone() - origin.clone()),
        ("origin ^ everything", origin.clone() ^ everything.clone()),
        ("x_unit within everything", x_unit.within(everything)),
    ];
    for (name, selector) in &named {
        let picked: Vec<DVec3> = particles
            .iter()
            .copied()
            .filter(|p| selector.select_particle(*p, h))
            .collect();
        println!("{name}: {picked:?}");
    }

    // A particle just outside the sphere is still selected through its support radius.
    let grazing = DVec3::new(0.7, 0.0, 0.0);
    assert!(!origin.select_point(grazing));
    assert!(origin.select_particle(grazing, h));
    println!("{grazing} is selected by its support sphere only");
}
