#![no_main]

use libfuzzer_sys::arbitrary::{Arbitrary, Result, Unstructured};
use libfuzzer_sys::fuzz_target;
use relief_mesh::{MeshOptions, VectorPath};

const COLORS: [&str; 3] = ["#000000", "#ff0000", "#ffffff"];

#[derive(Debug)]
struct FuzzDrawing {
    paths: Vec<(String, usize)>,
}

impl<'a> Arbitrary<'a> for FuzzDrawing {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        // Small integer polygons keep the clipper and triangulator busy
        // without spending the run on huge inputs
        let path_count = u.int_in_range(1..=6)?;
        let mut paths = Vec::with_capacity(path_count);
        for _ in 0..path_count {
            let point_count = u.int_in_range(3..=8)?;
            let mut d = String::new();
            for i in 0..point_count {
                let x: i8 = u.arbitrary()?;
                let y: i8 = u.arbitrary()?;
                d.push_str(&format!("{}{} {} ", if i == 0 { "M" } else { "L" }, x, y));
            }
            d.push('Z');
            paths.push((d, u.int_in_range(0..=COLORS.len() - 1)?));
        }
        Ok(FuzzDrawing { paths })
    }
}

fuzz_target!(|drawing: FuzzDrawing| {
    let paths: Vec<VectorPath> = drawing
        .paths
        .iter()
        .map(|(d, color)| VectorPath::from_path_data(d.as_str()).with_fill(COLORS[*color]))
        .collect();
    let options = COLORS
        .iter()
        .enumerate()
        .fold(MeshOptions::default(), |options, (i, color)| {
            options.with_type_depth(*color, 1.0 + i as f64)
        })
        .with_self_intersection_policy(relief_mesh::SelfIntersectionPolicy::Resolve);

    // Either a typed error or a mesh whose report is consistent
    if let Ok(build) = relief_mesh::build_mesh(&paths, None, &options) {
        assert_eq!(build.is_manifold(), build.mesh.is_manifold());
    }
});
