use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use relief_mesh::{MeshOptions, VectorPath, build_mesh, parse_svg_str};
use std::hint::black_box;

const COLORS: [&str; 4] = ["#000000", "#ff0000", "#00ff00", "#0000ff"];

/// A checkerboard of squares, each with a round dot on top
fn generate_grid(cells: usize) -> Vec<VectorPath> {
    let mut paths = Vec::with_capacity(cells * cells * 2);
    for row in 0..cells {
        for col in 0..cells {
            let (x, y) = (col as f64 * 10.0, row as f64 * 10.0);
            paths.push(
                VectorPath::from_path_data(format!("M{} {} h10 v10 h-10 Z", x, y))
                    .with_fill(COLORS[(row + col) % 2]),
            );
            paths.push(
                VectorPath::from_path_data(format!(
                    "M{} {} a3 3 0 1 0 6 0 a3 3 0 1 0 -6 0 Z",
                    x + 2.0,
                    y + 5.0
                ))
                .with_fill(COLORS[2 + (row + col) % 2]),
            );
        }
    }
    paths
}

fn options() -> MeshOptions {
    COLORS
        .iter()
        .enumerate()
        .fold(MeshOptions::default(), |options, (i, color)| {
            options.with_type_depth(*color, 1.0 + i as f64 * 0.5)
        })
}

fn bench_build_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_grid");
    group.sample_size(10);

    for &cells in &[2usize, 5, 10] {
        let paths = generate_grid(cells);
        let options = options();
        group.bench_with_input(
            BenchmarkId::new("cells", format!("{}x{}", cells, cells)),
            &paths,
            |b, paths| {
                b.iter(|| black_box(build_mesh(paths, None, &options).unwrap()));
            },
        );
    }
    group.finish();
}

fn bench_parse_svg(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_svg");

    for &count in &[100usize, 1000] {
        let mut svg = String::from(r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1000 1000">"#);
        for i in 0..count {
            svg.push_str(&format!(
                r##"<path d="M{0} {0} h5 v5 h-5 Z" fill="#{1:06x}"/>"##,
                i % 1000,
                i * 97 % 0xffffff
            ));
        }
        svg.push_str("</svg>");

        group.bench_with_input(BenchmarkId::new("paths", count), &svg, |b, svg| {
            b.iter(|| black_box(parse_svg_str(svg).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_grid, bench_parse_svg);
criterion_main!(benches);
