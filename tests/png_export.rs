#![cfg(feature = "render")]

use std::fs;

use tempfile::tempdir;

use depthplot::plot::{self, PlotRequest};
use depthplot::{ChartStyle, PngRenderer};

#[test]
fn writes_png_with_rolling_suffix() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("results.csv");
    let labels = dir.path().join("labels.csv");
    let rows: String = (1..=28)
        .map(|day| format!("2024-02-{day:02},{},{}\n", day * 10, day % 4))
        .collect();
    fs::write(&input, format!("Start,depthsum,depths\n{rows}")).expect("write samples");
    fs::write(&labels, "2024-02-10,upgrade\n2025-01-01,outside\n").expect("write labels");

    let style = ChartStyle {
        figure_size: (6.0, 3.5),
        dpi: 50,
        ..ChartStyle::default()
    };
    let request = PlotRequest {
        input,
        labels: Some(labels),
        window_days: 7,
        ..PlotRequest::default()
    };

    let renderer = PngRenderer::new(style.clone());
    let outcome = plot::run(&request, &style, &renderer).expect("render");
    assert_eq!(outcome.output, dir.path().join("results_d7.png"));
    assert_eq!(outcome.labels_drawn, 1);

    let bytes = fs::read(&outcome.output).expect("png written");
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
}
