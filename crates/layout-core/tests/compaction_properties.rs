use chronosketch_layout::{compute_layout, select_in_world, Selection, TimelineViewport};
use chronosketch_layout::timeline::compacted_duration;
use chronosketch_model::{PenStyle, Point, Point2D, Stroke, StrokeId, Transform};
use proptest::prelude::*;

fn make_stroke(i: usize, start: f64, len: f64, x: f64) -> Stroke {
    Stroke::freehand(
        StrokeId::new(format!("stroke-{i}")),
        vec![
            Point::new(x, 0.0, start),
            Point::new(x + 1.0, 1.0, start + len / 2.0),
            Point::new(x + 2.0, 2.0, start + len),
        ],
        &PenStyle::default(),
        start as i64,
        (start + len) as i64,
    )
    .expect("valid stroke")
}

fn strokes_strategy() -> impl Strategy<Value = Vec<Stroke>> {
    prop::collection::vec((0.0f64..1.0e7, 0.0f64..5_000.0, 0.0f64..1_000.0), 1..20).prop_map(
        |specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (start, len, x))| make_stroke(i, start, len, x))
                .collect()
        },
    )
}

proptest! {
    #[test]
    fn prop_compacted_durations_sum_to_total(strokes in strokes_strategy()) {
        let layout = compute_layout(&strokes, 1_000.0, TimelineViewport::new(200.0, 800.0));
        let sum: f64 = strokes.iter().map(compacted_duration).sum();
        prop_assert!((layout.total_duration - sum).abs() < 1e-6 * sum.max(1.0));
        prop_assert!(strokes.iter().all(|s| compacted_duration(s) >= 1.0));
    }

    #[test]
    fn prop_bands_do_not_overlap(strokes in strokes_strategy()) {
        let layout = compute_layout(&strokes, 1_000.0, TimelineViewport::new(200.0, 800.0));
        let mut bands: Vec<(f64, f64)> = layout
            .items
            .iter()
            .map(|item| (item.offset, item.offset + item.duration))
            .collect();
        bands.sort_by(|a, b| a.0.total_cmp(&b.0));
        prop_assert_eq!(bands[0].0, 0.0);
        for pair in bands.windows(2) {
            prop_assert!((pair[0].1 - pair[1].0).abs() < 1e-6 * layout.total_duration);
        }
        for item in &layout.items {
            for p in &item.points {
                prop_assert!(p.y >= 0.0 && p.y <= 800.0 + 1e-6);
            }
        }
    }

    #[test]
    fn prop_lasso_on_a_point_hits_its_stroke(strokes in strokes_strategy(), pick in any::<prop::sample::Index>()) {
        let idx = pick.index(strokes.len());
        let target = strokes[idx].points[1].position();
        // Degenerate rectangle: the point sits exactly on every edge.
        let sel = select_in_world(&strokes, target, target, false, |_| Transform::IDENTITY);
        prop_assert!(sel.contains(idx));
    }
}

#[test]
fn lasso_replaces_previous_selection() {
    let strokes = vec![make_stroke(0, 0.0, 10.0, 0.0), make_stroke(1, 100.0, 10.0, 500.0)];
    let mut selection = Selection::new();
    selection.replace(
        select_in_world(&strokes, Point2D::new(-1.0, -1.0), Point2D::new(5.0, 5.0), false, |_| {
            Transform::IDENTITY
        })
        .iter(),
    );
    assert_eq!(selection.iter().collect::<Vec<_>>(), vec![0]);
    selection = select_in_world(
        &strokes,
        Point2D::new(499.0, -1.0),
        Point2D::new(505.0, 5.0),
        false,
        |_| Transform::IDENTITY,
    );
    assert_eq!(selection.iter().collect::<Vec<_>>(), vec![1]);
}
