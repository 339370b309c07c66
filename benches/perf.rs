use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use offside_review::adjustment::{AdjustmentForm, FormOptions};
use offside_review::detection::{
    DetectionSnapshot, PlayersDetections, PointSet, Team, parse_detection_json,
};

fn full_match_snapshot() -> DetectionSnapshot {
    let ids: Vec<i64> = (1..=22).collect();
    DetectionSnapshot {
        players_xy: PointSet {
            tracker_id: ids.iter().rev().copied().collect(),
            xy: ids
                .iter()
                .rev()
                .map(|id| [*id as f64 * 500.0, (*id % 7) as f64 * 1000.0])
                .collect(),
        },
        players_detections: PlayersDetections {
            tracker_id: ids.clone(),
            class_id: ids.iter().map(|id| id % 2).collect(),
            class_name: vec!["player".to_string(); ids.len()],
            confidence: vec![0.8; ids.len()],
            xyxy: Some(vec![[0.0, 0.0, 10.0, 20.0]; ids.len()]),
        },
        ..DetectionSnapshot::default()
    }
}

fn bench_detection_parse(c: &mut Criterion) {
    c.bench_function("detection_parse", |b| {
        b.iter(|| {
            let snapshot = parse_detection_json(black_box(DETECTION_JSON)).unwrap();
            black_box(snapshot.player_count());
        })
    });
}

fn bench_apply_adjustments(c: &mut Criterion) {
    let snapshot = full_match_snapshot();
    let mut form = AdjustmentForm::from_snapshot(&snapshot, FormOptions::default());
    for row in 0..form.rows.len() {
        if row % 5 == 0 {
            form.toggle_delete();
        } else {
            form.set_team(Team::B);
        }
        form.select_next();
    }

    c.bench_function("apply_adjustments_22", |b| {
        b.iter(|| {
            let mut working = snapshot.clone();
            let summary = form.apply(black_box(&mut working)).unwrap();
            black_box(summary.deleted.len());
        })
    });
}

fn bench_player_points(c: &mut Criterion) {
    let snapshot = full_match_snapshot();
    c.bench_function("player_points_22", |b| {
        b.iter(|| {
            let points = black_box(&snapshot).player_points();
            black_box(points.len());
        })
    });
}

criterion_group!(
    perf,
    bench_detection_parse,
    bench_apply_adjustments,
    bench_player_points
);
criterion_main!(perf);

static DETECTION_JSON: &str = include_str!("../tests/fixtures/detection.json");
