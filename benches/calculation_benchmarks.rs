//! Performance benchmarks for the overtime engine.
//!
//! Covers the pure calculation engine on its own, the service path that
//! loads history from the store, and the full HTTP round trip:
//! - Single shift, HIGHEST stacking
//! - Single shift, ADD_ON stacking with night and weekend premiums
//! - Preview with derived weekly context as history grows
//! - Fatigue scoring over a busy week
//! - HTTP calculate round trip
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use std::sync::Arc;

use axum::{body::Body, http::Request};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;
use tower::ServiceExt;

use overtime_engine::api::{AppState, create_router};
use overtime_engine::calculation::{CalculationContext, OvertimeCalculationEngine};
use overtime_engine::config::Settings;
use overtime_engine::models::Shift;
use overtime_engine::observability::noop;
use overtime_engine::policy::templates;
use overtime_engine::repository::InMemoryStore;
use overtime_engine::service::{CalculationRequest, Jurisdiction, OvertimeService};

fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn california() -> Jurisdiction {
    Jurisdiction {
        state_province: Some("CA".to_string()),
        ..Jurisdiction::country("US")
    }
}

/// Creates a seeded service holding `days` consecutive 10 hour shifts from 2026-03-01.
fn create_service_with_history(days: i64) -> OvertimeService {
    let service = OvertimeService::new(Arc::new(InMemoryStore::new()), noop());
    service
        .seed_default_policies("default", None)
        .expect("Failed to seed policies");
    let first = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    for day in 0..days {
        let start = (first + Duration::days(day)).and_hms_opt(8, 0, 0).unwrap();
        service
            .record_shift(Shift::completed(
                format!("shift_{:03}", day + 1),
                "emp_bench_001",
                start,
                start + Duration::hours(10),
            ))
            .unwrap();
    }
    service
}

/// Benchmark: Pure engine, California 10 hour shift.
fn bench_single_shift(c: &mut Criterion) {
    let policy = templates::us_california().unwrap();
    let shift = Shift::completed("shift_001", "emp_001", dt("2026-03-03 08:00:00"), dt("2026-03-03 18:00:00"));
    let context = CalculationContext::new(Decimal::from(25));
    let engine = OvertimeCalculationEngine::default();

    c.bench_function("single_shift_highest", |b| {
        b.iter(|| black_box(engine.calculate(&shift, &[], &policy, &context).unwrap()))
    });
}

/// Benchmark: Pure engine, NHS Saturday night shift under ADD_ON.
fn bench_add_on_stacking(c: &mut Criterion) {
    let policy = templates::uk_nhs().unwrap();
    let shift = Shift::completed("shift_001", "emp_001", dt("2026-03-06 20:00:00"), dt("2026-03-07 08:00:00"));
    let context = CalculationContext::new(Decimal::from(20));
    let engine = OvertimeCalculationEngine::default();

    c.bench_function("single_shift_add_on", |b| {
        b.iter(|| black_box(engine.calculate(&shift, &[], &policy, &context).unwrap()))
    });
}

/// Benchmark: Service preview as the week's history grows.
fn bench_preview_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("preview_with_history");

    for days in [1i64, 3, 5, 7].iter() {
        let service = create_service_with_history(*days);
        let request = CalculationRequest {
            shift_id: format!("shift_{:03}", days),
            jurisdiction: california(),
            base_rate: Some(Decimal::from(25)),
            weekly_hours_so_far: None,
            consecutive_days: None,
        };

        group.throughput(Throughput::Elements(*days as u64));
        group.bench_with_input(BenchmarkId::new("days", days), days, |b, _| {
            b.iter(|| black_box(service.preview_overtime(&request).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark: Fatigue score over a seven day run.
fn bench_fatigue(c: &mut Criterion) {
    let service = create_service_with_history(7);
    let as_of = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();

    c.bench_function("fatigue_seven_days", |b| {
        b.iter(|| black_box(service.check_fatigue("emp_bench_001", as_of).unwrap()))
    });
}

/// Benchmark: HTTP round trip for a preview.
fn bench_http_preview(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = create_service_with_history(5);
    let router = create_router(AppState::new(service, Settings::default()));
    let body = serde_json::json!({
        "shift_id": "shift_005",
        "country": "US",
        "state_province": "CA",
        "base_rate": "25"
    })
    .to_string();

    c.bench_function("http_preview", |b| {
        b.to_async(&rt).iter(|| async {
            let router = router.clone();
            let response = router
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/overtime/preview")
                        .header("Content-Type", "application/json")
                        .body(Body::from(body.clone()))
                        .unwrap(),
                )
                .await
                .unwrap();
            black_box(response)
        })
    });
}

criterion_group!(
    benches,
    bench_single_shift,
    bench_add_on_stacking,
    bench_preview_scaling,
    bench_fatigue,
    bench_http_preview,
);
criterion_main!(benches);
