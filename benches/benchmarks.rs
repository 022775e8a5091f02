//! Performance benchmarks for Stepwright.
//!
//! This module contains benchmarks for:
//! - Prompt interpolation with many variables
//! - Sentence splitting and instruction numbering
//! - A full eight-step run against the in-memory file system
//!
//! Run with: `cargo bench`

use std::path::Path;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stepwright::core::{MemoryFileSystem, WorkflowConfig};
use stepwright::workflow::{
    interpolate, numbered_instructions, InterpolationContext, RunRequest, Workflow, STEP_COUNT,
};

// ============================================================================
// Mock Data Fixtures
// ============================================================================

mod fixtures {
    use super::*;

    /// A template referencing `count` distinct variables, half of them bound.
    pub fn generate_template(count: usize) -> (String, InterpolationContext) {
        let mut template = String::new();
        let mut context = InterpolationContext::new();
        for i in 0..count {
            template.push_str(&format!("Step {i} uses ${{var_{i}}} and keeps going. "));
            if i % 2 == 0 {
                context.insert(format!("var_{i}"), format!("value-{i}"));
            }
        }
        (template, context)
    }

    /// Prose with `count` sentences, some containing paths and versions.
    pub fn generate_prose(count: usize) -> String {
        (0..count)
            .map(|i| match i % 3 {
                0 => format!("Update docs/module_{i}.md with the new API."),
                1 => format!("Bump the version to v1.{i} and rerun the suite!"),
                _ => format!("Does case {i} still   pass?"),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// Interpolation Benchmarks
// ============================================================================

fn bench_interpolation(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolation");

    for count in [1, 10, 100, 1000].iter() {
        let (template, context) = fixtures::generate_template(*count);
        group.throughput(Throughput::Bytes(template.len() as u64));
        group.bench_with_input(BenchmarkId::new("interpolate", count), &template, |b, template| {
            b.iter(|| black_box(interpolate(black_box(template), &context)));
        });
    }

    group.finish();
}

// ============================================================================
// Content Benchmarks
// ============================================================================

fn bench_numbered_instructions(c: &mut Criterion) {
    let mut group = c.benchmark_group("content");

    for count in [5, 50, 500].iter() {
        let prose = fixtures::generate_prose(*count);
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("numbered", count), &prose, |b, prose| {
            b.iter(|| black_box(numbered_instructions(black_box(prose))));
        });
    }

    group.finish();
}

// ============================================================================
// Workflow Benchmarks
// ============================================================================

fn bench_full_run(c: &mut Criterion) {
    let document = Path::new("docs/bench.md");

    c.bench_function("workflow_full_run", |b| {
        b.iter(|| {
            let fs = Arc::new(MemoryFileSystem::new().with_file(document, "# Bench\n"));
            let workflow = Workflow::new(fs, &WorkflowConfig::default()).unwrap();
            for _ in 0..=STEP_COUNT {
                black_box(workflow.run(&RunRequest::new(document)).unwrap());
            }
        });
    });
}

criterion_group!(workflow_benches, bench_interpolation, bench_numbered_instructions, bench_full_run,);

criterion_main!(workflow_benches);
