//! Metadata Validation and Source Building Benchmarks
//!
//! Measures validation of class collections with inheritance chains and
//! paired relationships, and the building and merging of relationship-path sources

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use elif_bo::{
    validate, ClassDef, ClassDefCol, ClassRef, PrimaryKeyDef, PropDef, PropertyType, RelKeyDef,
    RelationshipDef, SourceBuilder,
};

const ASSEMBLY: &str = "Bench";

/// `count` parent/child pairs; each child extends a shared base class
fn class_collection(count: usize) -> ClassDefCol {
    let mut col = ClassDefCol::new();
    col.add(
        ClassDef::new(ASSEMBLY, "Base")
            .with_prop(PropDef::new("Id", PropertyType::Guid))
            .with_prop(PropDef::new("Name", PropertyType::String))
            .with_primary_key(PrimaryKeyDef::object_id("Id")),
    )
    .unwrap();

    for i in 0..count {
        let parent = format!("Parent{}", i);
        let child = format!("Child{}", i);
        col.add(
            ClassDef::new(ASSEMBLY, parent.as_str())
                .with_prop(PropDef::new("ParentId", PropertyType::Guid))
                .with_primary_key(PrimaryKeyDef::object_id("ParentId"))
                .with_relationship(
                    RelationshipDef::multiple(
                        "Children",
                        ClassRef::new(ASSEMBLY, child.as_str()),
                        RelKeyDef::single("ParentId", "ParentId"),
                    )
                    .with_reverse("Parent"),
                ),
        )
        .unwrap();
        col.add(
            ClassDef::new(ASSEMBLY, child.as_str())
                .with_prop(PropDef::new("ParentId", PropertyType::Guid))
                .with_superclass(ClassRef::new(ASSEMBLY, "Base"))
                .with_relationship(
                    RelationshipDef::single(
                        "Parent",
                        ClassRef::new(ASSEMBLY, parent.as_str()),
                        RelKeyDef::single("ParentId", "ParentId"),
                    )
                    .with_reverse("Children"),
                ),
        )
        .unwrap();
    }
    col
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("metadata_validation");

    for &count in &[10, 50, 200] {
        group.bench_with_input(BenchmarkId::new("validate", count), &count, |b, &count| {
            b.iter_with_setup(
                || class_collection(count),
                |col| black_box(validate(col).unwrap()),
            )
        });
    }

    group.finish();
}

fn bench_source_building(c: &mut Criterion) {
    let defs = validate(class_collection(50)).unwrap();
    let child = defs.find_by_name("Child0").unwrap();
    let builder = SourceBuilder::new(&defs);

    c.bench_function("relationship_path_source", |b| {
        b.iter(|| black_box(builder.for_relationship_path(child, "Parent.Children").unwrap()))
    });

    c.bench_function("merge_sources", |b| {
        let other = builder.for_relationship_path(child, "Parent").unwrap();
        b.iter(|| {
            let mut source = builder.for_relationship_path(child, "Parent.Children").unwrap();
            source.merge(black_box(&other)).unwrap();
            black_box(source)
        })
    });
}

criterion_group!(benches, bench_validation, bench_source_building);
criterion_main!(benches);
