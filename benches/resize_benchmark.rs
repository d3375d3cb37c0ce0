use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use batch_resizer::{FilterType, ImageResizer};
use image::{DynamicImage, ImageBuffer, Rgb};

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

fn benchmark_resize(c: &mut Criterion) {
    let source = gradient(1920, 1080);
    let mut group = c.benchmark_group("resize_1920x1080_to_640");

    for filter in [FilterType::Nearest, FilterType::Triangle, FilterType::Lanczos3] {
        let resizer = ImageResizer::new(filter);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{:?}", filter)), &source, |b, image| {
            b.iter(|| resizer.resize(black_box(image), 640, 0))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_resize);
criterion_main!(benches);
