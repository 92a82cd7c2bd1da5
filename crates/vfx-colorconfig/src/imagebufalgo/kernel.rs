//! Scanline color kernel.
//!
//! Rows of the destination region are converted independently: up to four
//! channels of each scanline are gathered into an RGBA float buffer,
//! optionally unpremultiplied, run through the processor, premultiplied
//! again and stored. Rows are distributed over rayon.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, trace, warn};

use crate::imagebuf::{ImageBuf, ImageSpec, Pixel, PixelStorage, Roi};
use crate::processor::ColorProcessor;

/// Packed image geometry.
#[derive(Debug, Clone, Copy)]
struct Layout {
    width: usize,
    nchannels: usize,
}

impl Layout {
    fn of(spec: &ImageSpec) -> Self {
        Self {
            width: spec.width as usize,
            nchannels: spec.nchannels,
        }
    }

    #[inline]
    fn row_len(self) -> usize {
        self.width * self.nchannels
    }

    #[inline]
    fn index(self, x: i32, y: i32, c: usize) -> usize {
        (y as usize * self.width + x as usize) * self.nchannels + c
    }
}

/// Source pixels when converting into a different buffer.
#[derive(Clone, Copy)]
struct Source<'a> {
    storage: &'a PixelStorage,
    layout: Layout,
}

impl Source<'_> {
    #[inline]
    fn load(self, x: i32, y: i32, c: usize) -> f32 {
        self.storage.load(self.layout.index(x, y, c))
    }
}

/// One conversion request.
#[derive(Clone, Copy)]
struct Job<'a> {
    processor: &'a ColorProcessor,
    unpremult: bool,
    roi: Roi,
    /// Leading channels that go through the processor (at most 4).
    channels: usize,
}

/// Per-worker scanline buffers.
struct Scratch {
    rgba: Vec<f32>,
    alpha: Vec<f32>,
}

impl Scratch {
    fn new(width: usize) -> Self {
        Self {
            rgba: vec![0.0; width * 4],
            alpha: vec![0.0; width],
        }
    }
}

/// Alpha used for dividing and multiplying; tiny alphas leave color alone.
///
/// An alpha of exactly `f32::MIN_POSITIVE` still divides here, while
/// [`colorconvert_pixel`](super::colorconvert_pixel) needs alpha strictly
/// above it. Both thresholds are kept as they are.
#[inline]
fn alpha_guard(a: f32) -> f32 {
    if a >= f32::MIN_POSITIVE { a } else { 1.0 }
}

/// Unpremultiplies, transforms and premultiplies one RGBA scanline.
fn transform_scanline(
    rgba: &mut [f32],
    alpha: &mut [f32],
    processor: &ColorProcessor,
    unpremult: bool,
) {
    if unpremult {
        for (px, saved) in rgba.chunks_exact_mut(4).zip(alpha.iter_mut()) {
            *saved = px[3];
            let a = alpha_guard(px[3]);
            px[..3].iter_mut().for_each(|v| *v /= a);
        }
    }

    processor.apply(rgba, rgba.len() / 4, 1, 4);

    if unpremult {
        for (px, &saved) in rgba.chunks_exact_mut(4).zip(alpha.iter()) {
            let a = alpha_guard(saved);
            px[..3].iter_mut().for_each(|v| *v *= a);
        }
    }
}

/// Converts `roi` of `dst` with `processor`, reading from `src` or, when
/// `src` is `None`, from `dst` itself.
///
/// The region must already be validated against both images. `nthreads`
/// is 1 for serial execution, 0 for the global rayon pool, or the size
/// of a dedicated pool.
pub(crate) fn convert(
    dst: &mut ImageBuf,
    src: Option<&ImageBuf>,
    processor: &ColorProcessor,
    unpremult: bool,
    roi: Roi,
    nthreads: usize,
) {
    let channels = roi.nchannels().min(4);
    let job = Job {
        processor,
        unpremult: unpremult && channels == 4,
        roi,
        channels,
    };
    if roi.npixels() == 0 || channels == 0 {
        return;
    }

    let layout = Layout::of(dst.spec());
    let source = src.map(|s| Source {
        storage: s.storage(),
        layout: Layout::of(s.spec()),
    });

    let fast = roi.nchannels() == 4
        && layout.nchannels == 4
        && source.is_none_or(|s| s.layout.nchannels == 4 && s.storage.as_f32().is_some());
    if fast {
        if let Some(pixels) = dst.storage_mut().as_f32_mut() {
            trace!(?roi, "rgba float scanline path");
            let src_pixels = source.and_then(|s| s.storage.as_f32().map(|p| (p, s.layout)));
            for_each_row(pixels, layout, &job, nthreads, |row, y, scratch| {
                convert_row_rgba(row, y, src_pixels, &job, scratch)
            });
            return;
        }
    }

    trace!(?roi, channels, "generic scanline path");
    match dst.storage_mut() {
        PixelStorage::Empty => {}
        PixelStorage::U8(v) => run(v, layout, source, &job, nthreads),
        PixelStorage::U16(v) => run(v, layout, source, &job, nthreads),
        PixelStorage::U32(v) => run(v, layout, source, &job, nthreads),
        PixelStorage::F16(v) => run(v, layout, source, &job, nthreads),
        PixelStorage::F32(v) => run(v, layout, source, &job, nthreads),
    }
}

fn run<T: Pixel>(
    pixels: &mut [T],
    layout: Layout,
    source: Option<Source<'_>>,
    job: &Job<'_>,
    nthreads: usize,
) {
    for_each_row(pixels, layout, job, nthreads, |row, y, scratch| {
        convert_row(row, y, layout, source, job, scratch)
    });
}

/// Calls `f(row, y, scratch)` for every scanline of the job's region.
fn for_each_row<T, F>(pixels: &mut [T], layout: Layout, job: &Job<'_>, nthreads: usize, f: F)
where
    T: Send,
    F: Fn(&mut [T], i32, &mut Scratch) + Sync,
{
    let row_len = layout.row_len();
    let (y0, y1) = (job.roi.ybegin as usize, job.roi.yend as usize);
    let Some(rows) = pixels.get_mut(y0 * row_len..y1 * row_len) else {
        return;
    };
    let width = job.roi.width();
    let ybegin = job.roi.ybegin;

    if nthreads == 1 {
        let mut scratch = Scratch::new(width);
        for (i, row) in rows.chunks_mut(row_len).enumerate() {
            f(row, ybegin + i as i32, &mut scratch);
        }
        return;
    }

    if nthreads == 0 {
        par_rows(rows, row_len, width, ybegin, &f);
        return;
    }
    match sized_pool(nthreads) {
        Some(pool) => pool.install(|| par_rows(rows, row_len, width, ybegin, &f)),
        None => par_rows(rows, row_len, width, ybegin, &f),
    }
}

/// Shared pool with `nthreads` workers, built on first request.
///
/// Pools live for the rest of the process. `None` if the pool can't be
/// built; callers fall back to the global pool.
fn sized_pool(nthreads: usize) -> Option<Arc<ThreadPool>> {
    static POOLS: OnceLock<Mutex<HashMap<usize, Arc<ThreadPool>>>> = OnceLock::new();

    let mut pools = POOLS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(pool) = pools.get(&nthreads) {
        return Some(Arc::clone(pool));
    }
    match ThreadPoolBuilder::new()
        .num_threads(nthreads)
        .thread_name(move |i| format!("colorconvert-{nthreads}-{i}"))
        .build()
    {
        Ok(pool) => {
            debug!(nthreads, "built color kernel thread pool");
            let pool = Arc::new(pool);
            pools.insert(nthreads, Arc::clone(&pool));
            Some(pool)
        }
        Err(e) => {
            warn!(nthreads, error = %e, "could not build thread pool, using global pool");
            None
        }
    }
}

fn par_rows<T, F>(rows: &mut [T], row_len: usize, width: usize, ybegin: i32, f: &F)
where
    T: Send,
    F: Fn(&mut [T], i32, &mut Scratch) + Sync,
{
    rows.par_chunks_mut(row_len).enumerate().for_each_init(
        || Scratch::new(width),
        |scratch, (i, row)| f(row, ybegin + i as i32, scratch),
    );
}

/// Generic row conversion through `f32`.
fn convert_row<T: Pixel>(
    row: &mut [T],
    y: i32,
    layout: Layout,
    source: Option<Source<'_>>,
    job: &Job<'_>,
    scratch: &mut Scratch,
) {
    let Job { roi, channels, .. } = *job;
    let nch = layout.nchannels;
    let Scratch { rgba, alpha } = scratch;

    rgba.fill(0.0);
    for (px, x) in rgba.chunks_exact_mut(4).zip(roi.xbegin..roi.xend) {
        let base = x as usize * nch;
        for (c, v) in px.iter_mut().enumerate().take(channels) {
            *v = match source {
                Some(s) => s.load(x, y, c),
                None => row[base + c].to_f32(),
            };
        }
        if channels == 1 {
            px[1] = px[0];
            px[2] = px[0];
        }
    }

    transform_scanline(rgba, alpha, job.processor, job.unpremult);

    let chend = (roi.chend.max(0) as usize).min(nch);
    for (px, x) in rgba.chunks_exact(4).zip(roi.xbegin..roi.xend) {
        let base = x as usize * nch;
        for (c, &v) in px.iter().enumerate().take(channels) {
            row[base + c] = T::from_f32(v);
        }
        // Channels past the fourth are carried over from the source.
        if let Some(s) = source {
            for c in channels..chend {
                row[base + c] = T::from_f32(s.load(x, y, c));
            }
        }
    }
}

/// Float RGBA row conversion using contiguous copies.
fn convert_row_rgba(
    row: &mut [f32],
    y: i32,
    source: Option<(&[f32], Layout)>,
    job: &Job<'_>,
    scratch: &mut Scratch,
) {
    let roi = job.roi;
    let (x0, x1) = (roi.xbegin as usize * 4, roi.xend as usize * 4);
    let Scratch { rgba, alpha } = scratch;

    match source {
        Some((pixels, layout)) => {
            let start = layout.index(roi.xbegin, y, 0);
            rgba.copy_from_slice(&pixels[start..start + (x1 - x0)]);
        }
        None => rgba.copy_from_slice(&row[x0..x1]),
    }
    transform_scanline(rgba, alpha, job.processor, job.unpremult);
    row[x0..x1].copy_from_slice(rgba);
}
