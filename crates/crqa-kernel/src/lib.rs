//! The CRQA compute kernel: a pure function from two signals and a
//! recurrence threshold to an eight-metric bundle. No I/O, no shared state.

use crqa_protocol::{MetricBundle, Signal, SIGNAL_LEN};

const EMBED_DIM: usize = 3;
const EMBED_DELAY: usize = 5;
const MIN_LINE_LEN: usize = 2;
const DEGENERATE_STD: f64 = 1e-12;

/// Runs the full CRQA pipeline: normalize, embed, build the cross-recurrence
/// matrix, analyze diagonal and vertical lines, derive the eight metrics.
pub fn compute(r: f64, sig1: &Signal, sig2: &Signal) -> MetricBundle {
    let e1 = embed(&normalize(sig1));
    let e2 = embed(&normalize(sig2));

    let l = e1.len();
    if l == 0 {
        return MetricBundle::ZERO;
    }
    debug_assert_eq!(e1.len(), e2.len());

    let rm = recurrence_matrix(&e1, &e2, r);
    let rec = rm.iter().flatten().filter(|&&hit| hit).count();

    let recurrence_rate = rec as f64 / (l * l) as f64;

    let diag = analyze_diagonals(&rm, l);
    let vert = analyze_verticals(&rm, l);

    let determinism = if rec > 0 {
        diag.points as f64 / rec as f64
    } else {
        0.0
    };
    let laminarity = if rec > 0 {
        vert.points as f64 / rec as f64
    } else {
        0.0
    };
    let divergence = if diag.max > 0 { 1.0 / diag.max as f64 } else { 0.0 };

    MetricBundle {
        epsilon: determinism,
        recurrence_rate,
        determinism,
        laminarity,
        trapping_time: vert.avg,
        max_diag_line: diag.max as f64,
        divergence,
        entropy: diag.entropy,
    }
}

/// Zero-mean, unit-variance normalization. A near-constant signal (`std <
/// 1e-12`) is passed through unscaled rather than divided by a
/// near-zero denominator.
fn normalize(signal: &Signal) -> Signal {
    let mean = signal.iter().sum::<f64>() / signal.len() as f64;
    let variance = signal.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / signal.len() as f64;
    let std = variance.sqrt();
    let std = if std < DEGENERATE_STD { 1.0 } else { std };

    let mut out = [0.0; SIGNAL_LEN];
    for (o, x) in out.iter_mut().zip(signal.iter()) {
        *o = (x - mean) / std;
    }
    out
}

/// Time-delay embedding with dimension `m = 3` and delay `τ = 5`.
fn embed(signal: &Signal) -> Vec<[f64; EMBED_DIM]> {
    let span = (EMBED_DIM - 1) * EMBED_DELAY;
    if signal.len() <= span {
        return Vec::new();
    }
    let l = signal.len() - span;
    (0..l)
        .map(|i| {
            let mut v = [0.0; EMBED_DIM];
            for (k, slot) in v.iter_mut().enumerate() {
                *slot = signal[i + k * EMBED_DELAY];
            }
            v
        })
        .collect()
}

fn recurrence_matrix(e1: &[[f64; EMBED_DIM]], e2: &[[f64; EMBED_DIM]], r: f64) -> Vec<Vec<bool>> {
    let l = e1.len();
    let mut rm = vec![vec![false; l]; l];
    for (i, a) in e1.iter().enumerate() {
        for (j, b) in e2.iter().enumerate() {
            let dist = euclidean(a, b);
            rm[i][j] = dist <= r;
        }
    }
    rm
}

fn euclidean(a: &[f64; EMBED_DIM], b: &[f64; EMBED_DIM]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

struct DiagonalStats {
    points: usize,
    max: usize,
    entropy: f64,
}

/// Scans all `2L-1` diagonals for maximal runs of consecutive recurrences.
fn analyze_diagonals(rm: &[Vec<bool>], l: usize) -> DiagonalStats {
    let mut points = 0usize;
    let mut max = 0usize;
    let mut lengths = Vec::new();

    for offset in -(l as isize - 1)..l as isize {
        let mut run = 0usize;
        let start_i = if offset < 0 { (-offset) as usize } else { 0 };
        let start_j = if offset > 0 { offset as usize } else { 0 };
        let len = l - start_i.max(start_j);
        for k in 0..len {
            let i = start_i + k;
            let j = start_j + k;
            if rm[i][j] {
                run += 1;
            } else {
                record_run(run, &mut points, &mut max, &mut lengths);
                run = 0;
            }
        }
        record_run(run, &mut points, &mut max, &mut lengths);
    }

    let entropy = line_entropy(&lengths);
    DiagonalStats {
        points,
        max,
        entropy,
    }
}

struct VerticalStats {
    points: usize,
    avg: f64,
}

fn analyze_verticals(rm: &[Vec<bool>], l: usize) -> VerticalStats {
    let mut points = 0usize;
    let mut max = 0usize;
    let mut lines = 0usize;
    let mut total = 0usize;

    for j in 0..l {
        let mut run = 0usize;
        for row in rm.iter().take(l) {
            if row[j] {
                run += 1;
            } else {
                record_line(run, &mut points, &mut max, &mut lines, &mut total);
                run = 0;
            }
        }
        record_line(run, &mut points, &mut max, &mut lines, &mut total);
    }

    let avg = if lines > 0 {
        total as f64 / lines as f64
    } else {
        0.0
    };
    VerticalStats { points, avg }
}

fn record_run(run: usize, points: &mut usize, max: &mut usize, lengths: &mut Vec<usize>) {
    if run >= MIN_LINE_LEN {
        *points += run;
        *max = (*max).max(run);
        lengths.push(run);
    }
}

fn record_line(
    run: usize,
    points: &mut usize,
    max: &mut usize,
    lines: &mut usize,
    total: &mut usize,
) {
    if run >= MIN_LINE_LEN {
        *points += run;
        *max = (*max).max(run);
        *lines += 1;
        *total += run;
    }
}

fn line_entropy(lengths: &[usize]) -> f64 {
    if lengths.is_empty() {
        return 0.0;
    }
    let total: usize = lengths.iter().sum();
    lengths
        .iter()
        .map(|&len| {
            let p = len as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}
