// =============================================================================
// Rolling-window statistics
// =============================================================================
//
// Simple moving average, sample standard deviation, and Pearson correlation
// over a trailing window.  A window is only evaluated when every value in it
// is present; otherwise that row is missing.

/// Apply `f` to every complete trailing window of `values`.
fn rolling_apply(
    values: &[Option<f64>],
    window: usize,
    f: impl Fn(&[f64]) -> Option<f64>,
) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }

    let mut buf = Vec::with_capacity(window);
    for end in window..=values.len() {
        buf.clear();
        buf.extend(values[end - window..end].iter().map_while(|v| *v));
        if buf.len() == window {
            out[end - 1] = f(&buf);
        }
    }
    out
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample (n - 1) standard deviation.  `None` for fewer than two values.
fn sample_std(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs);
    let variance = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Simple moving average over the trailing `window` rows.
pub fn calculate_sma(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_apply(values, window, |xs| Some(mean(xs)))
}

/// Sample standard deviation over the trailing `window` rows.
pub fn calculate_rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_apply(values, window, sample_std)
}

/// Pearson correlation of `xs` and `ys` over the trailing `window` rows.
///
/// Missing when either window has zero variance (correlation undefined).
pub fn calculate_rolling_corr(
    xs: &[Option<f64>],
    ys: &[Option<f64>],
    window: usize,
) -> Vec<Option<f64>> {
    let len = xs.len().min(ys.len());
    let mut out = vec![None; len];
    if window < 2 {
        return out;
    }

    let mut a = Vec::with_capacity(window);
    let mut b = Vec::with_capacity(window);
    for end in window..=len {
        a.clear();
        b.clear();
        for (x, y) in xs[end - window..end].iter().zip(&ys[end - window..end]) {
            if let (Some(x), Some(y)) = (x, y) {
                a.push(*x);
                b.push(*y);
            }
        }
        if a.len() == window {
            out[end - 1] = pearson(&a, &b);
        }
    }
    out
}

fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    let (ma, mb) = (mean(a), mean(b));
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let (dx, dy) = (x - ma, y - mb);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    let r = cov / (var_a.sqrt() * var_b.sqrt());
    r.is_finite().then_some(r)
}
