//! Pool Adjacent Violators.
//!
//! L2-optimal monotone fit over mid probabilities. The native sweep fits
//! non-increasing sequences; non-decreasing targets are negated in and
//! out. Output is clipped to `[0, 1]`.

/// Required trend of `P(YES)` as the line increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Nonincreasing,
    Nondecreasing,
}

/// Fit `values` to the monotone `direction` with unit weights.
pub fn fit(values: &[f64], direction: Direction) -> Vec<f64> {
    let mut fitted = match direction {
        Direction::Nonincreasing => pav_nonincreasing(values),
        Direction::Nondecreasing => {
            let negated: Vec<f64> = values.iter().map(|v| -v).collect();
            let mut fitted = pav_nonincreasing(&negated);
            for v in &mut fitted {
                *v = -*v;
            }
            fitted
        }
    };
    clip_unit(&mut fitted);
    fitted
}

/// Non-increasing PAV with unit weights. No range clipping here: the
/// non-decreasing direction runs this on negated inputs.
fn pav_nonincreasing(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    // Pooled blocks: (mean, weight).
    let mut blocks: Vec<(f64, f64)> = Vec::with_capacity(values.len());
    for &v in values {
        blocks.push((v, 1.0));
        // Pool while the tail violates non-increase, re-checking leftward.
        while blocks.len() >= 2 {
            let (right, wr) = blocks[blocks.len() - 1];
            let (left, wl) = blocks[blocks.len() - 2];
            if left >= right {
                break;
            }
            let pooled = (left * wl + right * wr) / (wl + wr);
            blocks.truncate(blocks.len() - 2);
            blocks.push((pooled, wl + wr));
        }
    }

    let mut fitted = Vec::with_capacity(values.len());
    for (mean, weight) in blocks {
        for _ in 0..weight.round() as usize {
            fitted.push(mean);
        }
    }

    // Forward clamp: numerical guard for equal-after-pooling runs.
    for i in 1..fitted.len() {
        if fitted[i] > fitted[i - 1] {
            fitted[i] = fitted[i - 1];
        }
    }

    fitted
}

fn clip_unit(values: &mut [f64]) {
    for v in values {
        *v = v.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_monotone(values: &[f64], direction: Direction) -> bool {
        values.windows(2).all(|w| match direction {
            Direction::Nonincreasing => w[0] >= w[1] - 1e-12,
            Direction::Nondecreasing => w[0] <= w[1] + 1e-12,
        })
    }

    #[test]
    fn test_pooling_law() {
        let fitted = fit(&[0.8, 0.4, 0.6, 0.3, 0.1], Direction::Nonincreasing);
        assert!((fitted[1] - 0.5).abs() < 1e-12);
        assert!((fitted[2] - 0.5).abs() < 1e-12);
        assert!((fitted[0] - 0.8).abs() < 1e-12);
        assert!(is_monotone(&fitted, Direction::Nonincreasing));
    }

    #[test]
    fn test_already_monotone_is_identity() {
        let input = [0.9, 0.7, 0.7, 0.4, 0.1];
        let fitted = fit(&input, Direction::Nonincreasing);
        assert_eq!(fitted, input.to_vec());

        let input = [0.1, 0.4, 0.7, 0.9];
        let fitted = fit(&input, Direction::Nondecreasing);
        assert_eq!(fitted, input.to_vec());
    }

    #[test]
    fn test_idempotent() {
        let input = [0.2, 0.9, 0.1, 0.8, 0.5, 0.6];
        for direction in [Direction::Nonincreasing, Direction::Nondecreasing] {
            let once = fit(&input, direction);
            let twice = fit(&once, direction);
            assert_eq!(once, twice);
            assert!(is_monotone(&once, direction));
        }
    }

    #[test]
    fn test_nondecreasing_via_negation() {
        let fitted = fit(&[0.1, 0.3, 0.6, 0.4, 0.9], Direction::Nondecreasing);
        assert!(is_monotone(&fitted, Direction::Nondecreasing));
        // 0.6 and 0.4 pool to 0.5.
        assert!((fitted[2] - 0.5).abs() < 1e-12);
        assert!((fitted[3] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_output_in_unit_interval() {
        let fitted = fit(&[1.2, -0.1, 0.5], Direction::Nonincreasing);
        assert!(fitted.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(is_monotone(&fitted, Direction::Nonincreasing));
    }

    #[test]
    fn test_empty_and_single() {
        assert!(fit(&[], Direction::Nonincreasing).is_empty());
        assert_eq!(fit(&[0.4], Direction::Nondecreasing), vec![0.4]);
    }
}
