use crate::settings::{BlurMode, MAX_BLUR_RADIUS};

/// Weights for offsets `0..=radius` of a symmetric Gaussian, packed four to a row for the blur
/// shader's push constant block. Normalized so `w[0] + 2 * sum(w[1..=radius]) == 1`.
pub fn gaussian_weights(radius: u32, sigma: f32) -> [[f32; 4]; 4] {
    let radius = radius.min(MAX_BLUR_RADIUS) as usize;
    let sigma = sigma.max(1e-3);

    let mut weights = [0.0f32; MAX_BLUR_RADIUS as usize + 1];
    for (i, w) in weights.iter_mut().enumerate().take(radius + 1) {
        let x = i as f32;
        *w = (-(x * x) / (2.0 * sigma * sigma)).exp();
    }

    let total = weights[0] + 2.0 * weights[1..=radius].iter().sum::<f32>();
    for w in weights.iter_mut() {
        *w /= total;
    }

    let mut packed = [[0.0; 4]; 4];
    for (i, w) in weights.iter().enumerate() {
        packed[i / 4][i % 4] = *w;
    }
    packed
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurStep {
    /// Bright target read from.
    pub source: usize,
    /// Bright target written to.
    pub target: usize,
    /// Texel step of a 1D pass; `None` for the combined 2D pass.
    pub direction: Option<[f32; 2]>,
}

/// The ordered blur passes over the two bright targets, starting from target 0, and the index
/// of the target holding the final result.
pub fn blur_schedule(mode: BlurMode, iterations: u32) -> (Vec<BlurStep>, usize) {
    let directions: &[Option<[f32; 2]>] = match mode {
        BlurMode::Separable => &[Some([1.0, 0.0]), Some([0.0, 1.0])],
        BlurMode::Single => &[None],
    };

    let mut steps = Vec::with_capacity(iterations as usize * directions.len());
    let mut current = 0;
    for _ in 0..iterations {
        for direction in directions {
            let target = 1 - current;
            steps.push(BlurStep {
                source: current,
                target,
                direction: *direction,
            });
            current = target;
        }
    }

    (steps, current)
}
