use ndarray::Array1;

/// Builds a vector of `count` zeros with a single 1.0 at `index`.
///
/// An out-of-range index yields the all-zero vector.
pub fn one_hot(index: usize, count: usize) -> Array1<f32> {
    let mut vec = Array1::zeros(count);
    if index < count {
        vec[index] = 1.0;
    }
    vec
}

/// Index of the largest entry. Ties resolve to the first maximum and NaN
/// entries never win. Returns `None` for an empty vector.
pub fn argmax(vec: &Array1<f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &value) in vec.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((i, value)),
        }
    }
    best.map(|(i, _)| i)
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
