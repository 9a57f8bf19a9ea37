use std::cmp::Ordering;

pub struct StatsHelper;

impl StatsHelper {
    pub fn mean<'a>(samples: impl IntoIterator<Item = &'a f32>) -> f32 {
        let (sum, count) = samples
            .into_iter()
            .fold((0.0f64, 0usize), |(sum, count), &v| (sum + v as f64, count + 1));
        if count == 0 {
            0.0
        } else {
            (sum / count as f64) as f32
        }
    }

    /// Value at rank `k` of `values` sorted in descending order (0 = largest).
    ///
    /// Reorders `values`; returns `None` when `k` is out of range.
    pub fn kth_largest(values: &mut [f32], k: usize) -> Option<f32> {
        if k >= values.len() {
            return None;
        }
        let (_, value, _) = values.select_nth_unstable_by(k, descending);
        Some(*value)
    }
}

fn descending(a: &f32, b: &f32) -> Ordering {
    b.total_cmp(a)
}
