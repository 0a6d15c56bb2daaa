//! Helper functions

/// Median of a list of floats, with NaN values ordered last.
///
/// # Panics
/// Panics if `values` is empty.
pub(crate) fn median_of_floats(mut values: Vec<f64>) -> f64 {
    assert!(!values.is_empty(), "median of an empty list");

    values.sort_unstable_by(f64::total_cmp);

    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::median_of_floats;

    #[test]
    fn median_of_odd_and_even_lists() {
        assert_eq!(median_of_floats(vec![3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median_of_floats(vec![4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median_of_floats(vec![7.5]), 7.5);
    }
}
