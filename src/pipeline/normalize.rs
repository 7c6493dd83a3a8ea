use tracing::debug;

use crate::models::{LabelSet, Series, NAME_LABEL};

/// Drops every series holding a NaN or infinite sample. Survivors keep the
/// backend's order, which later drives colors and draw order.
pub fn normalize(raw: Vec<Series>) -> Vec<Series> {
    let total = raw.len();
    let series: Vec<Series> = raw.into_iter().filter(Series::is_finite).collect();
    if series.len() != total {
        debug!(
            dropped = total - series.len(),
            kept = series.len(),
            "Dropped series with non-finite samples"
        );
    }
    series
}

/// Prometheus-style name for a label set, e.g. `cpu{host="a",job="x"}`.
///
/// Dimension labels are sorted by key, so the result never depends on map
/// iteration order.
pub fn canonical_name(labels: &LabelSet) -> String {
    if labels.is_empty() {
        return "{}".to_string();
    }

    let prefix = labels.metric_name().unwrap_or("");

    let mut inner: Vec<(&str, &str)> = labels
        .iter()
        .filter(|(key, _)| *key != NAME_LABEL)
        .collect();
    if inner.is_empty() {
        return prefix.to_string();
    }
    inner.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let rendered: Vec<String> = inner
        .into_iter()
        .map(|(key, value)| format!("{}=\"{}\"", key, value))
        .collect();

    format!("{}{{{}}}", prefix, rendered.join(","))
}

impl Series {
    /// Default legend text for this series.
    pub fn display_name(&self) -> String {
        canonical_name(&self.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Datapoint;
    use chrono::DateTime;
    use pretty_assertions::assert_eq;

    fn series(labels: &[(&str, &str)], values: &[f64]) -> Series {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                Datapoint::new(DateTime::from_timestamp(60 * i as i64, 0).unwrap(), *v)
            })
            .collect();
        Series::new(labels.iter().copied().collect(), points)
    }

    #[test]
    fn test_empty_labels_render_braces() {
        assert_eq!(canonical_name(&LabelSet::new()), "{}");
    }

    #[test]
    fn test_name_with_sorted_labels() {
        let labels: LabelSet = [("job", "x"), ("__name__", "cpu"), ("host", "a")]
            .into_iter()
            .collect();
        assert_eq!(canonical_name(&labels), r#"cpu{host="a",job="x"}"#);
    }

    #[test]
    fn test_name_only() {
        let labels: LabelSet = [("__name__", "up")].into_iter().collect();
        assert_eq!(canonical_name(&labels), "up");
    }

    #[test]
    fn test_labels_without_name() {
        let labels: LabelSet = [("instance", "b:9100"), ("job", "node")].into_iter().collect();
        assert_eq!(canonical_name(&labels), r#"{instance="b:9100",job="node"}"#);
    }

    #[test]
    fn test_name_is_independent_of_insertion_order() {
        let pairs = [
            ("__name__", "http_requests_total"),
            ("code", "200"),
            ("a0", "1"),
            ("a", "2"),
            ("method", "GET"),
            ("zone", "eu"),
        ];
        let expected = canonical_name(&pairs.iter().copied().collect());

        // Every rotation and its reverse, each inserted into a fresh map.
        for shift in 0..pairs.len() {
            let mut rotated = pairs.to_vec();
            rotated.rotate_left(shift);
            assert_eq!(canonical_name(&rotated.iter().copied().collect()), expected);
            rotated.reverse();
            assert_eq!(canonical_name(&rotated.iter().copied().collect()), expected);
        }
        assert_eq!(
            expected,
            r#"http_requests_total{a="2",a0="1",code="200",method="GET",zone="eu"}"#
        );
    }

    #[test]
    fn test_normalize_drops_non_finite_series_and_keeps_order() {
        let raw = vec![
            series(&[("job", "a")], &[1.0, 2.0]),
            series(&[("job", "b")], &[1.0, f64::NAN]),
            series(&[("job", "c")], &[3.0]),
            series(&[("job", "d")], &[f64::INFINITY, 1.0]),
            series(&[("job", "e")], &[f64::NEG_INFINITY]),
            series(&[("job", "f")], &[]),
        ];
        let kept = raw[0].clone();
        let kept_c = raw[2].clone();

        let out = normalize(raw);
        let names: Vec<String> = out.iter().map(Series::display_name).collect();
        assert_eq!(names, vec![r#"{job="a"}"#, r#"{job="c"}"#, r#"{job="f"}"#]);
        assert_eq!(out[0], kept);
        assert_eq!(out[1], kept_c);
    }
}
