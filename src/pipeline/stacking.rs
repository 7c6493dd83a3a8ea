use crate::models::Series;

/// Y values to plot for each series, index-aligned with its points.
///
/// In stacked mode each value sits on top of the raw values of every earlier
/// series at the same index. Series may differ in length; a shorter series
/// only contributes to the slots it has.
pub fn apply_stacking(series: &[Series], stacked: bool) -> Vec<Vec<f64>> {
    if !stacked {
        return series.iter().map(|s| s.values().collect()).collect();
    }

    let max_len = series.iter().map(|s| s.points.len()).max().unwrap_or(0);
    let mut sums = vec![0.0f64; max_len];

    series
        .iter()
        .map(|s| {
            s.values()
                .enumerate()
                .map(|(j, raw)| {
                    let plotted = raw + sums[j];
                    sums[j] += raw;
                    plotted
                })
                .collect()
        })
        .collect()
}
