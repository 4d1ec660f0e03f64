use serde::Serialize;

/// Pearson correlation of paired samples. `None` with fewer than two pairs or when either
/// side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Symmetric matrix of pairwise correlations between named series.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Each pair uses only positions where both series have a value.
    pub fn from_series(series: &[(&str, Vec<Option<f64>>)]) -> Self {
        let labels = series.iter().map(|(name, _)| (*name).to_owned()).collect();
        let values = series
            .iter()
            .map(|(_, a)| {
                series
                    .iter()
                    .map(|(_, b)| {
                        let (xs, ys): (Vec<f64>, Vec<f64>) = a
                            .iter()
                            .zip(b)
                            .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                            .unzip();
                        pearson(&xs, &ys)
                    })
                    .collect()
            })
            .collect();
        Self { labels, values }
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        self.values[i][j]
    }
}
