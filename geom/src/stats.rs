use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Statistic {
    Min,
    Mean,
    P50,
    P95,
    Max,
}

impl Statistic {
    pub fn all() -> Vec<Statistic> {
        vec![
            Statistic::Min,
            Statistic::Mean,
            Statistic::P50,
            Statistic::P95,
            Statistic::Max,
        ]
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Statistic::Min => write!(f, "minimum"),
            Statistic::Mean => write!(f, "mean"),
            Statistic::P50 => write!(f, "50%ile"),
            Statistic::P95 => write!(f, "95%ile"),
            Statistic::Max => write!(f, "maximum"),
        }
    }
}

/// Summary of a batch of non-negative measurements, like deviations in meters. Percentiles use
/// the nearest-rank method on the exact values, no bucketing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub count: usize,
    pub min: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub max: f64,
}

impl Stats {
    /// None if there are no values. NaNs are ignored.
    pub fn new<I: IntoIterator<Item = f64>>(values: I) -> Option<Stats> {
        let mut sorted: Vec<f64> = values.into_iter().filter(|x| !x.is_nan()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));
        let count = sorted.len();
        Some(Stats {
            count,
            min: sorted[0],
            mean: sorted.iter().sum::<f64>() / (count as f64),
            p50: nearest_rank(&sorted, 50.0),
            p95: nearest_rank(&sorted, 95.0),
            max: sorted[count - 1],
        })
    }

    pub fn select(&self, stat: Statistic) -> f64 {
        match stat {
            Statistic::Min => self.min,
            Statistic::Mean => self.mean,
            Statistic::P50 => self.p50,
            Statistic::P95 => self.p95,
            Statistic::Max => self.max,
        }
    }

    pub fn describe(&self) -> String {
        let mut parts = vec![format!("{} count", self.count)];
        for stat in Statistic::all() {
            parts.push(format!("{} {:.4}m", stat, self.select(stat)));
        }
        parts.join(", ")
    }
}

// `sorted` must be non-empty
fn nearest_rank(sorted: &[f64], percentile: f64) -> f64 {
    let rank = ((percentile / 100.0) * (sorted.len() as f64)).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles() {
        let stats = Stats::new((1..=100).map(|x| x as f64)).unwrap();
        assert_eq!(stats.count, 100);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 100.0);
        assert_eq!(stats.p50, 50.0);
        assert_eq!(stats.p95, 95.0);
        assert!((stats.mean - 50.5).abs() < 1e-12);

        let single = Stats::new(vec![0.25]).unwrap();
        assert_eq!(single.p95, 0.25);
        assert_eq!(single.select(Statistic::Min), 0.25);

        assert!(Stats::new(Vec::new()).is_none());
    }
}
