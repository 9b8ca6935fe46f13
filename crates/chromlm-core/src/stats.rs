use serde::Serialize;

use crate::analysis::AnalysisRecord;

const BUCKET_BOUNDS: [(u8, u8); 5] = [(0, 20), (21, 40), (41, 60), (61, 80), (81, 100)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CertaintyBucket {
    pub min: u8,
    pub max: u8,
    pub count: usize,
}

impl CertaintyBucket {
    pub fn label(&self) -> String {
        format!("{}-{}%", self.min, self.max)
    }

    fn contains(&self, value: u8) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Aggregate view over the history, as shown on the statistics tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total_analyzed: usize,
    pub mlm_detected: usize,
    /// Rounded share of `Yes` verdicts, 0 for an empty history.
    pub mlm_percentage: u8,
    pub certainty_buckets: Vec<CertaintyBucket>,
}

impl HistoryStats {
    pub fn from_records(records: &[AnalysisRecord]) -> Self {
        let mut buckets: Vec<CertaintyBucket> = BUCKET_BOUNDS
            .iter()
            .map(|&(min, max)| CertaintyBucket { min, max, count: 0 })
            .collect();

        for certainty in records.iter().filter_map(|r| r.result.certainty) {
            if let Some(bucket) = buckets.iter_mut().find(|b| b.contains(certainty.get())) {
                bucket.count += 1;
            }
        }

        let total_analyzed = records.len();
        let mlm_detected = records.iter().filter(|r| r.result.is_mlm()).count();
        let mlm_percentage = if total_analyzed == 0 {
            0
        } else {
            ((mlm_detected as f64 / total_analyzed as f64) * 100.0).round() as u8
        };

        Self {
            total_analyzed,
            mlm_detected,
            mlm_percentage,
            certainty_buckets: buckets,
        }
    }

    /// True when no record carried a usable certainty.
    pub fn has_certainty_data(&self) -> bool {
        self.certainty_buckets.iter().any(|b| b.count > 0)
    }
}
