use std::collections::BTreeMap;

use serde::Serialize;

use crate::bins::CommentBin;
use crate::classify::{classify_title, IssueCategory};
use crate::stats::{pearson, Summary};
use crate::table::AnalysisRow;

const HISTOGRAM_BIN_DAYS: i64 = 20;
const HISTOGRAM_LIMIT_DAYS: i64 = 600;
const CORRELATION_MAX_DAYS: i64 = 365;
const COMMENT_LIMIT: i64 = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: i64,
    pub end: i64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category: IssueCategory,
    pub closure_days: Option<Summary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentBinStats {
    pub bin: CommentBin,
    pub closure_days: Option<Summary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub group: String,
    pub rows: usize,
    pub negative_durations: usize,
    pub closure_days: Option<Summary>,
    /// Closure days in 20-day bins over `[0, 600]`; the last bin also holds day 600.
    pub histogram: Vec<HistogramBin>,
    /// Durations beyond 600 days.
    pub histogram_overflow: usize,
    pub categories: Vec<CategoryStats>,
    pub comment_bins: Vec<CommentBinStats>,
    /// Comment counts below 50.
    pub comments: Option<Summary>,
    /// Pearson correlation of comments and closure days, over issues closed within a year with
    /// fewer than 50 comments.
    pub comment_days_correlation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub groups: Vec<GroupReport>,
    pub combined: GroupReport,
}

impl AnalysisReport {
    pub fn build(groups: &[(String, Vec<AnalysisRow>)]) -> Self {
        let all: Vec<AnalysisRow> = groups
            .iter()
            .flat_map(|(_, rows)| rows.iter().cloned())
            .collect();
        Self {
            groups: groups
                .iter()
                .map(|(name, rows)| analyze_group(name, rows))
                .collect(),
            combined: analyze_group("all", &all),
        }
    }
}

pub fn analyze_group(name: &str, rows: &[AnalysisRow]) -> GroupReport {
    let days: Vec<i64> = rows.iter().filter_map(|r| r.closure_days).collect();

    let mut histogram: Vec<HistogramBin> = (0..HISTOGRAM_LIMIT_DAYS / HISTOGRAM_BIN_DAYS)
        .map(|i| HistogramBin {
            start: i * HISTOGRAM_BIN_DAYS,
            end: (i + 1) * HISTOGRAM_BIN_DAYS,
            count: 0,
        })
        .collect();
    let mut histogram_overflow = 0;
    for &d in &days {
        let index = if d == HISTOGRAM_LIMIT_DAYS {
            Ok(histogram.len() - 1)
        } else {
            usize::try_from(d / HISTOGRAM_BIN_DAYS)
        };
        match index {
            Ok(index) if index < histogram.len() => histogram[index].count += 1,
            _ => histogram_overflow += 1,
        }
    }

    let mut by_category: BTreeMap<IssueCategory, Vec<i64>> = BTreeMap::new();
    for row in rows {
        if let Some(d) = row.closure_days {
            by_category
                .entry(classify_title(row.title.as_deref()))
                .or_default()
                .push(d);
        }
    }

    let mut by_bin: BTreeMap<CommentBin, Vec<i64>> = BTreeMap::new();
    let mut pairs = Vec::new();
    let mut comments = Vec::new();
    for row in rows {
        if let Some(count) = row.comment_count.filter(|c| *c < COMMENT_LIMIT) {
            comments.push(count);
        }
        let (Some(d), Some(count)) = (row.closure_days, row.comment_count) else {
            continue;
        };
        if let Some(bin) = CommentBin::of(count) {
            by_bin.entry(bin).or_default().push(d);
        }
        if d < CORRELATION_MAX_DAYS && count < COMMENT_LIMIT {
            pairs.push((count, d));
        }
    }

    GroupReport {
        group: name.to_string(),
        rows: rows.len(),
        negative_durations: rows.iter().filter(|r| r.negative_duration).count(),
        closure_days: Summary::of(&days),
        histogram,
        histogram_overflow,
        categories: IssueCategory::ALL
            .into_iter()
            .map(|category| CategoryStats {
                category,
                closure_days: by_category.get(&category).and_then(|d| Summary::of(d)),
            })
            .collect(),
        comment_bins: CommentBin::ALL
            .into_iter()
            .map(|bin| CommentBinStats {
                bin,
                closure_days: by_bin.get(&bin).and_then(|d| Summary::of(d)),
            })
            .collect(),
        comments: Summary::of(&comments),
        comment_days_correlation: pearson(&pairs),
    }
}
