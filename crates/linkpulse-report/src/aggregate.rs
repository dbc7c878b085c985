//! Period grouping and throughput averaging.

use std::collections::BTreeMap;

use linkpulse_store::MeasurementRecord;

/// Average throughput over one reporting period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodAverage {
    /// Period label: `"2026-W35"` for ISO weeks, `"2026-08"` for months.
    pub period: String,
    pub avg_download_mbps: f64,
    pub avg_upload_mbps: f64,
}

/// Average download/upload per ISO week, ascending by period.
///
/// Failed records never contribute; a slice of only failures yields an
/// empty result.
pub fn weekly_averages(records: &[MeasurementRecord]) -> Vec<PeriodAverage> {
    averages_by(records, |record| {
        let (year, week, _) = record.timestamp.date().to_iso_week_date();
        ((year, u32::from(week)), format!("{year:04}-W{week:02}"))
    })
}

/// Average download/upload per calendar month, ascending by period.
pub fn monthly_averages(records: &[MeasurementRecord]) -> Vec<PeriodAverage> {
    averages_by(records, |record| {
        let date = record.timestamp.date();
        let month = u8::from(date.month());
        ((date.year(), u32::from(month)), format!("{:04}-{month:02}", date.year()))
    })
}

/// Accumulated sums for one period.
struct Bucket {
    label: String,
    download_sum: f64,
    upload_sum: f64,
    count: u32,
}

fn averages_by(
    records: &[MeasurementRecord],
    key: impl Fn(&MeasurementRecord) -> ((i32, u32), String),
) -> Vec<PeriodAverage> {
    let mut buckets: BTreeMap<(i32, u32), Bucket> = BTreeMap::new();

    for record in records {
        if !record.success {
            continue;
        }
        // Successful rows always carry both throughput fields; tolerate
        // anything else in legacy data by skipping it.
        let (Some(download), Some(upload)) = (record.download_mbps, record.upload_mbps) else {
            continue;
        };
        let (period_key, label) = key(record);
        let bucket = buckets.entry(period_key).or_insert_with(|| Bucket {
            label,
            download_sum: 0.0,
            upload_sum: 0.0,
            count: 0,
        });
        bucket.download_sum += download;
        bucket.upload_sum += upload;
        bucket.count += 1;
    }

    buckets
        .into_values()
        .map(|bucket| {
            let n = f64::from(bucket.count);
            PeriodAverage {
                period: bucket.label,
                avg_download_mbps: round2(bucket.download_sum / n),
                avg_upload_mbps: round2(bucket.upload_sum / n),
            }
        })
        .collect()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
