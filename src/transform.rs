use crate::error::{PipelineError, Result};
use crate::structs::{EventSink, Frame, StepEvent, TransformConfig, Value};
use log::{debug, warn};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

const APP_KEY: &str = "App";
const CATEGORY_COLUMN: &str = "Category";
const RATING_COLUMN: &str = "Rating";
const REVIEWS_COLUMN: &str = "Reviews";
const POLARITY_COLUMN: &str = "Sentiment_Polarity";

/// Transforms an apps dataset, optionally enriched with reviews, according to
/// the requested configuration.
///
/// Steps run in a fixed order, each only when its trigger is set:
///
/// 1. Drop duplicates (apps by `App` key, reviews exact-row).
/// 2. Coerce `Rating` and `Reviews` to numeric; unparseable values become null.
/// 3. Filter apps by `Category`.
/// 4. Restrict reviews to matching apps, then aggregate-and-join (mean
///    `Sentiment_Polarity` per app) or raw-merge with fan-out.
/// 5. Project to `columns_to_keep`.
/// 6. Apply `min_rating` / `min_reviews` strict thresholds (AND).
/// 7. Sort descending by the `sort_by` keys (stable, composite).
///
/// Inputs are never mutated; a fresh [`Frame`] is returned. One [`StepEvent`]
/// is emitted to `events` per step that runs or is skipped over a missing
/// precondition.
///
/// # Errors
///
/// The single fatal condition is `columns_to_keep` naming a column absent
/// from the working dataset at projection time
/// ([`PipelineError::MissingColumn`]). Every other missing precondition
/// degrades to a no-op with a diagnostic.
pub fn transform(
    apps: &Frame,
    reviews: Option<&Frame>,
    config: &TransformConfig,
    events: &mut dyn EventSink,
) -> Result<Frame> {
    debug!("Starting data transformation");
    let mut apps = apps.clone();
    let mut reviews = reviews.cloned();

    // Step 1: duplicates
    if config.drop_duplicates {
        let apps_removed = match apps.column_index(APP_KEY) {
            Some(idx) => {
                let before = apps.row_count();
                apps = dedup_first_by_key(&apps, idx);
                before - apps.row_count()
            }
            None => {
                events.emit(StepEvent::DedupSkipped {
                    reason: format!("apps dataset has no '{APP_KEY}' column"),
                });
                0
            }
        };
        let reviews_removed = match reviews.as_mut() {
            Some(r) => {
                let before = r.row_count();
                *r = dedup_exact_rows(r);
                before - r.row_count()
            }
            None => 0,
        };
        events.emit(StepEvent::DuplicatesDropped {
            apps_removed,
            reviews_removed,
        });
    }

    // Step 2: numeric coercion, unconditional
    for column in [RATING_COLUMN, REVIEWS_COLUMN] {
        if let Some(idx) = apps.column_index(column) {
            let mut nulled = 0;
            for row in &mut apps.rows {
                let coerced = row[idx].coerce_number();
                if coerced == Value::Null && row[idx] != Value::Null {
                    nulled += 1;
                }
                row[idx] = coerced;
            }
            events.emit(StepEvent::ColumnCoerced {
                column: column.to_string(),
                nulled,
            });
        }
    }

    // Step 3: category filter
    if let Some(category) = &config.category {
        match apps.column_index(CATEGORY_COLUMN) {
            Some(idx) => {
                apps = apps.filter_rows(|row| matches!(&row[idx], Value::Text(s) if s == category));
                events.emit(StepEvent::CategoryFiltered {
                    category: category.clone(),
                    kept: apps.row_count(),
                });
            }
            None => events.emit(StepEvent::CategorySkipped {
                reason: format!("apps dataset has no '{CATEGORY_COLUMN}' column"),
            }),
        }
    }

    // Step 4: review processing
    if let Some(reviews) = reviews.as_ref() {
        apps = process_reviews(apps, reviews, config.aggregate_reviews, events);
    }

    // Step 5: column projection, the single fatal condition
    if let Some(keep) = &config.columns_to_keep {
        let mut indices = Vec::with_capacity(keep.len());
        for name in keep {
            let idx = apps
                .column_index(name)
                .ok_or_else(|| PipelineError::MissingColumn(name.clone()))?;
            indices.push(idx);
        }
        let rows = apps
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        apps = Frame::new(keep.clone(), rows);
        events.emit(StepEvent::ColumnsProjected {
            columns: keep.clone(),
        });
    }

    // Step 6: threshold filters, combined with AND
    if config.min_rating.is_some() || config.min_reviews.is_some() {
        let rating_idx = apps.column_index(RATING_COLUMN);
        let reviews_idx = apps.column_index(REVIEWS_COLUMN);
        apps = apps.filter_rows(|row| {
            exceeds(row, rating_idx, config.min_rating)
                && exceeds(row, reviews_idx, config.min_reviews)
        });
        events.emit(StepEvent::ThresholdFiltered {
            kept: apps.row_count(),
        });
    }

    // Step 7: sort
    if let Some(sort_by) = &config.sort_by {
        let mut key_indices = Vec::with_capacity(sort_by.len());
        let mut keys = Vec::with_capacity(sort_by.len());
        for name in sort_by {
            match apps.column_index(name) {
                Some(idx) => {
                    key_indices.push(idx);
                    keys.push(name.clone());
                }
                None => events.emit(StepEvent::SortKeySkipped {
                    column: name.clone(),
                }),
            }
        }
        if !key_indices.is_empty() {
            apps.rows.sort_by(|a, b| {
                key_indices
                    .iter()
                    .map(|&i| a[i].cmp_desc(&b[i]))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
            events.emit(StepEvent::Sorted { keys });
        }
    }

    debug!(
        "Transformation completed: {} rows, {} columns",
        apps.row_count(),
        apps.columns.len()
    );
    Ok(apps)
}

/// Join/dedup identity of a single value. Null carries no identity, matching
/// nothing (including other nulls) in joins.
fn join_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Number(n) => Some(format!("n:{n}")),
        Value::Text(s) => Some(format!("t:{s}")),
    }
}

/// Keeps the first occurrence of each key in column `idx`. Null keys dedup
/// against each other like any other key.
fn dedup_first_by_key(frame: &Frame, idx: usize) -> Frame {
    let mut seen = HashSet::new();
    frame.filter_rows(|row| {
        let key = join_key(&row[idx]).unwrap_or_else(|| "null".to_string());
        seen.insert(key)
    })
}

fn dedup_exact_rows(frame: &Frame) -> Frame {
    let mut seen = HashSet::new();
    frame.filter_rows(|row| {
        let key = serde_json::to_string(row).unwrap_or_else(|_| format!("{row:?}"));
        seen.insert(key)
    })
}

/// Restricts reviews to apps' `App` values and joins the `Sentiment_Polarity`
/// onto the apps frame, either aggregated (mean per app, one row per app) or
/// raw (fan-out, one row per matching review).
///
/// Skips entirely, leaving `apps` untouched, when either side is missing its
/// join column, when reviews lacks the polarity column, or when reviews has
/// zero rows. In all of these no review column is added.
fn process_reviews(
    apps: Frame,
    reviews: &Frame,
    aggregate: bool,
    events: &mut dyn EventSink,
) -> Frame {
    let Some(rev_app_idx) = reviews.column_index(APP_KEY) else {
        warn!(
            "The reviews dataset does not contain an '{APP_KEY}' column. Skipping review processing."
        );
        events.emit(StepEvent::ReviewsSkipped {
            reason: format!("reviews dataset has no '{APP_KEY}' column"),
        });
        return apps;
    };
    if reviews.is_empty() {
        events.emit(StepEvent::ReviewsSkipped {
            reason: "reviews dataset is empty".to_string(),
        });
        return apps;
    }
    let Some(rev_pol_idx) = reviews.column_index(POLARITY_COLUMN) else {
        events.emit(StepEvent::ReviewsSkipped {
            reason: format!("reviews dataset has no '{POLARITY_COLUMN}' column"),
        });
        return apps;
    };
    let Some(app_idx) = apps.column_index(APP_KEY) else {
        events.emit(StepEvent::ReviewsSkipped {
            reason: format!("apps dataset has no '{APP_KEY}' column"),
        });
        return apps;
    };

    let wanted: HashSet<String> = apps
        .rows
        .iter()
        .filter_map(|row| join_key(&row[app_idx]))
        .collect();
    let matched: Vec<(String, Value)> = reviews
        .rows
        .iter()
        .filter_map(|row| {
            let key = join_key(&row[rev_app_idx])?;
            wanted.contains(&key).then(|| (key, row[rev_pol_idx].clone()))
        })
        .collect();

    if aggregate {
        // Mean over the numerically parseable polarities per app; a group with
        // none stays null.
        let mut sums: HashMap<String, (f64, usize)> = HashMap::new();
        for (key, value) in &matched {
            if let Value::Number(n) = value.coerce_number() {
                let entry = sums.entry(key.clone()).or_insert((0.0, 0));
                entry.0 += n;
                entry.1 += 1;
            }
        }
        let column = suffixed_column(&apps, POLARITY_COLUMN, "_agg");
        let mut out = apps;
        out.columns.push(column);
        for row in &mut out.rows {
            let mean = join_key(&row[app_idx])
                .and_then(|key| sums.get(&key))
                .map(|&(sum, count)| Value::Number(sum / count as f64))
                .unwrap_or(Value::Null);
            row.push(mean);
        }
        events.emit(StepEvent::ReviewsAggregated { groups: sums.len() });
        out
    } else {
        let matched_count = matched.len();
        let mut by_app: HashMap<String, Vec<Value>> = HashMap::new();
        for (key, value) in matched {
            by_app.entry(key).or_default().push(value);
        }
        let column = suffixed_column(&apps, POLARITY_COLUMN, "_review");
        let mut rows = Vec::with_capacity(apps.row_count());
        for row in &apps.rows {
            let matches = join_key(&row[app_idx]).and_then(|key| by_app.get(&key));
            match matches {
                Some(values) if !values.is_empty() => {
                    for value in values {
                        let mut fanned = row.clone();
                        fanned.push(value.clone());
                        rows.push(fanned);
                    }
                }
                _ => {
                    let mut unmatched = row.clone();
                    unmatched.push(Value::Null);
                    rows.push(unmatched);
                }
            }
        }
        let mut columns = apps.columns.clone();
        columns.push(column);
        events.emit(StepEvent::ReviewsMerged {
            matched: matched_count,
        });
        Frame::new(columns, rows)
    }
}

/// Name for the joined review column; suffixed only on collision with an
/// existing apps column.
fn suffixed_column(apps: &Frame, base: &str, suffix: &str) -> String {
    if apps.has_column(base) {
        format!("{base}{suffix}")
    } else {
        base.to_string()
    }
}

/// Strict `>` threshold check. No threshold passes everything; a threshold
/// against a missing or non-numeric value fails the row.
fn exceeds(row: &[Value], idx: Option<usize>, min: Option<f64>) -> bool {
    match min {
        None => true,
        Some(min) => idx.and_then(|i| row[i].as_number()).is_some_and(|n| n > min),
    }
}
