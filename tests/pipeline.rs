use lib::{StepEvent, TransformConfig, extract, load, transform};
use rusqlite::Connection;
use std::fs;

const APPS_CSV: &str = "\
App,Category,Rating,Reviews,Installs
App1,FOOD_AND_DRINK,4.5,1500,\"1,000+\"
App1,FOOD_AND_DRINK,4.5,1500,\"1,000+\"
App2,GAME,4.0,500,500+
App3,FOOD_AND_DRINK,3.5,200,200+
";

const REVIEWS_CSV: &str = "\
App,Sentiment_Polarity
App1,0.8
App1,0.6
App2,0.5
App3,0.3
";

#[test]
fn end_to_end_pipeline_loads_filtered_table() {
    let dir = tempfile::tempdir().unwrap();
    let apps_path = dir.path().join("apps_data.csv");
    let reviews_path = dir.path().join("review_data.csv");
    fs::write(&apps_path, APPS_CSV).unwrap();
    fs::write(&reviews_path, REVIEWS_CSV).unwrap();

    let apps_data = extract(&apps_path).unwrap();
    let reviews_data = extract(&reviews_path).unwrap();
    assert_eq!(apps_data.row_count(), 4);

    let config = TransformConfig {
        drop_duplicates: true,
        category: Some("FOOD_AND_DRINK".into()),
        aggregate_reviews: true,
        columns_to_keep: Some(vec![
            "App".into(),
            "Rating".into(),
            "Reviews".into(),
            "Sentiment_Polarity".into(),
        ]),
        min_rating: Some(4.0),
        min_reviews: Some(1000.0),
        sort_by: Some(vec!["Rating".into(), "Reviews".into()]),
    };
    let mut events: Vec<StepEvent> = Vec::new();
    let filtered = transform(&apps_data, Some(&reviews_data), &config, &mut events).unwrap();

    assert_eq!(filtered.row_count(), 1);
    assert_eq!(
        filtered.columns,
        vec!["App", "Rating", "Reviews", "Sentiment_Polarity"]
    );

    let mut conn = Connection::open(dir.path().join("etl.db")).unwrap();
    load(&apps_data, "apps_data", &mut conn).unwrap();
    load(&filtered, "filtered_apps_data", &mut conn).unwrap();
    load(&reviews_data, "reviews_data", &mut conn).unwrap();

    let (app, rating, polarity): (String, f64, f64) = conn
        .query_row(
            "SELECT App, Rating, Sentiment_Polarity FROM filtered_apps_data",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!(app, "App1");
    assert!((rating - 4.5).abs() < 1e-9);
    // mean of App1's two review polarities, deduplicated reviews untouched
    assert!((polarity - 0.7).abs() < 1e-9);

    // raw tables keep their unfiltered contents
    let raw_apps: i64 = conn
        .query_row("SELECT COUNT(*) FROM apps_data", [], |r| r.get(0))
        .unwrap();
    assert_eq!(raw_apps, 4);
    let raw_reviews: i64 = conn
        .query_row("SELECT COUNT(*) FROM reviews_data", [], |r| r.get(0))
        .unwrap();
    assert_eq!(raw_reviews, 4);
}

#[test]
fn rerunning_the_pipeline_replaces_destination_tables() {
    let dir = tempfile::tempdir().unwrap();
    let apps_path = dir.path().join("apps_data.csv");
    fs::write(&apps_path, APPS_CSV).unwrap();

    let apps_data = extract(&apps_path).unwrap();
    let mut conn = Connection::open(dir.path().join("etl.db")).unwrap();
    load(&apps_data, "apps_data", &mut conn).unwrap();
    load(&apps_data, "apps_data", &mut conn).unwrap();

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM apps_data", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 4);
}
