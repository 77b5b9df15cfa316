use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use price_forecast::data::{CsvOptions, DataLoader, TimeSeriesData, DATE_COLUMN, VALUE_COLUMN};
use price_forecast::ForecastError;
use std::io::Write;
use tempfile::NamedTempFile;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_data_loader_from_csv() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Date,Open,High,Low,Close,Volume").unwrap();
    writeln!(file, "2023-01-01,100.0,105.0,98.0,103.0,1000").unwrap();
    writeln!(file, "2023-01-02,103.0,107.0,101.0,106.0,1200").unwrap();
    writeln!(file, "2023-01-03,106.0,110.0,104.0,108.0,1500").unwrap();

    let data = DataLoader::from_csv(file.path()).unwrap();

    assert_eq!(data.len(), 3);
    assert!(!data.is_empty());
    assert_eq!(data.values(), &[103.0, 106.0, 108.0]);
    assert_eq!(data.first_date(), date(2023, 1, 1));
    assert_eq!(data.last_date(), date(2023, 1, 3));
}

#[test]
fn test_semicolon_csv_with_decimal_commas() {
    let csv = "\u{feff}\"Data\";\"Preço - petróleo bruto - Brent (FOB)\"\n\
               \"21/05/1987\";\"18,45\"\n\
               \"20/05/1987\";\"18,63\"\n\
               \"22/05/1987\";\"\"\n\
               \"25/05/1987\";\"18,60\"\n";

    let data = DataLoader::from_csv_bytes(csv.as_bytes()).unwrap();

    assert_eq!(data.len(), 3);
    assert_eq!(
        data.dates(),
        &[date(1987, 5, 20), date(1987, 5, 21), date(1987, 5, 25)]
    );
    assert_eq!(data.values(), &[18.63, 18.45, 18.60]);
}

#[test]
fn test_duplicate_dates_keep_last_occurrence() {
    let csv = "ds,y\n2023-01-02,2.0\n2023-01-01,1.0\n2023-01-02,5.0\n";
    let data = DataLoader::from_csv_bytes(csv.as_bytes()).unwrap();

    assert_eq!(data.dates(), &[date(2023, 1, 1), date(2023, 1, 2)]);
    assert_eq!(data.values(), &[1.0, 5.0]);
}

#[test]
fn test_explicit_options() {
    let csv = "when|amount|other\n01.02.2024|10.5|x\n02.02.2024|11.5|y\n";
    let options = CsvOptions {
        date_column: Some("when".to_string()),
        value_column: Some("AMOUNT".to_string()),
        date_format: Some("%d.%m.%Y".to_string()),
        delimiter: Some(b'|'),
    };

    let data = DataLoader::from_csv_bytes_with(csv.as_bytes(), &options).unwrap();
    assert_eq!(data.dates(), &[date(2024, 2, 1), date(2024, 2, 2)]);
    assert_eq!(data.values(), &[10.5, 11.5]);
}

#[test]
fn test_numeric_column_fallback() {
    let csv = "date,label,reading\n2023-01-01,a,1.5\n2023-01-02,b,2.5\n";
    let data = DataLoader::from_csv_bytes(csv.as_bytes()).unwrap();
    assert_eq!(data.values(), &[1.5, 2.5]);
}

#[test]
fn test_data_loader_error_handling() {
    // Non-existent file
    let result = DataLoader::from_csv("nonexistent_file.csv");
    assert!(matches!(result, Err(ForecastError::IoError(_))));

    // No date column
    let result = DataLoader::from_csv_bytes(b"alpha,beta\n1,2\n");
    assert!(matches!(result, Err(ForecastError::DataError(_))));

    // Unparsable date names its line
    let result = DataLoader::from_csv_bytes(b"date,price\n2023-01-01,1\nyesterday,2\n");
    match result {
        Err(ForecastError::DataError(msg)) => assert!(msg.contains("Line 3"), "{}", msg),
        other => panic!("Expected DataError, got {:?}", other),
    }

    // Header only
    let result = DataLoader::from_csv_bytes(b"date,price\n");
    assert!(result.is_err());
}

#[test]
fn test_time_series_data_operations() {
    let dates = vec![date(2023, 1, 1), date(2023, 1, 2), date(2023, 1, 3)];
    let values = vec![100.0, 103.0, 106.0];

    let data = TimeSeriesData::new(dates, values).unwrap();

    assert_eq!(data.len(), 3);

    let subset = data.slice(1, Some(3)).unwrap();
    assert_eq!(subset.len(), 2);
    assert_eq!(subset.dataframe().height(), 2);
    assert!(data.slice(2, Some(2)).is_err());

    let mean = data.mean().unwrap();
    assert!((mean - 103.0).abs() < 1e-12);

    let std_dev = data.std_dev().unwrap();
    assert!((std_dev - 3.0).abs() < 1e-12);

    assert!(TimeSeriesData::new(vec![date(2023, 1, 1)], vec![]).is_err());
    assert!(TimeSeriesData::new(vec![date(2023, 1, 1)], vec![f64::NAN]).is_err());
}

#[test]
fn test_filter_range() {
    let dates: Vec<NaiveDate> = (1..=10).map(|d| date(2023, 1, d)).collect();
    let values: Vec<f64> = (1..=10).map(f64::from).collect();
    let data = TimeSeriesData::new(dates, values).unwrap();

    let window = data
        .filter_range(Some(date(2023, 1, 3)), Some(date(2023, 1, 5)))
        .unwrap()
        .unwrap();
    assert_eq!(window.values(), &[3.0, 4.0, 5.0]);

    let open_start = data.filter_range(None, Some(date(2023, 1, 2))).unwrap().unwrap();
    assert_eq!(open_start.len(), 2);

    let open_end = data.filter_range(Some(date(2023, 1, 9)), None).unwrap().unwrap();
    assert_eq!(open_end.values(), &[9.0, 10.0]);

    assert!(data
        .filter_range(Some(date(2024, 1, 1)), None)
        .unwrap()
        .is_none());
    assert!(data
        .filter_range(Some(date(2023, 1, 5)), Some(date(2023, 1, 3)))
        .is_err());
}

#[test]
fn test_dataframe_columns() {
    let dates: Vec<NaiveDate> = (1..=5).map(|d| date(2023, 3, d)).collect();
    let data = TimeSeriesData::new(dates, vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

    let df = data.dataframe();
    assert_eq!(df.get_column_names(), vec![DATE_COLUMN, VALUE_COLUMN]);

    let derived = data.with_derived_columns(2).unwrap();
    assert_eq!(derived.width(), 4);
    assert_eq!(derived.height(), 5);

    let rebuilt = DataLoader::from_dataframe(df).unwrap();
    assert_eq!(rebuilt.dates(), data.dates());
    assert_eq!(rebuilt.values(), data.values());
}
