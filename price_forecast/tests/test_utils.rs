use chrono::NaiveDate;
use price_forecast::utils::{
    date_from_days, days_since_epoch, future_dates, parse_date, parse_number, train_test_split,
};
use rstest::rstest;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[rstest]
#[case("18.63", Some(18.63))]
#[case("18,63", Some(18.63))]
#[case("1.234,56", Some(1234.56))]
#[case("1,234.56", Some(1234.56))]
#[case("1.234.567", Some(1234567.0))]
#[case(" \"42\" ", Some(42.0))]
#[case("-3.5", Some(-3.5))]
#[case("", None)]
#[case("-", None)]
#[case("NA", None)]
#[case("abc", None)]
fn test_parse_number(#[case] text: &str, #[case] expected: Option<f64>) {
    assert_eq!(parse_number(text), expected);
}

#[rstest]
#[case("2023-01-15", date(2023, 1, 15))]
#[case("15/01/2023", date(2023, 1, 15))]
#[case("15-01-2023", date(2023, 1, 15))]
#[case("2023/01/15", date(2023, 1, 15))]
#[case("15.01.2023", date(2023, 1, 15))]
#[case("2023-01-15T14:30:45", date(2023, 1, 15))]
#[case("2023-01-15 00:00:00", date(2023, 1, 15))]
fn test_parse_date(#[case] text: &str, #[case] expected: NaiveDate) {
    assert_eq!(parse_date(text, None).unwrap(), expected);
}

#[test]
fn test_parse_date_errors() {
    assert!(parse_date("not-a-date", None).is_err());
    assert!(parse_date("31/02/2023", None).is_err());
    assert!(parse_date("2023-01-15", Some("%d/%m/%Y")).is_err());
    assert_eq!(
        parse_date("01/15/2023", Some("%m/%d/%Y")).unwrap(),
        date(2023, 1, 15)
    );
}

#[test]
fn test_epoch_day_numbers() {
    assert_eq!(days_since_epoch(date(1970, 1, 1)), 0);
    assert_eq!(days_since_epoch(date(1970, 1, 2)), 1);
    assert_eq!(days_since_epoch(date(1969, 12, 31)), -1);
    assert_eq!(date_from_days(19_372).unwrap(), date(2023, 1, 15));
}

#[test]
fn test_future_dates() {
    let dates = future_dates(date(2023, 12, 30), 3).unwrap();
    assert_eq!(
        dates,
        vec![date(2023, 12, 31), date(2024, 1, 1), date(2024, 1, 2)]
    );
    assert!(future_dates(date(2023, 1, 1), 0).is_err());
}

#[test]
fn test_train_test_split() {
    let data: Vec<f64> = (0..10).map(f64::from).collect();

    let (train, test) = train_test_split(&data, 0.2);
    assert_eq!(train.len(), 8);
    assert_eq!(test, vec![8.0, 9.0]);

    let (train, test) = train_test_split(&data, 0.0);
    assert_eq!(train.len(), 10);
    assert!(test.is_empty());
}
