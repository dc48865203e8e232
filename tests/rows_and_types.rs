use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pg_fluent::prelude::*;
use pg_fluent::test_utils::{MockResult, MockTransport};
use tokio::runtime::Runtime;

fn counting_parser(counter: Arc<AtomicUsize>) -> TypeParser {
    let mut parser = TypeParser::new();
    parser.register("int4", move |raw| {
        counter.fetch_add(1, Ordering::SeqCst);
        raw.parse::<i64>().map(PgValue::Int).map_err(|e| e.to_string())
    });
    parser
}

fn two_ints() -> MockResult {
    MockResult::new(
        &[("a", 23), ("b", 23)],
        vec![vec![Some("1"), Some("2")]],
    )
}

#[test]
fn lazy_rows_decode_each_column_at_most_once() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let decodes = Arc::new(AtomicUsize::new(0));
        let mut transport = MockTransport::new();
        transport.push_response(two_ints());
        let mut session = Session::new(transport, SessionConfig::new("host=localhost"))
            .with_row_mode(RowMode::Lazy)
            .with_type_parser(counting_parser(decodes.clone()));

        let mut result = session.query("SELECT a, b FROM t", vec![]).await.unwrap();
        let mut row = result.fetch().unwrap().unwrap();
        assert_eq!(decodes.load(Ordering::SeqCst), 0);

        assert_eq!(row.get("a").unwrap(), &PgValue::Int(1));
        assert_eq!(row.get("a").unwrap(), &PgValue::Int(1));
        assert_eq!(row.get("a").unwrap(), &PgValue::Int(1));
        assert_eq!(decodes.load(Ordering::SeqCst), 1);

        // overwriting before the first read skips decoding entirely
        row.set("b", PgValue::Int(99)).unwrap();
        assert_eq!(row.get("b").unwrap(), &PgValue::Int(99));
        assert_eq!(decodes.load(Ordering::SeqCst), 1);
    });
}

#[test]
fn eager_rows_decode_at_fetch_time() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let decodes = Arc::new(AtomicUsize::new(0));
        let mut transport = MockTransport::new();
        transport.push_response(two_ints());
        let mut session = Session::new(transport, SessionConfig::new("host=localhost"))
            .with_type_parser(counting_parser(decodes.clone()));

        let mut result = session.query("SELECT a, b FROM t", vec![]).await.unwrap();
        let mut row = result.fetch().unwrap().unwrap();
        assert_eq!(decodes.load(Ordering::SeqCst), 2);
        assert_eq!(row.get("b").unwrap(), &PgValue::Int(2));
        assert_eq!(decodes.load(Ordering::SeqCst), 2);
    });
}

#[test]
fn removed_columns_report_not_found() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let mut transport = MockTransport::new();
        transport.push_response(two_ints());
        let mut session = Session::new(transport, SessionConfig::new("host=localhost"))
            .with_row_mode(RowMode::Lazy);

        let mut result = session.query("SELECT a, b FROM t", vec![]).await.unwrap();
        let mut row = result.fetch().unwrap().unwrap();
        assert!(row.has("a"));
        row.remove("a").unwrap();
        assert!(!row.has("a"));
        assert!(matches!(
            row.get("a").unwrap_err(),
            PgFluentError::Result(ResultError::NoColumn(column)) if column == "a"
        ));
        assert!(matches!(
            row.get("ghost").unwrap_err(),
            PgFluentError::Result(ResultError::NoColumn(_))
        ));

        let values = row.to_values().unwrap();
        assert_eq!(values, vec![(String::from("b"), PgValue::Int(2))]);
    });
}

#[test]
fn null_values_never_hit_the_parser() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let decodes = Arc::new(AtomicUsize::new(0));
        let mut transport = MockTransport::new();
        transport.push_response(MockResult::new(
            &[("a", 23)],
            vec![vec![None]],
        ));
        let mut session = Session::new(transport, SessionConfig::new("host=localhost"))
            .with_row_mode(RowMode::Lazy)
            .with_type_parser(counting_parser(decodes.clone()));

        let mut result = session.query("SELECT a FROM t", vec![]).await.unwrap();
        let mut row = result.fetch().unwrap().unwrap();
        assert!(row.get("a").unwrap().is_null());
        assert_eq!(decodes.load(Ordering::SeqCst), 0);
    });
}

#[test]
fn unknown_oid_and_unparseable_values_fail_typed() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        // oid 600 (point) is in no catalog the registry knows
        let mut transport = MockTransport::new();
        transport.push_response(MockResult::new(
            &[("p", 600)],
            vec![vec![Some("(1,2)")]],
        ));
        transport.catalog = vec![(23, String::from("int4"))];
        let mut session = Session::new(transport, SessionConfig::new("host=localhost"))
            .with_row_mode(RowMode::Lazy);

        let mut result = session.query("SELECT p FROM shapes", vec![]).await.unwrap();
        let mut row = result.fetch().unwrap().unwrap();
        assert!(matches!(
            row.get("p").unwrap_err(),
            PgFluentError::TypeParse(TypeParseError::UnknownOid { oid: 600, .. })
        ));

        // a known name whose value does not parse names oid and raw value
        let mut transport = MockTransport::new();
        transport.push_response(MockResult::new(
            &[("n", 23)],
            vec![vec![Some("not-a-number")]],
        ));
        let mut session = Session::new(transport, SessionConfig::new("host=localhost"))
            .with_row_mode(RowMode::Lazy);
        let mut result = session.query("SELECT n FROM t", vec![]).await.unwrap();
        let mut row = result.fetch().unwrap().unwrap();
        assert!(matches!(
            row.get("n").unwrap_err(),
            PgFluentError::TypeParse(TypeParseError::UnparseableValue { oid: 23, ref value, .. })
                if value == "not-a-number"
        ));
    });
}

#[test]
fn result_set_projections_and_free() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let mut transport = MockTransport::new();
        transport.push_response(MockResult::new(
            &[("id", 23), ("name", 25)],
            vec![
                vec![Some("1"), Some("alice")],
                vec![Some("2"), Some("bob")],
                vec![Some("3"), Some("carol")],
            ],
        ));
        let mut session = Session::new(transport, SessionConfig::new("host=localhost"));
        let mut result = session.query("SELECT id, name FROM users", vec![]).await.unwrap();

        assert_eq!(result.columns(), ["id", "name"]);

        let window = result.fetch_all(Some(1), Some(1)).unwrap();
        assert_eq!(window.len(), 1);

        let pairs = result.fetch_pairs(None, None).unwrap();
        assert_eq!(
            pairs[0],
            (PgValue::Int(1), PgValue::Text("alice".into()))
        );

        let assoc = result.fetch_assoc("name").unwrap();
        let mut bob = assoc.get("bob").cloned().unwrap();
        assert_eq!(bob.get("id").unwrap(), &PgValue::Int(2));

        // cursor semantics are independent of the random-access helpers
        assert!(result.fetch().unwrap().is_some());

        assert!(result.free());
        assert!(!result.free());
        assert!(matches!(
            result.row_count().unwrap_err(),
            PgFluentError::Result(ResultError::AlreadyFreed)
        ));
        assert!(matches!(
            result.fetch().unwrap_err(),
            PgFluentError::Result(ResultError::AlreadyFreed)
        ));
    });
}
