use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pg_fluent::prelude::*;
use pg_fluent::test_utils::{MockResult, MockTransport};
use tokio::runtime::Runtime;

fn users_result() -> MockResult {
    MockResult::new(
        &[("id", 23), ("name", 25), ("active", 16)],
        vec![
            vec![Some("1"), Some("alice"), Some("t")],
            vec![Some("2"), Some("bob"), Some("f")],
        ],
    )
}

#[test]
fn query_converts_placeholders_and_types_rows() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let mut transport = MockTransport::new();
        transport.push_response(users_result());
        let mut session = Session::new(transport, SessionConfig::new("host=localhost dbname=app"));

        let mut result = session
            .query("SELECT id, name, active FROM users WHERE id > ? AND active = ?", vec![
                PgValue::Int(0),
                PgValue::Bool(true),
            ])
            .await
            .unwrap();

        // auto-connected and converted to native placeholders
        assert!(session.is_connected());
        let sent = &session.transport().sent;
        assert_eq!(
            sent[0].0,
            "SELECT id, name, active FROM users WHERE id > $1 AND active = $2"
        );
        assert_eq!(sent[0].1, vec![PgValue::Int(0), PgValue::Bool(true)]);

        assert_eq!(result.row_count().unwrap(), 2);
        let mut row = result.fetch().unwrap().unwrap();
        assert_eq!(row.get("id").unwrap(), &PgValue::Int(1));
        assert_eq!(row.get("name").unwrap(), &PgValue::Text("alice".into()));
        assert_eq!(row.get("active").unwrap(), &PgValue::Bool(true));
    });
}

#[test]
fn query_failure_carries_statement_and_error() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let mut transport = MockTransport::new();
        transport.push_failure("relation \"missing\" does not exist");
        let mut session = Session::new(transport, SessionConfig::new("host=localhost"));

        let err = session
            .query("SELECT * FROM missing", vec![])
            .await
            .unwrap_err();
        match err {
            PgFluentError::Query(QueryError::QueryFailed { sql, error }) => {
                assert_eq!(sql, "SELECT * FROM missing");
                assert!(error.contains("missing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    });
}

#[test]
fn connect_failure_and_bad_connection() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let mut transport = MockTransport::new();
        transport.fail_connect = Some("no route to host".into());
        let mut session = Session::new(transport, SessionConfig::new("host=unreachable"));
        let err = session.connect().await.unwrap_err();
        assert!(matches!(
            err,
            PgFluentError::Connection(ConnectionError::ConnectionFailed(_))
        ));
        assert_eq!(session.state(), SessionState::Disconnected);

        let mut transport = MockTransport::new();
        transport.bad = true;
        let mut session = Session::new(transport, SessionConfig::new("host=flaky"));
        let err = session.connect().await.unwrap_err();
        assert!(matches!(
            err,
            PgFluentError::Connection(ConnectionError::BadConnection)
        ));
    });
}

#[test]
fn missing_config_is_rejected_before_io() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let mut session = Session::new(MockTransport::new(), SessionConfig::default());
        let err = session.connect().await.unwrap_err();
        assert!(matches!(
            err,
            PgFluentError::Config(ConfigError::NoConfig)
        ));
    });
}

#[test]
fn settings_freeze_once_connected() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let mut session = Session::new(MockTransport::new(), SessionConfig::new("host=localhost"));
        session.set_force_new(true).unwrap();
        session.set_error_verbosity(ErrorVerbosity::Verbose).unwrap();
        session.connect().await.unwrap();

        let err = session.set_connection_config("host=elsewhere").unwrap_err();
        assert!(matches!(
            err,
            PgFluentError::Config(ConfigError::CantChangeConnectionSettings)
        ));
        let err = session.set_error_verbosity(ErrorVerbosity::Terse).unwrap_err();
        assert!(matches!(
            err,
            PgFluentError::Config(ConfigError::CantChangeConnectionSettings)
        ));
        // the configured verbosity reached the transport at connect time
        assert_eq!(session.transport().verbosity, Some(ErrorVerbosity::Verbose));
    });
}

#[test]
fn hooks_fire_in_order_and_close_is_idempotent() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let connects = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));
        let queries = Arc::new(AtomicUsize::new(0));
        let timed = Arc::new(AtomicUsize::new(0));

        let mut session = Session::new(MockTransport::new(), SessionConfig::new("host=localhost"));
        {
            let connects = connects.clone();
            session.add_on_connect(move || {
                connects.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        {
            let closes = closes.clone();
            session.add_on_close(move || {
                closes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        {
            let queries = queries.clone();
            let timed = timed.clone();
            session.add_on_query(move |_query, elapsed| {
                queries.fetch_add(1, Ordering::SeqCst);
                if elapsed.is_some() {
                    timed.fetch_add(1, Ordering::SeqCst);
                }
                Ok(())
            });
        }

        session.query("SELECT 1 AS one", vec![]).await.unwrap();
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(queries.load(Ordering::SeqCst), 1);
        assert_eq!(timed.load(Ordering::SeqCst), 1);

        session.close().unwrap();
        session.close().unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.transport().closed);

        // a closed session is terminal
        let err = session.query("SELECT 1", vec![]).await.unwrap_err();
        assert!(matches!(
            err,
            PgFluentError::Connection(ConnectionError::SessionClosed)
        ));
    });
}

#[test]
fn failing_hook_aborts_remaining_hooks() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let later = Arc::new(AtomicUsize::new(0));
        let mut session = Session::new(MockTransport::new(), SessionConfig::new("host=localhost"));
        session.add_on_connect(|| {
            Err(PgFluentError::Connection(ConnectionError::BadConnection))
        });
        {
            let later = later.clone();
            session.add_on_connect(move || {
                later.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        assert!(session.connect().await.is_err());
        assert_eq!(later.load(Ordering::SeqCst), 0);
    });
}

#[test]
fn notices_are_readable_or_unavailable() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let mut transport = MockTransport::new();
        transport.notice_list = Some(vec![String::from("NOTICE: something")]);
        let mut session = Session::new(transport, SessionConfig::new("host=localhost"));
        session.connect().await.unwrap();
        assert_eq!(session.notices(true).unwrap().len(), 1);
        assert!(session.notices(false).unwrap().is_empty());

        let mut transport = MockTransport::new();
        transport.notice_list = None;
        let mut session = Session::new(transport, SessionConfig::new("host=localhost"));
        session.connect().await.unwrap();
        assert!(matches!(
            session.notices(true).unwrap_err(),
            PgFluentError::Connection(ConnectionError::NoticesUnavailable)
        ));
    });
}

#[test]
fn ping_connects_and_reports_health() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let mut session = Session::new(MockTransport::new(), SessionConfig::new("host=localhost"));
        assert!(!session.is_connected());
        assert!(session.ping().await.unwrap());
        assert!(session.is_connected());
    });
}
