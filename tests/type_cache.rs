use std::collections::HashMap;
use std::sync::Arc;

use pg_fluent::datatype::fingerprint;
use pg_fluent::prelude::*;
use pg_fluent::test_utils::{MockResult, MockTransport};
use tokio::runtime::Runtime;

const CONFIG: &str = "host=localhost dbname=app user=app";

fn catalog_queries(session: &Session<MockTransport>) -> usize {
    session
        .transport()
        .sent
        .iter()
        .filter(|(sql, _)| sql.starts_with("SELECT oid, typname"))
        .count()
}

fn int_result() -> MockResult {
    MockResult::new(&[("n", 23)], vec![vec![Some("5")]])
}

#[test]
fn store_roundtrip_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileTypeCache::new(dir.path());
    let fp = fingerprint(CONFIG);

    assert!(store.load(&fp).unwrap().is_none());

    let mut types = HashMap::new();
    types.insert(23u32, String::from("int4"));
    types.insert(25u32, String::from("text"));
    store.store(&fp, &types).unwrap();
    assert_eq!(store.load(&fp).unwrap(), Some(types.clone()));

    // a second store fully replaces the previous map
    types.insert(16u32, String::from("bool"));
    store.store(&fp, &types).unwrap();
    assert_eq!(store.load(&fp).unwrap().unwrap().len(), 3);

    store.clear(&fp).unwrap();
    store.clear(&fp).unwrap();
    assert!(store.load(&fp).unwrap().is_none());
}

#[test]
fn first_session_populates_cache_second_session_reads_it() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn TypeCacheStore> = Arc::new(JsonFileTypeCache::new(dir.path()));

        let mut transport = MockTransport::new();
        transport.push_response(int_result());
        let mut session = Session::new(transport, SessionConfig::new(CONFIG))
            .with_type_cache(store.clone());
        session.query("SELECT n FROM t", vec![]).await.unwrap();
        assert_eq!(catalog_queries(&session), 1);
        assert!(store.load(&fingerprint(CONFIG)).unwrap().is_some());

        // fresh registry, same store: the persisted map answers the lookup
        let mut transport = MockTransport::new();
        transport.push_response(int_result());
        let mut session = Session::new(transport, SessionConfig::new(CONFIG))
            .with_type_cache(store.clone());
        session.query("SELECT n FROM t", vec![]).await.unwrap();
        assert_eq!(catalog_queries(&session), 0);
    });
}

#[test]
fn clearing_cache_triggers_exactly_one_catalog_reload() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn TypeCacheStore> = Arc::new(JsonFileTypeCache::new(dir.path()));
        let fp = fingerprint(CONFIG);

        let mut transport = MockTransport::new();
        transport.push_response(int_result());
        let mut session = Session::new(transport, SessionConfig::new(CONFIG))
            .with_type_cache(store.clone());
        session.query("SELECT n FROM t", vec![]).await.unwrap();
        store.clear(&fp).unwrap();

        let mut transport = MockTransport::new();
        transport.push_response(int_result());
        transport.push_response(int_result());
        let mut session = Session::new(transport, SessionConfig::new(CONFIG))
            .with_type_cache(store.clone());
        session.query("SELECT n FROM t", vec![]).await.unwrap();
        session.query("SELECT n FROM t", vec![]).await.unwrap();
        assert_eq!(catalog_queries(&session), 1);
        assert!(store.load(&fp).unwrap().is_some());
    });
}

#[test]
fn shared_registry_skips_repeat_catalog_queries() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let registry = TypeRegistry::new();

        let mut transport = MockTransport::new();
        transport.push_response(int_result());
        let mut first = Session::new(transport, SessionConfig::new(CONFIG))
            .with_type_registry(registry.clone());
        first.query("SELECT n FROM t", vec![]).await.unwrap();
        assert_eq!(catalog_queries(&first), 1);

        let mut transport = MockTransport::new();
        transport.push_response(int_result());
        let mut second = Session::new(transport, SessionConfig::new(CONFIG))
            .with_type_registry(registry.clone());
        second.query("SELECT n FROM t", vec![]).await.unwrap();
        assert_eq!(catalog_queries(&second), 0);

        assert_eq!(registry.lookup(23).as_deref(), Some("int4"));
    });
}

#[test]
fn broken_cache_file_falls_back_to_catalog() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let fp = fingerprint(CONFIG);
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(dir.path().join(format!("{fp}.json")), b"{ not json").unwrap();

        let store: Arc<dyn TypeCacheStore> = Arc::new(JsonFileTypeCache::new(dir.path()));
        let mut transport = MockTransport::new();
        transport.push_response(int_result());
        let mut session = Session::new(transport, SessionConfig::new(CONFIG))
            .with_type_cache(store.clone());

        // load failure is non-fatal; the catalog query repairs the cache
        session.query("SELECT n FROM t", vec![]).await.unwrap();
        assert_eq!(catalog_queries(&session), 1);
        assert!(store.load(&fp).unwrap().is_some());
    });
}
