//! Runs against a live database when `KEYWARD_TEST_DATABASE_URL` is set;
//! otherwise every test returns early.

use std::sync::Arc;

use keyward_auth::keys::{KeySelector, MIN_KEY_BITS, SigningKeyRecord};
use keyward_auth::storage::SigningKeyStore;
use keyward_auth_postgres::PostgresSigningKeyStore;
use time::{Duration, OffsetDateTime};

async fn store() -> Option<PostgresSigningKeyStore> {
    let url = std::env::var("KEYWARD_TEST_DATABASE_URL").ok()?;
    let store = PostgresSigningKeyStore::connect(&url, 2).await.unwrap();
    store.ensure_schema().await.unwrap();
    Some(store)
}

fn generated(days: i64) -> SigningKeyRecord {
    SigningKeyRecord::generate(MIN_KEY_BITS, OffsetDateTime::now_utc() + Duration::days(days))
        .unwrap()
}

#[tokio::test]
async fn test_insert_and_list_newest_first() {
    let Some(store) = store().await else {
        return;
    };

    let far = generated(10_000);
    let far_public = far.public_pem().to_string();
    store.insert(generated(1)).await.unwrap();
    store.insert(far).await.unwrap();

    let records = store.list_all().await.unwrap();
    assert!(records.len() >= 2);
    assert!(
        records
            .windows(2)
            .all(|pair| pair[0].expires_at() >= pair[1].expires_at())
    );

    let current = KeySelector::new(Arc::new(store.clone())).current().await.unwrap();
    assert_eq!(current.public_pem(), far_public);
}

#[tokio::test]
async fn test_duplicate_public_key() {
    let Some(store) = store().await else {
        return;
    };

    let record = generated(1);
    let copy = SigningKeyRecord::from_parts(
        record.private_pem(),
        record.public_pem(),
        record.expires_at(),
    );
    store.insert(record).await.unwrap();

    let err = store.insert(copy).await.unwrap_err();
    assert!(err.is_duplicate());
}

#[tokio::test]
async fn test_listing_reuses_records() {
    let Some(store) = store().await else {
        return;
    };

    store.insert(generated(2)).await.unwrap();
    let first = store.list_all().await.unwrap();
    let second = store.list_all().await.unwrap();
    assert!(Arc::ptr_eq(&first[0], &second[0]));
}
