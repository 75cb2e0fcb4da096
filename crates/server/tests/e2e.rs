use std::net::SocketAddr;
use std::sync::Arc;

use migration::MigratorTrait;
use reqwest::StatusCode as HttpStatusCode;
use serde_json::json;
use service::customer::repo::SeaOrmCustomerRepository;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use uuid::Uuid;

use server::startup::{build_app, serve};

struct TestApp {
    base_url: String,
    stop: Option<oneshot::Sender<()>>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
    }
}

/// Real listener over a migrated throwaway SQLite database.
async fn start_server() -> anyhow::Result<TestApp> {
    let path = std::env::temp_dir().join(format!("server_e2e_{}.db", Uuid::new_v4()));
    let cfg = configs::DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", path.display()),
        max_connections: 1,
        min_connections: 1,
        ..configs::DatabaseConfig::default()
    };
    let db = models::db::connect_with_config(&cfg).await?;
    migration::Migrator::up(&db, None).await?;
    let app = build_app(Arc::new(SeaOrmCustomerRepository::new(db)));

    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let shutdown = async move {
            let _ = rx.await;
        };
        if let Err(e) = serve(listener, app, shutdown).await {
            eprintln!("server error: {}", e);
        }
    });
    Ok(TestApp { base_url, stop: Some(tx) })
}

#[tokio::test]
async fn e2e_health_reports_database() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = reqwest::get(format!("{}/health", app.base_url)).await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "database");
    Ok(())
}

#[tokio::test]
async fn e2e_customer_lifecycle() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = reqwest::Client::new();

    let res = c
        .post(format!("{}/api/customers", app.base_url))
        .json(&json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "phoneNumber": "1111111111",
            "addresses": [
                {"addressLine": "1 Main", "city": "Boston", "state": "MA", "pinCode": "021080"},
                {"addressLine": "2 Side", "city": "Cambridge", "state": "MA", "pinCode": "021390", "isPrimary": true}
            ]
        }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);
    let id = res.json::<serde_json::Value>().await?["customerId"].as_i64().expect("customerId");

    let body = c.get(format!("{}/api/customers/{id}", app.base_url)).send().await?.json::<serde_json::Value>().await?;
    let addrs = body["addresses"].as_array().expect("addresses");
    assert_eq!(addrs.len(), 2);
    assert_eq!(addrs[0]["isPrimary"], false);
    assert_eq!(addrs[1]["isPrimary"], true);

    let res = c.get(format!("{}/api/customers?city=CAMB", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["pagination"]["total"], 1);

    let res = c.delete(format!("{}/api/customers/{id}", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let res = c.get(format!("{}/api/customers/{id}", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);
    Ok(())
}
