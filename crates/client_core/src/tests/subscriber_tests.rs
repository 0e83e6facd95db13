use super::*;
use std::collections::HashMap;

use axum::{extract::Query as UrlQuery, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use shared::domain::SubscriptionId;
use tokio::net::TcpListener;

fn param(params: &HashMap<String, String>, key: &str) -> String {
    params.get(key).cloned().unwrap_or_default()
}

async fn adherents(UrlQuery(params): UrlQuery<HashMap<String, String>>) -> Json<Value> {
    match param(&params, "email").as_str() {
        "eq.claire@example.org" => Json(json!([
            { "id": 7, "email": "claire@example.org", "prenom": "Claire", "nom": "Martin" }
        ])),
        "eq.nobasket@example.org" => Json(json!([{ "id": 8, "email": "nobasket@example.org" }])),
        _ => Json(json!([])),
    }
}

async fn abonnements(UrlQuery(params): UrlQuery<HashMap<String, String>>) -> Json<Value> {
    match param(&params, "adherent_id").as_str() {
        "eq.7" => Json(json!([{ "id": 70, "adherent_id": 7 }])),
        _ => Json(json!([])),
    }
}

async fn livraisons(UrlQuery(params): UrlQuery<HashMap<String, String>>) -> Json<Value> {
    match param(&params, "abonnement_id").as_str() {
        "eq.70" => Json(json!([
            { "id": 2, "abonnement_id": 70, "produit_id": 11, "created_at": "2025-03-11T08:00:00Z" },
            { "id": 1, "abonnement_id": 70, "produit_id": 10, "created_at": "2025-03-04T08:00:00Z" }
        ])),
        _ => Json(json!([])),
    }
}

async fn produits(UrlQuery(params): UrlQuery<HashMap<String, String>>) -> Json<Value> {
    match param(&params, "id").as_str() {
        "eq.10" => Json(json!([{ "id": 10, "produit": "Panier simple" }])),
        "eq.11" => Json(json!([{ "id": 11, "produit": "Panier familial" }])),
        _ => Json(json!([])),
    }
}

async fn compositions(UrlQuery(params): UrlQuery<HashMap<String, String>>) -> Json<Value> {
    match param(&params, "produit_id").as_str() {
        "eq.11" => Json(json!([
            { "produit_id": 11, "legume_id": 100 },
            { "produit_id": 11, "legume_id": 101 },
            { "produit_id": 11, "legume_id": 666 }
        ])),
        _ => Json(json!([])),
    }
}

async fn legumes(
    UrlQuery(params): UrlQuery<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    match param(&params, "id").as_str() {
        "eq.100" => Ok(Json(json!([{ "id": 100, "nom": "Poireau" }]))),
        "eq.101" => Ok(Json(json!([{ "id": 101, "nom": "Carotte" }]))),
        _ => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

async fn spawn_server() -> std::io::Result<PostgrestClient> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/adherent", get(adherents))
        .route("/abonnement", get(abonnements))
        .route("/livraison", get(livraisons))
        .route("/produit", get(produits))
        .route("/composition_produit_legume", get(compositions))
        .route("/legume", get(legumes));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    PostgrestClient::new(&format!("http://{addr}"))
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
}

#[tokio::test]
async fn login_finds_member_by_email() {
    let client = spawn_server().await.expect("spawn server");

    let member = client.login("  claire@example.org ").await.expect("login");
    assert_eq!(member.id, MemberId(7));
    assert_eq!(member.display_name(), "Claire Martin");
}

#[tokio::test]
async fn login_rejects_unknown_and_blank_emails() {
    let client = spawn_server().await.expect("spawn server");

    let unknown = client.login("ghost@example.org").await.expect_err("unknown");
    assert!(matches!(unknown, ClientError::NotFound { .. }));

    let blank = client.login("   ").await.expect_err("blank");
    assert!(matches!(blank, ClientError::InvalidInput(_)));
}

#[tokio::test]
async fn history_is_enriched_with_product_names() {
    let client = spawn_server().await.expect("spawn server");

    let history = client.delivery_history(MemberId(7)).await.expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].product_name, "Panier familial");
    assert_eq!(history[0].delivery.subscription_id, SubscriptionId(70));
    assert_eq!(history[1].product_name, "Panier simple");
}

#[tokio::test]
async fn member_without_subscription_has_empty_history() {
    let client = spawn_server().await.expect("spawn server");

    let history = client.delivery_history(MemberId(8)).await.expect("history");
    assert!(history.is_empty());
    assert!(client
        .latest_basket(MemberId(8))
        .await
        .expect("basket")
        .is_none());
    let stats = client.dashboard_stats(MemberId(8)).await.expect("stats");
    assert_eq!(stats, DashboardStats::default());
}

#[tokio::test]
async fn latest_basket_lists_composition_with_unknown_fallback() {
    let client = spawn_server().await.expect("spawn server");

    let basket = client
        .latest_basket(MemberId(7))
        .await
        .expect("basket")
        .expect("some basket");
    assert_eq!(basket.product_name, "Panier familial");
    assert_eq!(
        basket.composition,
        vec!["Poireau", "Carotte", UNKNOWN_VEGETABLE]
    );
}

#[tokio::test]
async fn dashboard_counts_deliveries() {
    let client = spawn_server().await.expect("spawn server");

    let stats = client.dashboard_stats(MemberId(7)).await.expect("stats");
    assert_eq!(stats.total_deliveries, 2);
    assert_eq!(stats.last_product_name.as_deref(), Some("Panier familial"));
    assert_eq!(
        stats.last_delivery_date.map(|d| d.to_rfc3339()),
        Some("2025-03-11T08:00:00+00:00".to_string())
    );
}

#[tokio::test]
async fn missing_product_is_not_found() {
    let client = spawn_server().await.expect("spawn server");

    let err = client.product(ProductId(404)).await.expect_err("missing");
    assert!(matches!(err, ClientError::NotFound { .. }));
}
