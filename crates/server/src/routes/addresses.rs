use std::time::Instant;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::Serialize;
use service::customer::domain::{Address, AddressChanges, NewAddress};

use super::customers::Message;
use super::ServerState;
use crate::errors::JsonApiError;
use crate::metrics;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressCreated {
    pub message: &'static str,
    pub address_id: i32,
}

#[utoipa::path(get, path = "/api/customers/{id}/addresses", tag = "addresses", params(("id" = i32, Path, description = "Customer id")),
    responses((status = 200, description = "Addresses in ascending id order", body = [crate::openapi::AddressDoc])))]
pub async fn list_addresses(
    State(state): State<ServerState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Vec<Address>>, JsonApiError> {
    let Path(customer_id) = id?;
    let started = Instant::now();
    let res = state.customers.list_addresses(customer_id).await;
    metrics::record("list_addresses", started, &res);
    Ok(Json(res?))
}

#[utoipa::path(post, path = "/api/customers/{id}/addresses", tag = "addresses", params(("id" = i32, Path, description = "Customer id")),
    request_body = crate::openapi::NewAddressDoc,
    responses((status = 201, description = "Created", body = crate::openapi::AddressCreatedDoc), (status = 400, description = "Validation error"), (status = 404, description = "Customer not found")))]
pub async fn add_address(
    State(state): State<ServerState>,
    id: Result<Path<i32>, PathRejection>,
    body: Result<Json<NewAddress>, JsonRejection>,
) -> Result<(StatusCode, Json<AddressCreated>), JsonApiError> {
    let Path(customer_id) = id?;
    let Json(input) = body?;
    let started = Instant::now();
    let res = state.customers.add_address(customer_id, input).await;
    metrics::record("add_address", started, &res);
    let created = res?;
    Ok((StatusCode::CREATED, Json(AddressCreated { message: "Address added successfully", address_id: created.id })))
}

#[utoipa::path(put, path = "/api/addresses/{id}", tag = "addresses", params(("id" = i32, Path, description = "Address id")),
    request_body = crate::openapi::AddressChangesDoc,
    responses((status = 200, description = "Updated", body = crate::openapi::MessageDoc), (status = 400, description = "Validation error"), (status = 404, description = "Not found")))]
pub async fn update_address(
    State(state): State<ServerState>,
    id: Result<Path<i32>, PathRejection>,
    body: Result<Json<AddressChanges>, JsonRejection>,
) -> Result<Json<Message>, JsonApiError> {
    let Path(id) = id?;
    let Json(changes) = body?;
    let started = Instant::now();
    let res = state.customers.update_address(id, changes).await;
    metrics::record("update_address", started, &res);
    res?;
    Ok(Json(Message { message: "Address updated successfully" }))
}

#[utoipa::path(delete, path = "/api/addresses/{id}", tag = "addresses", params(("id" = i32, Path, description = "Address id")),
    responses((status = 200, description = "Deleted", body = crate::openapi::MessageDoc), (status = 400, description = "Last remaining address"), (status = 404, description = "Not found")))]
pub async fn delete_address(
    State(state): State<ServerState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Message>, JsonApiError> {
    let Path(id) = id?;
    let started = Instant::now();
    let res = state.customers.delete_address(id).await;
    metrics::record("delete_address", started, &res);
    res?;
    Ok(Json(Message { message: "Address deleted successfully" }))
}
