use std::time::Instant;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use models::errors::FieldError;
use serde::{Deserialize, Serialize};
use service::customer::domain::{
    AddressFilter, CustomerChanges, CustomerDetails, CustomerQuery, NewCustomer, SortField, SortOrder,
};
use service::pagination::{PageMeta, Pagination, DEFAULT_LIMIT};

use super::ServerState;
use crate::errors::JsonApiError;
use crate::metrics;

/// Raw list query. Values are kept as strings so malformed numbers are
/// reported per field instead of as an opaque rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCustomersParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pin_code: Option<String>,
}

fn parse_number(field: &str, raw: Option<&str>, default: u32) -> Result<u32, FieldError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(s) => s
            .parse::<u32>()
            .map_err(|_| FieldError::new(field, format!("{field} must be a non-negative integer"))),
    }
}

impl ListCustomersParams {
    pub fn into_query(self) -> Result<CustomerQuery, Vec<FieldError>> {
        let mut errors = Vec::new();
        let page = parse_number("page", self.page.as_deref(), 1).unwrap_or_else(|e| {
            errors.push(e);
            1
        });
        let limit = parse_number("limit", self.limit.as_deref(), DEFAULT_LIMIT).unwrap_or_else(|e| {
            errors.push(e);
            DEFAULT_LIMIT
        });
        let sort_by = match self.sort_by.as_deref().filter(|s| !s.trim().is_empty()) {
            None => SortField::default(),
            Some(s) => s.parse().unwrap_or_else(|e| {
                errors.push(e);
                SortField::default()
            }),
        };
        let sort_order = match self.sort_order.as_deref().filter(|s| !s.trim().is_empty()) {
            None => SortOrder::default(),
            Some(s) => s.parse().unwrap_or_else(|e| {
                errors.push(e);
                SortOrder::default()
            }),
        };
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(CustomerQuery {
            pagination: Pagination { page, limit },
            sort_by,
            sort_order,
            filter: AddressFilter::new(self.city.as_deref(), self.state.as_deref(), self.pin_code.as_deref()),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CustomerList {
    pub customers: Vec<CustomerDetails>,
    pub pagination: PageMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCreated {
    pub message: &'static str,
    pub customer_id: i32,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleAddress {
    pub has_only_one_address: bool,
}

#[utoipa::path(post, path = "/api/customers", tag = "customers", request_body = crate::openapi::NewCustomerDoc,
    responses((status = 201, description = "Created", body = crate::openapi::CustomerCreatedDoc), (status = 400, description = "Validation error or duplicate phone number")))]
pub async fn create_customer(
    State(state): State<ServerState>,
    body: Result<Json<NewCustomer>, JsonRejection>,
) -> Result<(StatusCode, Json<CustomerCreated>), JsonApiError> {
    let Json(input) = body?;
    let started = Instant::now();
    let res = state.customers.create_customer(input).await;
    metrics::record("create_customer", started, &res);
    let customer_id = res?;
    Ok((StatusCode::CREATED, Json(CustomerCreated { message: "Customer created successfully", customer_id })))
}

#[utoipa::path(get, path = "/api/customers", tag = "customers", params(crate::openapi::ListCustomersParamsDoc),
    responses((status = 200, description = "One page of customers", body = crate::openapi::CustomerListDoc), (status = 400, description = "Malformed query")))]
pub async fn list_customers(
    State(state): State<ServerState>,
    params: Result<Query<ListCustomersParams>, QueryRejection>,
) -> Result<Json<CustomerList>, JsonApiError> {
    let Query(params) = params?;
    let query = params.into_query().map_err(JsonApiError::validation)?;
    let started = Instant::now();
    let res = state.customers.list_customers(&query).await;
    metrics::record("list_customers", started, &res);
    let page = res?;
    Ok(Json(CustomerList { customers: page.items, pagination: page.meta }))
}

#[utoipa::path(get, path = "/api/customers/{id}", tag = "customers", params(("id" = i32, Path, description = "Customer id")),
    responses((status = 200, description = "Customer with addresses", body = crate::openapi::CustomerDetailsDoc), (status = 404, description = "Not found")))]
pub async fn get_customer(
    State(state): State<ServerState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<CustomerDetails>, JsonApiError> {
    let Path(id) = id?;
    let started = Instant::now();
    let res = state.customers.get_customer(id).await;
    metrics::record("get_customer", started, &res);
    Ok(Json(res?))
}

#[utoipa::path(put, path = "/api/customers/{id}", tag = "customers", params(("id" = i32, Path, description = "Customer id")),
    request_body = crate::openapi::CustomerChangesDoc,
    responses((status = 200, description = "Updated", body = crate::openapi::MessageDoc), (status = 400, description = "Validation error or duplicate phone number"), (status = 404, description = "Not found")))]
pub async fn update_customer(
    State(state): State<ServerState>,
    id: Result<Path<i32>, PathRejection>,
    body: Result<Json<CustomerChanges>, JsonRejection>,
) -> Result<Json<Message>, JsonApiError> {
    let Path(id) = id?;
    let Json(changes) = body?;
    let started = Instant::now();
    let res = state.customers.update_customer(id, changes).await;
    metrics::record("update_customer", started, &res);
    res?;
    Ok(Json(Message { message: "Customer updated successfully" }))
}

#[utoipa::path(delete, path = "/api/customers/{id}", tag = "customers", params(("id" = i32, Path, description = "Customer id")),
    responses((status = 200, description = "Deleted with all addresses", body = crate::openapi::MessageDoc), (status = 404, description = "Not found")))]
pub async fn delete_customer(
    State(state): State<ServerState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Message>, JsonApiError> {
    let Path(id) = id?;
    let started = Instant::now();
    let res = state.customers.delete_customer(id).await;
    metrics::record("delete_customer", started, &res);
    res?;
    Ok(Json(Message { message: "Customer deleted successfully" }))
}

#[utoipa::path(get, path = "/api/customers/{id}/isSingleAddress", tag = "customers", params(("id" = i32, Path, description = "Customer id")),
    responses((status = 200, description = "Whether the customer has exactly one address", body = crate::openapi::SingleAddressDoc)))]
pub async fn is_single_address(
    State(state): State<ServerState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<SingleAddress>, JsonApiError> {
    let Path(id) = id?;
    let started = Instant::now();
    let res = state.customers.is_single_address(id).await;
    metrics::record("is_single_address", started, &res);
    Ok(Json(SingleAddress { has_only_one_address: res? }))
}
