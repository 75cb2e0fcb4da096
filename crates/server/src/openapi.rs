use serde::Serialize;
use utoipa::{IntoParams, OpenApi, ToSchema};

// Documentation mirrors of the wire types; the handlers serialize the
// service crate's own structs.

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
    pub storage_status: String,
    pub version: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAddressDoc {
    pub address_line: String,
    pub city: String,
    pub state: String,
    /// Exactly 6 digits
    pub pin_code: String,
    #[schema(default = false)]
    pub is_primary: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomerDoc {
    pub first_name: String,
    pub last_name: String,
    /// Exactly 10 digits, unique
    pub phone_number: String,
    /// At least one. The first flagged address (else the first one) becomes primary.
    pub addresses: Vec<NewAddressDoc>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerChangesDoc {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressChangesDoc {
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pin_code: Option<String>,
    pub is_primary: Option<bool>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressDoc {
    pub id: i32,
    pub customer_id: i32,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub pin_code: String,
    pub is_primary: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetailsDoc {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    /// RFC 3339 timestamp
    pub created_at: String,
    pub addresses: Vec<AddressDoc>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMetaDoc {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Serialize, ToSchema)]
pub struct CustomerListDoc {
    pub customers: Vec<CustomerDetailsDoc>,
    pub pagination: PageMetaDoc,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCreatedDoc {
    pub message: String,
    pub customer_id: i32,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressCreatedDoc {
    pub message: String,
    pub address_id: i32,
}

#[derive(Serialize, ToSchema)]
pub struct MessageDoc {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SingleAddressDoc {
    pub has_only_one_address: bool,
}

#[derive(IntoParams)]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ListCustomersParamsDoc {
    /// 1-based page, default 1
    pub page: Option<u32>,
    /// Page size, default 10, clamped to 1..=100
    pub limit: Option<u32>,
    /// id | firstName | lastName | phoneNumber | createdAt
    pub sort_by: Option<String>,
    /// asc | desc
    pub sort_order: Option<String>,
    /// Case-insensitive substring of any address's city
    pub city: Option<String>,
    pub state: Option<String>,
    pub pin_code: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::customers::create_customer,
        crate::routes::customers::list_customers,
        crate::routes::customers::get_customer,
        crate::routes::customers::update_customer,
        crate::routes::customers::delete_customer,
        crate::routes::customers::is_single_address,
        crate::routes::addresses::list_addresses,
        crate::routes::addresses::add_address,
        crate::routes::addresses::update_address,
        crate::routes::addresses::delete_address,
    ),
    components(
        schemas(
            HealthResponse,
            NewAddressDoc,
            NewCustomerDoc,
            CustomerChangesDoc,
            AddressChangesDoc,
            AddressDoc,
            CustomerDetailsDoc,
            PageMetaDoc,
            CustomerListDoc,
            CustomerCreatedDoc,
            AddressCreatedDoc,
            MessageDoc,
            SingleAddressDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "customers"),
        (name = "addresses")
    )
)]
pub struct ApiDoc;
