use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use models::{address as address_model, customer as customer_model};
use models::errors::FieldError;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::pagination::Pagination;

/// Address fields supplied on create.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct NewAddress {
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub pin_code: String,
    pub is_primary: bool,
}

impl NewAddress {
    pub fn normalized(self) -> Self {
        Self {
            address_line: self.address_line.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            pin_code: self.pin_code.trim().to_string(),
            is_primary: self.is_primary,
        }
    }

    /// Collect field errors, prefixing names with `prefix` (e.g. `addresses[1].`).
    pub fn field_errors(&self, prefix: &str) -> Vec<FieldError> {
        [
            address_model::validate_address_line(&self.address_line),
            address_model::validate_city(&self.city),
            address_model::validate_state(&self.state),
            address_model::validate_pin_code(&self.pin_code),
        ]
        .into_iter()
        .filter_map(Result::err)
        .map(|mut e| {
            e.field = format!("{prefix}{}", e.field);
            e
        })
        .collect()
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        into_result(self.field_errors(""))
    }
}

/// Customer fields plus the addresses created with it in one unit.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub addresses: Vec<NewAddress>,
}

impl NewCustomer {
    pub fn normalized(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            addresses: self.addresses.into_iter().map(NewAddress::normalized).collect(),
        }
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        let mut errors: Vec<FieldError> = [
            customer_model::validate_first_name(&self.first_name),
            customer_model::validate_last_name(&self.last_name),
            customer_model::validate_phone_number(&self.phone_number),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();
        if self.addresses.is_empty() {
            errors.push(FieldError::new("addresses", "at least one address is required"));
        }
        for (i, a) in self.addresses.iter().enumerate() {
            errors.extend(a.field_errors(&format!("addresses[{i}].")));
        }
        into_result(errors)
    }

    /// Index of the address that becomes primary: the first one flagged,
    /// otherwise the first one supplied.
    pub fn primary_index(&self) -> Option<usize> {
        if self.addresses.is_empty() {
            return None;
        }
        Some(self.addresses.iter().position(|a| a.is_primary).unwrap_or(0))
    }
}

/// Partial update of the customer's own fields.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomerChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

impl CustomerChanges {
    pub fn normalized(self) -> Self {
        Self {
            first_name: trim_opt(self.first_name),
            last_name: trim_opt(self.last_name),
            phone_number: trim_opt(self.phone_number),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.phone_number.is_none()
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.is_empty() {
            return Err(ServiceError::invalid("body", "at least one of firstName, lastName, phoneNumber is required"));
        }
        let errors = [
            self.first_name.as_deref().map(customer_model::validate_first_name),
            self.last_name.as_deref().map(customer_model::validate_last_name),
            self.phone_number.as_deref().map(customer_model::validate_phone_number),
        ]
        .into_iter()
        .flatten()
        .filter_map(Result::err)
        .collect();
        into_result(errors)
    }
}

/// Partial update of an address.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct AddressChanges {
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pin_code: Option<String>,
    pub is_primary: Option<bool>,
}

impl AddressChanges {
    pub fn normalized(self) -> Self {
        Self {
            address_line: trim_opt(self.address_line),
            city: trim_opt(self.city),
            state: trim_opt(self.state),
            pin_code: trim_opt(self.pin_code),
            is_primary: self.is_primary,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.address_line.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.pin_code.is_none()
            && self.is_primary.is_none()
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.is_empty() {
            return Err(ServiceError::invalid("body", "no address fields supplied"));
        }
        let errors = [
            self.address_line.as_deref().map(address_model::validate_address_line),
            self.city.as_deref().map(address_model::validate_city),
            self.state.as_deref().map(address_model::validate_state),
            self.pin_code.as_deref().map(address_model::validate_pin_code),
        ]
        .into_iter()
        .flatten()
        .filter_map(Result::err)
        .collect();
        into_result(errors)
    }

    pub fn apply_to(&self, a: &mut Address) {
        if let Some(v) = &self.address_line { a.address_line = v.clone(); }
        if let Some(v) = &self.city { a.city = v.clone(); }
        if let Some(v) = &self.state { a.state = v.clone(); }
        if let Some(v) = &self.pin_code { a.pin_code = v.clone(); }
        if let Some(v) = self.is_primary { a.is_primary = v; }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
}

impl From<customer_model::Model> for Customer {
    fn from(m: customer_model::Model) -> Self {
        Self {
            id: m.id,
            first_name: m.first_name,
            last_name: m.last_name,
            phone_number: m.phone_number,
            created_at: m.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: i32,
    pub customer_id: i32,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub pin_code: String,
    pub is_primary: bool,
}

impl From<address_model::Model> for Address {
    fn from(m: address_model::Model) -> Self {
        Self {
            id: m.id,
            customer_id: m.customer_id,
            address_line: m.address_line,
            city: m.city,
            state: m.state,
            pin_code: m.pin_code,
            is_primary: m.is_primary,
        }
    }
}

/// A customer with its addresses in ascending id order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    #[serde(flatten)]
    pub customer: Customer,
    pub addresses: Vec<Address>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    Id,
    FirstName,
    LastName,
    PhoneNumber,
    CreatedAt,
}

impl FromStr for SortField {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "id" => Ok(Self::Id),
            "firstName" | "first_name" => Ok(Self::FirstName),
            "lastName" | "last_name" => Ok(Self::LastName),
            "phoneNumber" | "phone_number" => Ok(Self::PhoneNumber),
            "createdAt" | "created_at" => Ok(Self::CreatedAt),
            other => Err(FieldError::new(
                "sortBy",
                format!("unknown sort field `{other}` (expected id, firstName, lastName, phoneNumber or createdAt)"),
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(FieldError::new("sortOrder", format!("unknown sort order `{other}` (expected asc or desc)"))),
        }
    }
}

/// Case-insensitive substring filters applied to a customer's addresses.
/// Fields are stored lowercased; blank values are dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddressFilter {
    pub city: Option<String>,
    pub state: Option<String>,
    pub pin_code: Option<String>,
}

impl AddressFilter {
    pub fn new(city: Option<&str>, state: Option<&str>, pin_code: Option<&str>) -> Self {
        let norm = |v: Option<&str>| {
            v.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty())
        };
        Self { city: norm(city), state: norm(state), pin_code: norm(pin_code) }
    }

    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.state.is_none() && self.pin_code.is_none()
    }

    /// True when the address matches every supplied filter.
    pub fn matches(&self, a: &Address) -> bool {
        self.matches_fields(&a.city, &a.state, &a.pin_code)
    }

    /// Case-insensitive substring match with Unicode lowercasing. Every
    /// backend filters through here so results agree on non-ASCII text.
    pub fn matches_fields(&self, city: &str, state: &str, pin_code: &str) -> bool {
        let hit = |needle: &Option<String>, hay: &str| match needle {
            Some(n) => hay.to_lowercase().contains(n.as_str()),
            None => true,
        };
        hit(&self.city, city) && hit(&self.state, state) && hit(&self.pin_code, pin_code)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CustomerQuery {
    pub pagination: Pagination,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub filter: AddressFilter,
}

impl CustomerQuery {
    /// Total order used by list operations: the sort field, then id in the
    /// same direction.
    pub fn compare(&self, a: &Customer, b: &Customer) -> Ordering {
        let primary = match self.sort_by {
            SortField::Id => Ordering::Equal,
            SortField::FirstName => a.first_name.cmp(&b.first_name),
            SortField::LastName => a.last_name.cmp(&b.last_name),
            SortField::PhoneNumber => a.phone_number.cmp(&b.phone_number),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        let ord = primary.then(a.id.cmp(&b.id));
        match self.sort_order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

fn trim_opt(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string())
}

fn into_result(errors: Vec<FieldError>) -> Result<(), ServiceError> {
    if errors.is_empty() { Ok(()) } else { Err(ServiceError::Validation(errors)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(city: &str, primary: bool) -> NewAddress {
        NewAddress {
            address_line: "1 Main St".into(),
            city: city.into(),
            state: "MA".into(),
            pin_code: "021080".into(),
            is_primary: primary,
        }
    }

    #[test]
    fn primary_index_defaults_to_first() {
        let c = NewCustomer { addresses: vec![addr("A", false), addr("B", false)], ..Default::default() };
        assert_eq!(c.primary_index(), Some(0));
    }

    #[test]
    fn primary_index_picks_first_flagged() {
        let c = NewCustomer {
            addresses: vec![addr("A", false), addr("B", true), addr("C", true)],
            ..Default::default()
        };
        assert_eq!(c.primary_index(), Some(1));
        assert_eq!(NewCustomer::default().primary_index(), None);
    }

    #[test]
    fn new_customer_reports_every_bad_field() {
        let mut bad = addr("", false);
        bad.pin_code = "12".into();
        let c = NewCustomer {
            first_name: " ".into(),
            last_name: "B".into(),
            phone_number: "123".into(),
            addresses: vec![addr("Boston", false), bad],
        };
        let Err(ServiceError::Validation(errs)) = c.validate() else { panic!("expected validation error") };
        let fields: Vec<_> = errs.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["firstName", "phoneNumber", "addresses[1].city", "addresses[1].pinCode"]);
    }

    #[test]
    fn new_customer_requires_an_address() {
        let c = NewCustomer {
            first_name: "A".into(),
            last_name: "B".into(),
            phone_number: "1111111111".into(),
            addresses: vec![],
        };
        let Err(ServiceError::Validation(errs)) = c.validate() else { panic!("expected validation error") };
        assert_eq!(errs[0].field, "addresses");
    }

    #[test]
    fn missing_json_fields_become_validation_errors() {
        let c: NewCustomer = serde_json::from_str(r#"{"firstName":"A"}"#).unwrap();
        assert!(matches!(c.validate(), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn normalized_trims_text() {
        let c = NewCustomer {
            first_name: "  Ada ".into(),
            last_name: "L".into(),
            phone_number: " 1111111111".into(),
            addresses: vec![NewAddress { city: " Boston ".into(), ..addr("x", false) }],
        }
        .normalized();
        assert_eq!(c.first_name, "Ada");
        assert_eq!(c.phone_number, "1111111111");
        assert_eq!(c.addresses[0].city, "Boston");
    }

    #[test]
    fn changes_require_a_field() {
        assert!(CustomerChanges::default().validate().is_err());
        assert!(AddressChanges::default().validate().is_err());
        let ok = CustomerChanges { phone_number: Some("2222222222".into()), ..Default::default() };
        assert!(ok.validate().is_ok());
        let bad = AddressChanges { pin_code: Some("abc".into()), ..Default::default() };
        assert!(bad.validate().is_err());
        let primary_only = AddressChanges { is_primary: Some(true), ..Default::default() };
        assert!(primary_only.validate().is_ok());
    }

    #[test]
    fn sort_params_parse() {
        assert_eq!("createdAt".parse::<SortField>().unwrap(), SortField::CreatedAt);
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert_eq!("age".parse::<SortField>().unwrap_err().field, "sortBy");
        assert!("sideways".parse::<SortOrder>().is_err());
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let f = AddressFilter::new(Some("boston"), None, Some(" 021 "));
        let a = Address {
            id: 1,
            customer_id: 1,
            address_line: "x".into(),
            city: "South BOSTON".into(),
            state: "MA".into(),
            pin_code: "021080".into(),
            is_primary: true,
        };
        assert!(f.matches(&a));
        assert!(!AddressFilter::new(Some("cambridge"), None, None).matches(&a));
        assert!(AddressFilter::new(Some("  "), None, None).is_empty());
    }

    #[test]
    fn compare_breaks_ties_on_id_in_sort_direction() {
        let now = Utc::now();
        let c = |id: i32, name: &str| Customer {
            id,
            first_name: name.into(),
            last_name: "x".into(),
            phone_number: format!("{id:010}"),
            created_at: now,
        };
        let q = CustomerQuery { sort_by: SortField::FirstName, sort_order: SortOrder::Desc, ..Default::default() };
        let mut v = vec![c(1, "a"), c(2, "b"), c(3, "b")];
        v.sort_by(|a, b| q.compare(a, b));
        assert_eq!(v.iter().map(|c| c.id).collect::<Vec<_>>(), [3, 2, 1]);
    }
}
