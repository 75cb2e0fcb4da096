use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::customer;
use crate::errors::{require_digits, require_text, FieldError};

pub const PIN_CODE_DIGITS: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "address")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub customer_id: i32,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub pin_code: String,
    pub is_primary: bool,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Customer,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Customer => Entity::belongs_to(customer::Entity)
                .from(Column::CustomerId)
                .to(customer::Column::Id)
                .into(),
        }
    }
}

impl Related<customer::Entity> for Entity {
    fn to() -> RelationDef { Relation::Customer.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_address_line(v: &str) -> Result<(), FieldError> { require_text("addressLine", v) }

pub fn validate_city(v: &str) -> Result<(), FieldError> { require_text("city", v) }

pub fn validate_state(v: &str) -> Result<(), FieldError> { require_text("state", v) }

pub fn validate_pin_code(v: &str) -> Result<(), FieldError> {
    require_digits("pinCode", v, PIN_CODE_DIGITS)
}
