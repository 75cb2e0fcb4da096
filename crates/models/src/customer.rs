use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::address;
use crate::errors::{require_digits, require_text, FieldError};

pub const PHONE_DIGITS: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(unique)]
    pub phone_number: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Address,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self { Relation::Address => Entity::has_many(address::Entity).into() }
    }
}

impl Related<address::Entity> for Entity {
    fn to() -> RelationDef { Relation::Address.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_first_name(v: &str) -> Result<(), FieldError> { require_text("firstName", v) }

pub fn validate_last_name(v: &str) -> Result<(), FieldError> { require_text("lastName", v) }

pub fn validate_phone_number(v: &str) -> Result<(), FieldError> {
    require_digits("phoneNumber", v, PHONE_DIGITS)
}
