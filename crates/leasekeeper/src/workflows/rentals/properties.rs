use std::io::Read;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::availability::AvailabilityResolver;
use super::commit::{commit_with_retry, Transition};
use super::domain::{Caller, ListingStatus, Property, PropertyId, Role, UserId};
use super::error::RentalError;
use super::import::PortfolioImporter;
use super::store::{find, insert, EntityStore, Predicate, Stored};
use crate::config::RulesConfig;

const LISTING_FIELDS: &[&str] = &["listing", "updated_at"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProperty {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub city: String,
    pub monthly_rent: Decimal,
    #[serde(default)]
    pub occupant_id: Option<UserId>,
}

impl NewProperty {
    fn validate(&self) -> Result<(), RentalError> {
        if self.name.trim().is_empty() {
            return Err(RentalError::validation("property name must not be empty"));
        }
        if self.address.trim().is_empty() {
            return Err(RentalError::validation(format!(
                "property {} needs an address",
                self.name
            )));
        }
        if self.monthly_rent <= Decimal::ZERO {
            return Err(RentalError::validation(format!(
                "property {} needs a positive monthly rent",
                self.name
            )));
        }
        Ok(())
    }
}

/// Conjunctive listing search. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingFilter {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub min_rent: Option<Decimal>,
    #[serde(default)]
    pub max_rent: Option<Decimal>,
    #[serde(default)]
    pub landlord_id: Option<UserId>,
    #[serde(default)]
    pub listed_only: bool,
    #[serde(default)]
    pub available_only: bool,
}

impl ListingFilter {
    fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(city) = &self.city {
            predicates.push(Predicate::eq("city", city.trim()));
        }
        if self.min_rent.is_some() || self.max_rent.is_some() {
            predicates.push(Predicate::range(
                "monthly_rent",
                self.min_rent.map(|rent| Value::String(rent.to_string())),
                self.max_rent.map(|rent| Value::String(rent.to_string())),
            ));
        }
        if let Some(landlord) = &self.landlord_id {
            predicates.push(Predicate::eq("landlord_id", landlord.as_str()));
        }
        if self.listed_only {
            predicates.push(Predicate::eq("listing", ListingStatus::Listed.label()));
        }
        predicates
    }
}

/// A property with availability derived at query time.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyListing {
    #[serde(flatten)]
    pub property: Stored<Property>,
    pub available: bool,
}

/// Landlord portfolio management and public listing search.
pub struct PropertyDirectory<S> {
    store: Arc<S>,
    availability: AvailabilityResolver<S>,
    rules: RulesConfig,
}

impl<S> PropertyDirectory<S>
where
    S: EntityStore + 'static,
{
    pub fn new(store: Arc<S>, rules: RulesConfig) -> Self {
        let availability = AvailabilityResolver::new(Arc::clone(&store));
        Self {
            store,
            availability,
            rules,
        }
    }

    pub fn register(
        &self,
        caller: &Caller,
        property: NewProperty,
    ) -> Result<Stored<Property>, RentalError> {
        require_landlord_role(caller)?;
        property.validate()?;
        self.insert_property(caller, property)
    }

    fn insert_property(
        &self,
        caller: &Caller,
        property: NewProperty,
    ) -> Result<Stored<Property>, RentalError> {
        let now = Utc::now();
        let record = Property {
            landlord_id: caller.user_id.clone(),
            occupant_id: property.occupant_id,
            name: property.name.trim().to_string(),
            address: property.address.trim().to_string(),
            city: property.city.trim().to_string(),
            monthly_rent: property.monthly_rent,
            listing: ListingStatus::Listed,
            created_at: now,
            updated_at: now,
        };

        let stored = insert(self.store.as_ref(), record)?;
        info!(
            property_id = %stored.id,
            landlord_id = %stored.record.landlord_id,
            "property registered"
        );
        Ok(stored)
    }

    /// Show or hide a property in public listings. Has no bearing on availability.
    pub fn set_listing(
        &self,
        caller: &Caller,
        property_id: &PropertyId,
        listing: ListingStatus,
    ) -> Result<Stored<Property>, RentalError> {
        commit_with_retry(
            self.store.as_ref(),
            property_id,
            self.rules.max_commit_attempts,
            |current: &Stored<Property>| {
                if !caller.is(Role::Landlord, &current.record.landlord_id) {
                    return Err(RentalError::unauthorized(format!(
                        "property {} belongs to another landlord",
                        current.id
                    )));
                }
                if current.record.listing == listing {
                    return Ok(Transition::Unchanged);
                }

                let mut record = current.record.clone();
                record.listing = listing;
                record.updated_at = Utc::now();
                Ok(Transition::Apply {
                    record,
                    fields: LISTING_FIELDS,
                })
            },
        )
    }

    pub fn search(&self, filter: &ListingFilter) -> Result<Vec<PropertyListing>, RentalError> {
        let properties = find::<Property, S>(self.store.as_ref(), &filter.predicates())?;

        let mut listings = Vec::with_capacity(properties.len());
        for property in properties {
            let available = self.availability.derive(&property.id)?.available;
            if filter.available_only && !available {
                continue;
            }
            listings.push(PropertyListing {
                property,
                available,
            });
        }
        Ok(listings)
    }

    /// Register every row of a portfolio CSV. Nothing is written unless every row parses and
    /// validates.
    pub fn import_csv<R: Read>(
        &self,
        caller: &Caller,
        reader: R,
    ) -> Result<Vec<Stored<Property>>, RentalError> {
        require_landlord_role(caller)?;
        let rows = PortfolioImporter::from_reader(reader)
            .map_err(|err| RentalError::validation(err.to_string()))?;
        for row in &rows {
            row.validate()?;
        }

        let imported = rows
            .into_iter()
            .map(|row| self.insert_property(caller, row))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            landlord_id = %caller.user_id,
            count = imported.len(),
            "portfolio imported"
        );
        Ok(imported)
    }
}

fn require_landlord_role(caller: &Caller) -> Result<(), RentalError> {
    match caller.role {
        Role::Landlord => Ok(()),
        Role::Tenant => Err(RentalError::unauthorized(
            "only landlords may register properties",
        )),
    }
}
