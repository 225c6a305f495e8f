//! Shop profile service for the current seller.
//!
//! DESIGN
//! ======
//! A seller owns at most one shop in practice, but the API lists them, so
//! [`PetShopService::my_shop`] takes the first entry. Input is validated in
//! the same three groups the setup wizard uses (basic info, location,
//! services and hours) before anything is sent.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ServiceError, ValidationError, check_email, require, resource_path};
use crate::client::ApiClient;
use crate::types::{PetShop, PetShopCategory};

pub const MY_SHOPS_ENDPOINT: &str = "/api/v1/petshops/mine";
pub const SHOPS_ENDPOINT: &str = "/api/v1/petshops";

/// Kuala Lumpur city centre; used until the seller picks a location.
pub const DEFAULT_LATITUDE: f64 = 3.139;
pub const DEFAULT_LONGITUDE: f64 = 101.6869;

/// Services offered in the setup wizard.
pub const SERVICE_OPTIONS: [&str; 8] = [
    "Grooming",
    "Vaccination",
    "Pet Boarding",
    "Pet Food",
    "Accessories",
    "Health Check",
    "Training",
    "Surgery",
];

/// Body for creating or updating a shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetShopInput {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub category: Option<PetShopCategory>,
    #[serde(default)]
    pub description: String,
    pub address: String,
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    #[serde(default = "default_longitude")]
    pub longitude: f64,
    #[serde(default)]
    pub services: Vec<String>,
    pub opening_hours: String,
}

fn default_latitude() -> f64 {
    DEFAULT_LATITUDE
}

fn default_longitude() -> f64 {
    DEFAULT_LONGITUDE
}

impl Default for PetShopInput {
    fn default() -> Self {
        Self {
            name: String::new(),
            phone: String::new(),
            email: String::new(),
            category: None,
            description: String::new(),
            address: String::new(),
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            services: Vec::new(),
            opening_hours: String::new(),
        }
    }
}

impl From<&PetShop> for PetShopInput {
    fn from(shop: &PetShop) -> Self {
        Self {
            name: shop.name.clone(),
            phone: shop.phone.clone(),
            email: shop.email.clone(),
            category: Some(shop.category),
            description: shop.description.clone(),
            address: shop.address.clone(),
            latitude: shop.latitude,
            longitude: shop.longitude,
            services: shop.services.clone(),
            opening_hours: shop.opening_hours.clone(),
        }
    }
}

impl PetShopInput {
    /// # Errors
    ///
    /// Returns the first missing or malformed field, checked in wizard order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.name, "name")?;
        require(&self.phone, "phone")?;
        check_email(&self.email)?;
        if self.category.is_none() {
            return Err(ValidationError::MissingField { field: "category" });
        }
        require(&self.address, "address")?;
        if !self.services.iter().any(|s| !s.trim().is_empty()) {
            return Err(ValidationError::NoServices);
        }
        require(&self.opening_hours, "opening hours")
    }

    /// Add `service` if absent, remove it if present.
    pub fn toggle_service(&mut self, service: &str) {
        if let Some(idx) = self.services.iter().position(|s| s == service) {
            self.services.remove(idx);
        } else {
            self.services.push(service.to_owned());
        }
    }
}

#[derive(Debug, Clone)]
pub struct PetShopService {
    client: ApiClient,
}

impl PetShopService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// See [`ApiClient::get`].
    pub async fn my_shops(&self) -> Result<Vec<PetShop>, ServiceError> {
        Ok(self.client.get(MY_SHOPS_ENDPOINT).await?)
    }

    /// The seller's shop, or `None` before setup.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`].
    pub async fn my_shop(&self) -> Result<Option<PetShop>, ServiceError> {
        Ok(self.my_shops().await?.into_iter().next())
    }

    /// # Errors
    ///
    /// Fails on invalid input (nothing sent) or a refused request.
    pub async fn create_shop(&self, input: &PetShopInput) -> Result<PetShop, ServiceError> {
        input.validate()?;
        let shop: PetShop = self.client.post(SHOPS_ENDPOINT, input).await?;
        info!(shop_id = %shop.id, "shop created");
        Ok(shop)
    }

    /// # Errors
    ///
    /// Fails on invalid input (nothing sent) or a refused request.
    pub async fn update_shop(&self, id: &str, input: &PetShopInput) -> Result<PetShop, ServiceError> {
        input.validate()?;
        let shop: PetShop = self.client.put(&shop_path(id)?, input).await?;
        info!(shop_id = %shop.id, "shop updated");
        Ok(shop)
    }

    /// # Errors
    ///
    /// See [`ApiClient::send_discarding`].
    pub async fn delete_shop(&self, id: &str) -> Result<(), ServiceError> {
        self.client.send_discarding(Method::DELETE, &shop_path(id)?).await?;
        info!(shop_id = %id, "shop deleted");
        Ok(())
    }
}

fn shop_path(id: &str) -> Result<String, ValidationError> {
    resource_path(SHOPS_ENDPOINT, &[id])
}

#[cfg(test)]
#[path = "petshop_test.rs"]
mod tests;
