//! Form payloads and the checks run before anything reaches the backend.
//!
//! Errors are keyed by the backend's field names so that local and remote
//! validation messages land in the same place on the page.

use bourse_api::{
    FieldErrors, LoginRequest, NewStock, NewStockExchange, PriceUpdate, RegisterRequest,
    StockExchangeUpdate,
};
use serde::Deserialize;

pub const INVALID_PRICE: &str = "Please enter a valid price greater than 0";
const MAX_TEXT_LEN: usize = 30;

fn required(errors: &mut FieldErrors, field: &str, value: &str, message: &str) -> bool {
    if value.trim().is_empty() {
        errors.insert(field.to_string(), message.to_string());
        return false;
    }
    true
}

fn length_between(
    errors: &mut FieldErrors,
    field: &str,
    value: &str,
    min: usize,
    max: usize,
    label: &str,
) {
    let len = value.trim().chars().count();
    if len < min {
        errors.insert(
            field.to_string(),
            format!("{label} must be at least {min} characters long"),
        );
    } else if len > max {
        errors.insert(
            field.to_string(),
            format!("{label} must be at most {max} characters long"),
        );
    }
}

fn finish<T>(errors: FieldErrors, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
    if errors.is_empty() {
        Ok(value())
    } else {
        Err(errors)
    }
}

/// Checkbox semantics: present with any value other than "false"/"off".
fn checked(value: Option<&str>) -> bool {
    value.is_some_and(|v| !matches!(v, "false" | "off" | ""))
}

// ============================================================================
// Stocks
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub current_price: String,
}

impl StockForm {
    pub fn validate(&self) -> Result<NewStock, FieldErrors> {
        let mut errors = FieldErrors::new();

        if required(&mut errors, "name", &self.name, "Name is mandatory") {
            length_between(&mut errors, "name", &self.name, 1, MAX_TEXT_LEN, "Name");
        }
        if required(
            &mut errors,
            "description",
            &self.description,
            "Description is mandatory",
        ) {
            length_between(
                &mut errors,
                "description",
                &self.description,
                1,
                MAX_TEXT_LEN,
                "Description",
            );
        }

        let price = match self.current_price.trim().parse::<f64>() {
            Ok(price) if price.is_finite() && price >= 0.0 => price,
            Ok(_) => {
                errors.insert(
                    "currentPrice".into(),
                    "Price must equal or be more than zero".into(),
                );
                0.0
            }
            Err(_) => {
                errors.insert("currentPrice".into(), "Price is mandatory".into());
                0.0
            }
        };

        finish(errors, || NewStock {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            current_price: price,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceForm {
    #[serde(default)]
    pub current_price: String,
}

impl PriceForm {
    pub fn validate(&self) -> Result<PriceUpdate, FieldErrors> {
        match self.current_price.trim().parse::<f64>() {
            Ok(price) if price.is_finite() && price > 0.0 => Ok(PriceUpdate {
                current_price: price,
            }),
            _ => Err(FieldErrors::from([(
                "currentPrice".to_string(),
                INVALID_PRICE.to_string(),
            )])),
        }
    }
}

// ============================================================================
// Stock exchanges
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExchangeForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ExchangeForm {
    pub fn validate(&self) -> Result<NewStockExchange, FieldErrors> {
        let mut errors = FieldErrors::new();

        if required(&mut errors, "name", &self.name, "name is mandatory") {
            length_between(&mut errors, "name", &self.name, 1, MAX_TEXT_LEN, "name");
        }
        if required(
            &mut errors,
            "description",
            &self.description,
            "description is mandatory",
        ) {
            length_between(
                &mut errors,
                "description",
                &self.description,
                3,
                MAX_TEXT_LEN,
                "description",
            );
        }

        finish(errors, || NewStockExchange {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExchangeUpdateForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Checkbox; absent when unchecked
    #[serde(default)]
    pub live_in_market: Option<String>,
}

impl ExchangeUpdateForm {
    pub fn validate(&self) -> Result<StockExchangeUpdate, FieldErrors> {
        let mut errors = FieldErrors::new();
        required(&mut errors, "name", &self.name, "name is mandatory");
        required(
            &mut errors,
            "description",
            &self.description,
            "description is mandatory",
        );

        finish(errors, || StockExchangeUpdate {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            live_in_market: checked(self.live_in_market.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddListingForm {
    #[serde(default)]
    pub stock_id: String,
}

impl AddListingForm {
    pub fn validate(&self) -> Result<i64, FieldErrors> {
        match self.stock_id.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(FieldErrors::from([(
                "stockId".to_string(),
                "Please enter a valid stock id".to_string(),
            )])),
        }
    }
}

/// Checked rows of the stocks-in-exchange table, sent as repeated
/// `stock_ids` fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoveListingsForm {
    #[serde(default)]
    pub stock_ids: Vec<i64>,
}

// ============================================================================
// Authentication
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Where to go after logging in
    #[serde(default)]
    pub from: Option<String>,
}

impl LoginForm {
    pub fn validate(&self) -> Result<LoginRequest, FieldErrors> {
        let mut errors = FieldErrors::new();
        required(&mut errors, "email", &self.email, "Email is required");
        required(&mut errors, "password", &self.password, "Password is required");

        finish(errors, || LoginRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<RegisterRequest, FieldErrors> {
        let mut errors = FieldErrors::new();
        let fields = [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("email", &self.email),
            ("password", &self.password),
            ("confirmPassword", &self.confirm_password),
        ];
        for (field, value) in fields {
            required(&mut errors, field, value, "All fields are required");
        }

        if !self.password.is_empty()
            && !self.confirm_password.is_empty()
            && self.password != self.confirm_password
        {
            errors.insert(
                "confirmPassword".to_string(),
                "Passwords do not match".to_string(),
            );
        }

        finish(errors, || RegisterRequest {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        })
    }
}
