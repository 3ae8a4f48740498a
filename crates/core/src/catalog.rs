//! Static table of ERP resources the assistant may read or write.
//!
//! Adding a resource is a data-only change: append an [`EndpointDefinition`] and,
//! if it needs typed decoding, register a decoder in the gateway.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::domain::routing::Category;

/// Query parameters accepted on every resource regardless of its field allow-list.
pub const CONTROL_PARAMS: &[&str] = &["is_skip_pagination", "page", "per_page", "sort", "search"];

const DEFAULT_PARAMS: &[(&str, &str)] = &[("is_skip_pagination", "true")];

/// Prompt family used to translate natural-language filters into query parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleSet {
    Contacts,
    SalesInvoices,
    PurchaseInvoices,
    Products,
    /// Date-filter grammar only.
    Generic,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointDefinition {
    pub resource: &'static str,
    pub category: Category,
    pub description: &'static str,
    pub default_params: &'static [(&'static str, &'static str)],
    pub allowed_fields: &'static [&'static str],
    /// Top-level body keys a write may carry. Empty for read-only resources.
    pub writable_fields: &'static [&'static str],
    pub cache_ttl: Duration,
    pub rule_set: Option<RuleSet>,
}

impl EndpointDefinition {
    pub fn default_params(&self) -> BTreeMap<String, String> {
        self.default_params
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    pub fn supports_date_filter(&self) -> bool {
        self.allowed_fields.contains(&"date")
    }

    /// Whether `key` (e.g. `date[$gte]`, `customer.name`) may be sent to this resource.
    pub fn accepts_param(&self, key: &str) -> bool {
        let base = key.split('[').next().unwrap_or(key).trim();
        if base.is_empty() {
            return false;
        }
        CONTROL_PARAMS.contains(&base) || self.allowed_fields.contains(&base)
    }

    pub fn accepts_write_field(&self, key: &str) -> bool {
        self.writable_fields.contains(&key.trim())
    }
}

#[derive(Clone, Debug)]
pub struct EndpointCatalog {
    endpoints: Vec<EndpointDefinition>,
}

impl Default for EndpointCatalog {
    fn default() -> Self {
        Self::new(standard_endpoints())
    }
}

impl EndpointCatalog {
    pub fn new(endpoints: Vec<EndpointDefinition>) -> Self {
        Self { endpoints }
    }

    pub fn get(&self, resource: &str) -> Option<&EndpointDefinition> {
        let resource = resource.trim().trim_matches('/');
        self.endpoints.iter().find(|endpoint| endpoint.resource == resource)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointDefinition> {
        self.endpoints.iter()
    }

    /// Canonical resource that receives writes for a write-eligible category.
    pub fn write_target(&self, category: Category) -> Option<&EndpointDefinition> {
        let resource = match category {
            Category::Contact => "contacts",
            Category::Product => "products",
            _ => return None,
        };
        self.get(resource)
    }

    pub fn cache_ttl(&self, resource: &str) -> Option<Duration> {
        self.get(resource).map(|endpoint| endpoint.cache_ttl)
    }

    /// One line per endpoint, for embedding in the classifier instruction.
    pub fn prompt_listing(&self) -> String {
        self.endpoints
            .iter()
            .map(|endpoint| format!("- {}: {}", endpoint.resource, endpoint.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn standard_endpoints() -> Vec<EndpointDefinition> {
    vec![
        EndpointDefinition {
            resource: "contacts",
            category: Category::Contact,
            description: "Customer, Vendor, Employee queries",
            default_params: DEFAULT_PARAMS,
            allowed_fields: &[
                "name",
                "note",
                "national_id_number",
                "tax_id_number",
                "is_customer",
                "is_supplier",
                "is_employee",
                "is_salesman",
                "is_active",
                "customer_category.name",
            ],
            writable_fields: &[
                "code",
                "name",
                "note",
                "national_id_number",
                "tax_id_number",
                "tax_id_address",
                "is_customer",
                "is_supplier",
                "is_employee",
                "is_salesman",
                "is_active",
                "customer_category",
                "address",
                "addresses",
                "phone",
                "phones",
                "email",
                "emails",
            ],
            cache_ttl: Duration::from_secs(600),
            rule_set: Some(RuleSet::Contacts),
        },
        EndpointDefinition {
            resource: "sales_invoices",
            category: Category::Sales,
            description: "Sales Invoice queries",
            default_params: DEFAULT_PARAMS,
            allowed_fields: &[
                "customer.name",
                "payment_status",
                "date",
                "time",
                "number",
                "description",
                "currency.name",
                "subtotal",
                "total_discount",
                "subtotal_before_tax",
                "total_tax",
                "total_cash_amount",
                "total_amount",
                "total_payment",
                "includes",
            ],
            writable_fields: &[],
            cache_ttl: Duration::from_secs(300),
            rule_set: Some(RuleSet::SalesInvoices),
        },
        EndpointDefinition {
            resource: "products",
            category: Category::Product,
            description: "Product queries",
            default_params: DEFAULT_PARAMS,
            allowed_fields: &[
                "code",
                "name",
                "description",
                "category.name",
                "catalog.name",
                "quantity.on_hand",
                "quantity.on_order",
                "quantity.on_hold",
                "unit_price_gross",
                "unit_price",
                "unit_cogs",
            ],
            writable_fields: &[
                "code",
                "name",
                "description",
                "category",
                "catalog",
                "unit",
                "price",
                "unit_price",
                "unit_price_gross",
                "unit_cogs",
                "is_active",
            ],
            cache_ttl: Duration::from_secs(600),
            rule_set: Some(RuleSet::Products),
        },
        EndpointDefinition {
            resource: "purchases_invoices",
            category: Category::Purchase,
            description: "Purchase Invoice queries",
            default_params: DEFAULT_PARAMS,
            allowed_fields: &["description", "date", "time", "number", "note", "total_amount"],
            writable_fields: &[],
            cache_ttl: Duration::from_secs(300),
            rule_set: Some(RuleSet::PurchaseInvoices),
        },
        EndpointDefinition {
            resource: "dashboards/profit_loss_simple",
            category: Category::Dashboard,
            description: "Profit and loss queries",
            default_params: &[],
            allowed_fields: &["date"],
            writable_fields: &[],
            cache_ttl: Duration::from_secs(120),
            rule_set: None,
        },
        EndpointDefinition {
            resource: "dashboards/balance_sheet_simple",
            category: Category::Dashboard,
            description: "Balance sheet queries",
            default_params: &[],
            allowed_fields: &["date"],
            writable_fields: &[],
            cache_ttl: Duration::from_secs(120),
            rule_set: None,
        },
        EndpointDefinition {
            resource: "dashboards/daily_sales",
            category: Category::Dashboard,
            description: "Daily sales data queries",
            default_params: &[],
            allowed_fields: &["date"],
            writable_fields: &[],
            cache_ttl: Duration::from_secs(120),
            rule_set: Some(RuleSet::Generic),
        },
    ]
}
