use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Query category the classifier assigns to a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Contact,
    Product,
    Sales,
    Purchase,
    Dashboard,
    None,
}

impl Category {
    /// Maps the free-form label a model emits (English or Indonesian) to a category.
    pub fn from_label(raw: &str) -> Self {
        match normalize_label(raw).as_str() {
            "contact" | "contacts" | "kontak" | "customer" | "customers" | "pelanggan"
            | "supplier" | "suppliers" | "vendor" | "pemasok" | "employee" | "employees"
            | "karyawan" | "pegawai" | "salesman" => Self::Contact,
            "product" | "products" | "produk" | "barang" => Self::Product,
            "sales" | "sale" | "penjualan" | "sales_invoice" | "sales_invoices" => Self::Sales,
            "purchase" | "purchases" | "pembelian" | "purchase_invoice" | "purchase_invoices"
            | "purchases_invoices" => Self::Purchase,
            "dashboard" | "dashboards" => Self::Dashboard,
            _ => Self::None,
        }
    }

    pub fn is_write_eligible(self) -> bool {
        matches!(self, Self::Contact | Self::Product)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Product => "product",
            Self::Sales => "sales",
            Self::Purchase => "purchase",
            Self::Dashboard => "dashboard",
            Self::None => "none",
        }
    }
}

/// Role of a contact record, derived from the classifier's category label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactRole {
    Customer,
    Supplier,
    Employee,
}

impl ContactRole {
    pub fn from_label(raw: &str) -> Option<Self> {
        match normalize_label(raw).as_str() {
            "customer" | "customers" | "pelanggan" => Some(Self::Customer),
            "supplier" | "suppliers" | "vendor" | "pemasok" => Some(Self::Supplier),
            "employee" | "employees" | "karyawan" | "pegawai" => Some(Self::Employee),
            _ => None,
        }
    }

    /// Contact flag the backend uses to mark this role.
    pub fn flag_field(self) -> &'static str {
        match self {
            Self::Customer => "is_customer",
            Self::Supplier => "is_supplier",
            Self::Employee => "is_employee",
        }
    }
}

fn normalize_label(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

/// Validated outcome of intent classification for one turn.
#[derive(Clone, Debug, PartialEq)]
pub enum RoutingDecision {
    /// Answer from cached context or general knowledge, no backend call.
    NoData,
    Read { resource: String, category: Category, filters: BTreeMap<String, String> },
    Write { resource: String, category: Category, fields: Map<String, Value> },
}

impl RoutingDecision {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoData => "no_data",
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
        }
    }

    pub fn resource(&self) -> Option<&str> {
        match self {
            Self::NoData => None,
            Self::Read { resource, .. } | Self::Write { resource, .. } => Some(resource),
        }
    }
}
