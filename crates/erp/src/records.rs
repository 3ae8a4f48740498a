//! Typed shapes of the ERP records the assistant reads.
//!
//! Field names are the dotted keys produced by [`crate::flatten::flatten`]. Every
//! field is optional and scalar values are decoded leniently: a number sent as a
//! string still decodes, and a value that cannot be interpreted becomes `None`
//! instead of failing the whole response.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Contact {
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub national_id_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub tax_id_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::boolean", skip_serializing_if = "Option::is_none")]
    pub is_customer: Option<bool>,
    #[serde(default, deserialize_with = "lenient::boolean", skip_serializing_if = "Option::is_none")]
    pub is_supplier: Option<bool>,
    #[serde(default, deserialize_with = "lenient::boolean", skip_serializing_if = "Option::is_none")]
    pub is_employee: Option<bool>,
    #[serde(default, deserialize_with = "lenient::boolean", skip_serializing_if = "Option::is_none")]
    pub is_salesman: Option<bool>,
    #[serde(default, deserialize_with = "lenient::boolean", skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(
        rename = "customer_category.name",
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub customer_category_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct SalesInvoice {
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::date", skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::date_time", skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        rename = "customer.name",
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub customer_name: Option<String>,
    #[serde(
        rename = "currency.name",
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub currency_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub total_payment: Option<f64>,
    #[serde(default, deserialize_with = "lenient::list", skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct LineItem {
    #[serde(
        rename = "product.code",
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub product_code: Option<String>,
    #[serde(
        rename = "product.name",
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub product_name: Option<String>,
    #[serde(
        rename = "product.category.name",
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub product_category_name: Option<String>,
    #[serde(
        rename = "unit.name",
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub unit_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(
        rename = "discount.amount",
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub discount_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub unit_cogs: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Product {
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        rename = "category.name",
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub category_name: Option<String>,
    #[serde(
        rename = "catalog.name",
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub catalog_name: Option<String>,
    #[serde(
        rename = "quantity.on_hand",
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity_on_hand: Option<f64>,
    #[serde(
        rename = "quantity.on_order",
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity_on_order: Option<f64>,
    #[serde(
        rename = "quantity.on_hold",
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity_on_hold: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub unit_price_gross: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub unit_cogs: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct PurchaseInvoice {
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::date", skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::date_time", skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
}

/// `{"results": [...]}` list envelope; a missing or null list decodes as empty.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct RecordList<T> {
    #[serde(default = "Vec::new", deserialize_with = "lenient::list")]
    pub results: Vec<T>,
}

mod lenient {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text),
            Some(Value::Number(number)) => Some(number.to_string()),
            Some(Value::Bool(flag)) => Some(flag.to_string()),
            _ => None,
        })
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(number)) => number.as_f64(),
            Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
            _ => None,
        })
    }

    pub fn boolean<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Bool(flag)) => Some(flag),
            Some(Value::Number(number)) => number.as_i64().map(|value| value != 0),
            Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "ya" => Some(true),
                "false" | "0" | "no" | "tidak" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    pub fn date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(text)) => {
                let text = text.trim();
                let day = text.get(..10).unwrap_or(text);
                NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
            }
            _ => None,
        })
    }

    pub fn date_time<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(text)) => parse_date_time(text.trim()),
            _ => None,
        })
    }

    fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Some(parsed.naive_local());
        }
        DATE_TIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    }

    /// Decodes a list element-by-element; elements that are not objects are skipped.
    pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let items = match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Array(items)) => items,
            _ => return Ok(Vec::new()),
        };
        items
            .into_iter()
            .filter(Value::is_object)
            .map(|item| serde_json::from_value(item).map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::{Contact, Product, RecordList, SalesInvoice};

    #[test]
    fn scalars_are_decoded_leniently() {
        let product: Product = serde_json::from_value(json!({
            "code": 1001,
            "name": "Pulpen",
            "unit_price": "5000",
            "quantity.on_hand": 12,
            "unit_cogs": "n/a"
        }))
        .expect("product should decode");

        assert_eq!(product.code.as_deref(), Some("1001"));
        assert_eq!(product.unit_price, Some(5000.0));
        assert_eq!(product.quantity_on_hand, Some(12.0));
        assert_eq!(product.unit_cogs, None);
    }

    #[test]
    fn contact_flags_accept_string_and_numeric_booleans() {
        let contact: Contact = serde_json::from_value(json!({
            "name": "PT Sumber Rejeki",
            "is_customer": "true",
            "is_supplier": 0,
            "is_active": null
        }))
        .expect("contact should decode");

        assert_eq!(contact.is_customer, Some(true));
        assert_eq!(contact.is_supplier, Some(false));
        assert_eq!(contact.is_active, None);
    }

    #[test]
    fn invoice_dates_and_nested_line_items_decode() {
        let invoice: SalesInvoice = serde_json::from_value(json!({
            "number": "SI-0042",
            "date": "2024-03-05",
            "time": "2024-03-05T09:30:00+07:00",
            "customer.name": "Budi",
            "total_amount": 150000,
            "line_items": [
                { "product.name": "Pulpen", "quantity": "3", "unit_price": 50000 },
                "not-an-object"
            ]
        }))
        .expect("invoice should decode");

        assert_eq!(invoice.date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert!(invoice.time.is_some());
        assert_eq!(invoice.line_items.len(), 1);
        assert_eq!(invoice.line_items[0].quantity, Some(3.0));
    }

    #[test]
    fn serialization_omits_unknown_fields() {
        let contact = Contact { name: Some("Sari".to_string()), ..Contact::default() };
        let encoded = serde_json::to_value(&contact).expect("contact should serialize");
        assert_eq!(encoded, json!({ "name": "Sari" }));
    }

    #[test]
    fn null_result_list_decodes_as_empty() {
        let list: RecordList<Contact> =
            serde_json::from_value(json!({ "results": null })).expect("list should decode");
        assert!(list.results.is_empty());

        let missing: RecordList<Contact> =
            serde_json::from_value(json!({ "status": "ok" })).expect("list should decode");
        assert!(missing.results.is_empty());
    }
}
