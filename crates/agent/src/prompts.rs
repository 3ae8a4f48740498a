//! Instructions sent to the language model at each stage of a turn.

use tanya_core::catalog::{EndpointCatalog, EndpointDefinition, RuleSet};

const DATE_FILTER_GRAMMAR: &str = "If the user asks for a date range or a specific date, use the \
parameters date[$gte], date[$lte] or date[$eq] with values formatted as YYYY-MM-DD, for example \
{\"date[$gte]\":\"2024-01-25\"}.";

const PARAMS_REPLY_SHAPE: &str =
    "Reply with the JSON object only, no prose: {\"params\": {\"param_key\": \"param_value\"}}";

/// Routing instruction listing every catalogued resource.
pub fn classifier_instruction(catalog: &EndpointCatalog) -> String {
    format!(
        "You route questions about an ERP system. Decide whether answering needs new data from \
the backend, whether the user wants to create a record, or whether the data already in the \
conversation is enough.\n\
Available endpoints:\n{listing}\n\
Rules:\n\
1. If the user wants to add or register a contact (customer, supplier, employee) or a product, \
set \"needsInput\": true, set \"category\" to one of customer, supplier, employee, contact or \
product, set \"endpoint\" to contacts or products, and put the record fields from the message \
in \"params\".\n\
2. If new data is needed, set \"needsInput\": false, \"endpoint\" to the endpoint name and any \
obvious filters in \"params\".\n\
3. If the data already in the conversation is enough, or no business data is needed, set \
\"endpoint\": \"null\".\n\
{DATE_FILTER_GRAMMAR}\n\
Reply with the JSON object only, no prose: \
{{\"needsInput\": false, \"endpoint\": \"endpoint_name\", \"category\": \"\", \"params\": {{}}}}",
        listing = catalog.prompt_listing(),
    )
}

/// Parameter instruction for one resource, or `None` when it takes no refinement.
pub fn refinement_instruction(endpoint: &EndpointDefinition) -> Option<String> {
    let rule_set = endpoint.rule_set?;
    let defaults = serde_json::to_string(&endpoint.default_params()).unwrap_or_default();
    let mut instruction =
        format!("Determine query parameters for the `{}` endpoint.", endpoint.resource);
    if !endpoint.default_params.is_empty() {
        instruction.push_str(&format!(" Default parameters are {defaults}."));
    }
    instruction.push('\n');

    if rule_set != RuleSet::Generic {
        let fields = endpoint
            .allowed_fields
            .iter()
            .filter(|field| **field != "includes")
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        instruction.push_str(&format!("Fields available for filtering: {fields}.\n"));
    }
    match rule_set {
        RuleSet::SalesInvoices => instruction.push_str(
            "payment_status is one of: open, paid. If the user asks about the products on the \
invoices, add the parameter includes[line_items]=true.\n",
        ),
        RuleSet::Contacts => instruction.push_str(
            "Boolean fields (is_customer, is_supplier, is_employee, is_salesman, is_active) take \
the values true or false.\n",
        ),
        RuleSet::PurchaseInvoices | RuleSet::Products | RuleSet::Generic => {}
    }
    instruction.push_str(DATE_FILTER_GRAMMAR);
    instruction.push('\n');
    instruction.push_str(PARAMS_REPLY_SHAPE);
    Some(instruction)
}

pub const COMPOSE_INSTRUCTION: &str = "You are a business assistant for an Indonesian company. \
Answer in Indonesian using only the data supplied in this conversation. Leave out fields that are \
null, empty or unknown. Format money as Indonesian Rupiah, for example Rp 1.250.000. Present lists \
and records as an HTML table unless the user asks for another format. Only include a chart \
directive when the user explicitly asks for a chart. Do not wrap the answer in markdown code \
fences.";

pub const DATA_FREE_NOTE: &str = " No new data was fetched for this question: answer from the \
data and answers already in the conversation, or from general knowledge when the question is not \
about business data.";

pub const GUIDED_FORM_INSTRUCTION: &str = "The backend rejected the record the user tried to \
create because some information is missing or invalid. Reply in Indonesian with a short \
explanation and an HTML form listing the fields the user must fill in, pre-filled with the values \
already given. Do not wrap the answer in markdown code fences.";

/// Image instruction naming the fields each resource understands.
pub fn image_instruction(catalog: &EndpointCatalog) -> String {
    let fields = catalog
        .iter()
        .filter(|endpoint| endpoint.rule_set.is_some_and(|rule_set| rule_set != RuleSet::Generic))
        .map(|endpoint| format!("{}: {}", endpoint.resource, endpoint.allowed_fields.join(", ")))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Describe the business data visible in this image using these fields:\n{fields}\n\
If the image shows no such data, describe the item shown so it can be entered as a product, \
using the products fields."
    )
}

#[cfg(test)]
mod tests {
    use tanya_core::catalog::EndpointCatalog;

    use super::{classifier_instruction, image_instruction, refinement_instruction};

    #[test]
    fn classifier_instruction_lists_catalog_and_reply_shape() {
        let instruction = classifier_instruction(&EndpointCatalog::default());
        assert!(instruction.contains("- contacts: Customer, Vendor, Employee queries"));
        assert!(instruction.contains("dashboards/balance_sheet_simple"));
        assert!(instruction.contains("\"needsInput\""));
        assert!(instruction.contains("date[$gte]"));
    }

    #[test]
    fn sales_rules_mention_line_item_include() {
        let catalog = EndpointCatalog::default();
        let sales = catalog.get("sales_invoices").expect("catalogued");
        let instruction = refinement_instruction(sales).expect("sales has rules");

        assert!(instruction.contains("includes[line_items]=true"));
        assert!(instruction.contains("customer.name"));
        assert!(instruction.contains("{\"is_skip_pagination\":\"true\"}"));
    }

    #[test]
    fn generic_rules_only_carry_date_grammar() {
        let catalog = EndpointCatalog::default();
        let daily = catalog.get("dashboards/daily_sales").expect("catalogued");
        let instruction = refinement_instruction(daily).expect("daily sales has rules");

        assert!(instruction.contains("date[$lte]"));
        assert!(!instruction.contains("Fields available"));
    }

    #[test]
    fn endpoints_without_rules_have_no_instruction() {
        let catalog = EndpointCatalog::default();
        let balance = catalog.get("dashboards/balance_sheet_simple").expect("catalogued");
        assert!(refinement_instruction(balance).is_none());
    }

    #[test]
    fn image_instruction_covers_record_resources() {
        let instruction = image_instruction(&EndpointCatalog::default());
        assert!(instruction.contains("products: code, name"));
        assert!(instruction.contains("contacts: name"));
        assert!(!instruction.contains("dashboards/daily_sales"));
    }
}
