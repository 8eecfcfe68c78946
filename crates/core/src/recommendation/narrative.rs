//! Text literals for products embedded in rule narratives.
//!
//! Records use single-quoted strings. Quotes inside values are backslash
//! escaped, so the renderer's single-to-double quote repair still yields valid
//! JSON.

use crate::domain::product::ProductRecommendation;

pub fn product_list_literal(products: &[ProductRecommendation]) -> String {
    let records = products.iter().map(product_record_literal).collect::<Vec<_>>();
    format!("[{}]", records.join(", "))
}

pub fn product_record_literal(product: &ProductRecommendation) -> String {
    format!(
        "{{'name': {}, 'description': {}}}",
        quoted(&product.name),
        quoted(&product.description)
    )
}

fn quoted(value: &str) -> String {
    let mut output = String::with_capacity(value.len() + 2);
    output.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => output.push_str("\\\\"),
            '\'' => output.push_str("\\'"),
            '"' => output.push_str("\\\""),
            '\n' => output.push_str("\\n"),
            '\t' => output.push_str("\\t"),
            other => output.push(other),
        }
    }
    output.push('\'');
    output
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::{product_list_literal, product_record_literal};
    use crate::domain::product::ProductRecommendation;

    #[test]
    fn list_literal_uses_single_quotes_in_order() {
        let literal = product_list_literal(&[
            ProductRecommendation::new("A", "first"),
            ProductRecommendation::new("B", "second"),
        ]);

        assert_eq!(
            literal,
            "[{'name': 'A', 'description': 'first'}, {'name': 'B', 'description': 'second'}]"
        );
    }

    #[test]
    fn quotes_inside_values_survive_quote_repair() {
        let literal = product_record_literal(&ProductRecommendation::new(
            "Kid's \"Plan\"",
            "line one\nline two",
        ));

        let repaired = literal.replace('\'', "\"");
        let decoded: Value = serde_json::from_str(&repaired).expect("repaired literal is JSON");

        assert_eq!(decoded["name"], "Kid\"s \"Plan\"");
        assert_eq!(decoded["description"], "line one\nline two");
    }
}
