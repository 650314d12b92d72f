use std::collections::HashMap;

pub type TemplateState = HashMap<String, String>;

/// Fill `{{key}}` placeholders from `state`. Unknown keys render empty.
pub fn compose_context(template: &str, state: &TemplateState) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                if let Some(value) = state.get(key) {
                    output.push_str(value);
                }
                rest = &after[end + 2..];
            }
            None => {
                output.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    output.push_str(rest);
    output
}
