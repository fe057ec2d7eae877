use serde::Serialize;
use utoipa::ToSchema;

use crate::contract::fields::{classify_field, field_label};
use crate::contract::{FieldKind, Template};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TemplateField {
    #[schema(example = "CPF_LOCADOR")]
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TemplateSummary {
    #[schema(example = "residencial_pf")]
    pub id: String,
    pub name: String,
    pub fields: Vec<TemplateField>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TemplateDetail {
    #[serde(flatten)]
    pub summary: TemplateSummary,
    /// Body with `[FIELD_NAME]` placeholders
    pub body: String,
}

impl From<&Template> for TemplateSummary {
    fn from(template: &Template) -> Self {
        let fields = template
            .field_names()
            .iter()
            .map(|name| TemplateField {
                name: name.clone(),
                label: field_label(name),
                kind: classify_field(name),
            })
            .collect();

        Self {
            id: template.id.to_string(),
            name: template.name.to_string(),
            fields,
        }
    }
}

impl From<&Template> for TemplateDetail {
    fn from(template: &Template) -> Self {
        Self {
            summary: TemplateSummary::from(template),
            body: template.body.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::templates::{template_by_id, RESIDENTIAL_PERSON};

    #[test]
    fn test_summary_classifies_fields() {
        let template = template_by_id(RESIDENTIAL_PERSON).unwrap();
        let summary = TemplateSummary::from(template);

        assert_eq!(summary.fields.len(), template.field_names().len());
        let cpf = summary
            .fields
            .iter()
            .find(|f| f.name == "CPF_LOCADOR")
            .unwrap();
        assert_eq!(cpf.kind, FieldKind::PersonTaxId);
        assert_eq!(cpf.label, "Cpf locador");
    }
}
